use crate::error::{EtlError, EtlResult};
use crate::sql::ast::{
    BinaryOp, Expr, FromClause, Join, JoinKind, OrderByExpr, Select, SelectItem, Statement,
    TableFactor, UnaryOp,
};
use crate::sql::lexer::{tokenize, Token};
use crate::storage::value::{ColumnType, Value};

/// Words that end an expression or select item and can never be an implicit
/// alias.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "LIMIT", "OFFSET", "JOIN",
    "INNER", "LEFT", "OUTER", "CROSS", "ON", "AS", "AND", "OR", "NOT", "IS", "NULL", "IN",
    "BETWEEN", "LIKE", "CASE", "WHEN", "THEN", "ELSE", "END", "CAST", "DISTINCT", "ASC", "DESC",
    "UNION",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

struct SqlParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl SqlParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error<T>(&self, expected: &str) -> EtlResult<T> {
        let found = match self.peek() {
            Some(t) => format!("{:?}", t),
            None => "end of input".to_string(),
        };
        Err(EtlError::ParseError(format!("expected {}, found {}", expected, found)))
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    fn consume_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> EtlResult<()> {
        if self.consume_keyword(kw) {
            Ok(())
        } else {
            self.error(kw)
        }
    }

    fn peek_symbol(&self, sym: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(sym))
    }

    fn consume_symbol(&mut self, sym: &str) -> bool {
        if self.peek_symbol(sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> EtlResult<()> {
        if self.consume_symbol(sym) {
            Ok(())
        } else {
            self.error(&format!("'{}'", sym))
        }
    }

    fn identifier(&mut self) -> EtlResult<String> {
        match self.peek() {
            Some(Token::Ident(s)) if !is_reserved(s) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            Some(Token::QuotedIdent(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => self.error("identifier"),
        }
    }

    /// `[AS] alias`, where the alias may also be a string literal.
    fn alias(&mut self) -> EtlResult<Option<String>> {
        if self.consume_keyword("AS") {
            if let Some(Token::Str(s)) = self.peek() {
                let s = s.clone();
                self.pos += 1;
                return Ok(Some(s));
            }
            return self.identifier().map(Some);
        }
        match self.peek() {
            Some(Token::Ident(s)) if !is_reserved(s) => self.identifier().map(Some),
            Some(Token::QuotedIdent(_)) => self.identifier().map(Some),
            _ => Ok(None),
        }
    }

    fn unsigned(&mut self) -> EtlResult<u64> {
        match self.peek() {
            Some(Token::Integer(i)) if *i >= 0 => {
                let n = *i as u64;
                self.pos += 1;
                Ok(n)
            }
            _ => self.error("non-negative integer"),
        }
    }

    fn select(&mut self) -> EtlResult<Select> {
        self.expect_keyword("SELECT")?;
        let mut select = Select {
            distinct: self.consume_keyword("DISTINCT"),
            ..Select::default()
        };
        if !select.distinct {
            self.consume_keyword("ALL");
        }

        loop {
            select.projection.push(self.select_item()?);
            if !self.consume_symbol(",") {
                break;
            }
        }

        if self.consume_keyword("FROM") {
            let base = self.table_factor()?;
            let mut joins = Vec::new();
            loop {
                let kind = if self.consume_keyword("JOIN") {
                    JoinKind::Inner
                } else if self.consume_keyword("INNER") {
                    self.expect_keyword("JOIN")?;
                    JoinKind::Inner
                } else if self.consume_keyword("LEFT") {
                    self.consume_keyword("OUTER");
                    self.expect_keyword("JOIN")?;
                    JoinKind::Left
                } else {
                    break;
                };
                let factor = self.table_factor()?;
                self.expect_keyword("ON")?;
                let on = self.expr()?;
                joins.push(Join { kind, factor, on });
            }
            select.from = Some(FromClause { base, joins });
        }

        if self.consume_keyword("WHERE") {
            select.selection = Some(self.expr()?);
        }

        if self.consume_keyword("GROUP") {
            self.expect_keyword("BY")?;
            loop {
                select.group_by.push(self.expr()?);
                if !self.consume_symbol(",") {
                    break;
                }
            }
        }

        if self.consume_keyword("HAVING") {
            select.having = Some(self.expr()?);
        }

        if self.consume_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let expr = self.expr()?;
                let descending = if self.consume_keyword("DESC") {
                    true
                } else {
                    self.consume_keyword("ASC");
                    false
                };
                select.order_by.push(OrderByExpr { expr, descending });
                if !self.consume_symbol(",") {
                    break;
                }
            }
        }

        if self.consume_keyword("LIMIT") {
            select.limit = Some(self.unsigned()?);
            if self.consume_keyword("OFFSET") {
                select.offset = Some(self.unsigned()?);
            }
        }

        Ok(select)
    }

    fn select_item(&mut self) -> EtlResult<SelectItem> {
        if self.consume_symbol("*") {
            return Ok(SelectItem::Wildcard);
        }
        if let (Some(Token::Ident(q) | Token::QuotedIdent(q)), Some(dot), Some(star)) =
            (self.peek(), self.peek_at(1), self.peek_at(2))
        {
            if dot.is_symbol(".") && star.is_symbol("*") {
                let q = q.clone();
                self.pos += 3;
                return Ok(SelectItem::QualifiedWildcard(q));
            }
        }
        let expr = self.expr()?;
        let alias = self.alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    fn table_factor(&mut self) -> EtlResult<TableFactor> {
        if self.consume_symbol("(") {
            let subquery = self.select()?;
            self.expect_symbol(")")?;
            let alias = match self.alias()? {
                Some(a) => a,
                None => return self.error("alias for derived table"),
            };
            return Ok(TableFactor::Derived { subquery: Box::new(subquery), alias });
        }
        let name = self.identifier()?;
        let alias = self.alias()?;
        Ok(TableFactor::Named { name, alias })
    }

    fn expr(&mut self) -> EtlResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> EtlResult<Expr> {
        let mut left = self.and_expr()?;
        while self.consume_keyword("OR") {
            let right = self.and_expr()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> EtlResult<Expr> {
        let mut left = self.not_expr()?;
        while self.consume_keyword("AND") {
            let right = self.not_expr()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> EtlResult<Expr> {
        if self.consume_keyword("NOT") {
            let expr = self.not_expr()?;
            return Ok(Expr::Unary { op: UnaryOp::Not, expr: Box::new(expr) });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> EtlResult<Expr> {
        let left = self.concat()?;

        if self.consume_keyword("IS") {
            let negated = self.consume_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull { expr: Box::new(left), negated });
        }

        let negated = if self.peek_keyword("NOT")
            && self
                .peek_at(1)
                .is_some_and(|t| t.is_keyword("IN") || t.is_keyword("BETWEEN") || t.is_keyword("LIKE"))
        {
            self.pos += 1;
            true
        } else {
            false
        };

        if self.consume_keyword("IN") {
            self.expect_symbol("(")?;
            let mut list = Vec::new();
            if !self.peek_symbol(")") {
                loop {
                    list.push(self.expr()?);
                    if !self.consume_symbol(",") {
                        break;
                    }
                }
            }
            self.expect_symbol(")")?;
            return Ok(Expr::InList { expr: Box::new(left), list, negated });
        }
        if self.consume_keyword("BETWEEN") {
            let low = self.concat()?;
            self.expect_keyword("AND")?;
            let high = self.concat()?;
            return Ok(Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if self.consume_keyword("LIKE") {
            let pattern = self.concat()?;
            return Ok(Expr::Like { expr: Box::new(left), pattern: Box::new(pattern), negated });
        }

        let op = match self.peek() {
            Some(Token::Symbol("=")) => BinaryOp::Eq,
            Some(Token::Symbol("<>")) => BinaryOp::NotEq,
            Some(Token::Symbol("<")) => BinaryOp::Lt,
            Some(Token::Symbol("<=")) => BinaryOp::LtEq,
            Some(Token::Symbol(">")) => BinaryOp::Gt,
            Some(Token::Symbol(">=")) => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.concat()?;
        Ok(Expr::binary(left, op, right))
    }

    fn concat(&mut self) -> EtlResult<Expr> {
        let mut left = self.additive()?;
        while self.consume_symbol("||") {
            let right = self.additive()?;
            left = Expr::binary(left, BinaryOp::Concat, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> EtlResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.consume_symbol("+") {
                BinaryOp::Plus
            } else if self.consume_symbol("-") {
                BinaryOp::Minus
            } else {
                return Ok(left);
            };
            let right = self.multiplicative()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn multiplicative(&mut self) -> EtlResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = if self.consume_symbol("*") {
                BinaryOp::Multiply
            } else if self.consume_symbol("/") {
                BinaryOp::Divide
            } else if self.consume_symbol("%") {
                BinaryOp::Modulo
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn unary(&mut self) -> EtlResult<Expr> {
        if self.consume_symbol("-") {
            let expr = self.unary()?;
            return Ok(match expr {
                Expr::Literal(Value::Integer(i)) => Expr::Literal(Value::Integer(-i)),
                Expr::Literal(Value::Real(f)) => Expr::Literal(Value::Real(-f)),
                other => Expr::Unary { op: UnaryOp::Minus, expr: Box::new(other) },
            });
        }
        if self.consume_symbol("+") {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> EtlResult<Expr> {
        let tok = match self.peek() {
            Some(t) => t.clone(),
            None => return self.error("expression"),
        };
        match tok {
            Token::Integer(i) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Integer(i)))
            }
            Token::Real(f) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Real(f)))
            }
            Token::Str(s) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::text(&s)))
            }
            Token::Symbol("(") => {
                self.pos += 1;
                if self.peek_keyword("SELECT") {
                    return Err(EtlError::Unsupported("scalar subqueries".into()));
                }
                let expr = self.expr()?;
                self.expect_symbol(")")?;
                Ok(expr)
            }
            Token::QuotedIdent(_) => self.column_ref(),
            Token::Ident(word) => {
                let upper = word.to_ascii_uppercase();
                match upper.as_str() {
                    "NULL" => {
                        self.pos += 1;
                        Ok(Expr::Literal(Value::Null))
                    }
                    "TRUE" | "FALSE" => {
                        self.pos += 1;
                        Ok(Expr::Literal(Value::Boolean(upper == "TRUE")))
                    }
                    "CASE" => {
                        self.pos += 1;
                        self.case_expr()
                    }
                    "CAST" => {
                        self.pos += 1;
                        self.cast_expr()
                    }
                    _ if self.peek_at(1).is_some_and(|t| t.is_symbol("(")) && !is_reserved(&word) => {
                        self.pos += 2;
                        self.function_call(upper)
                    }
                    _ => self.column_ref(),
                }
            }
            _ => self.error("expression"),
        }
    }

    fn column_ref(&mut self) -> EtlResult<Expr> {
        let first = self.identifier()?;
        if self.consume_symbol(".") {
            let name = self.identifier()?;
            return Ok(Expr::Column { table: Some(first), name });
        }
        Ok(Expr::Column { table: None, name: first })
    }

    /// Arguments after the opening parenthesis.
    fn function_call(&mut self, name: String) -> EtlResult<Expr> {
        if self.consume_symbol("*") {
            self.expect_symbol(")")?;
            if name != "COUNT" {
                return Err(EtlError::ParseError(format!("{}(*) is not allowed", name)));
            }
            return Ok(Expr::CountStar);
        }
        let distinct = self.consume_keyword("DISTINCT");
        let mut args = Vec::new();
        if !self.peek_symbol(")") {
            loop {
                args.push(self.expr()?);
                if !self.consume_symbol(",") {
                    break;
                }
            }
        }
        self.expect_symbol(")")?;
        Ok(Expr::Function { name, args, distinct })
    }

    fn case_expr(&mut self) -> EtlResult<Expr> {
        let operand = if self.peek_keyword("WHEN") {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        let mut branches = Vec::new();
        while self.consume_keyword("WHEN") {
            let when = self.expr()?;
            self.expect_keyword("THEN")?;
            let then = self.expr()?;
            branches.push((when, then));
        }
        if branches.is_empty() {
            return self.error("WHEN");
        }
        let else_result = if self.consume_keyword("ELSE") {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        self.expect_keyword("END")?;
        Ok(Expr::Case { operand, branches, else_result })
    }

    fn cast_expr(&mut self) -> EtlResult<Expr> {
        self.expect_symbol("(")?;
        let expr = self.expr()?;
        self.expect_keyword("AS")?;
        let ty_name = match self.peek() {
            Some(Token::Ident(s)) => s.clone(),
            _ => return self.error("type name"),
        };
        self.pos += 1;
        let ty = ColumnType::from_str(&ty_name)
            .ok_or_else(|| EtlError::ParseError(format!("unknown type '{}'", ty_name)))?;
        // VARCHAR(20), DECIMAL(10, 2): precision is ignored
        if self.consume_symbol("(") {
            while !self.consume_symbol(")") {
                if self.next().is_none() {
                    return self.error("')'");
                }
            }
        }
        self.expect_symbol(")")?;
        Ok(Expr::Cast { expr: Box::new(expr), ty })
    }
}

pub fn parse_statement(input: &str) -> EtlResult<Statement> {
    let tokens = tokenize(input)?;
    let mut parser = SqlParser { tokens, pos: 0 };
    let stmt = match parser.peek().cloned() {
        Some(t) if t.is_keyword("SELECT") => Statement::Select(Box::new(parser.select()?)),
        Some(Token::Ident(word)) => return Err(EtlError::Unsupported(word.to_ascii_uppercase())),
        Some(_) => return parser.error("statement"),
        None => return Err(EtlError::ParseError("empty input".into())),
    };
    while parser.consume_symbol(";") {}
    if parser.peek().is_some() {
        return parser.error("end of statement");
    }
    Ok(stmt)
}

/// Parse a standalone expression, e.g. for tests and ad-hoc filters.
pub fn parse_expression(input: &str) -> EtlResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = SqlParser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if parser.peek().is_some() {
        return parser.error("end of expression");
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(sql: &str) -> Select {
        match parse_statement(sql).unwrap() {
            Statement::Select(s) => *s,
        }
    }

    #[test]
    fn parses_joins_grouping_and_ordering() {
        let s = select(
            "SELECT c.state AS st, SUM(p.value) revenue FROM orders o \
             JOIN customers c ON o.cid = c.id LEFT JOIN payments p ON o.id = p.oid \
             WHERE o.status = 'delivered' GROUP BY c.state ORDER BY revenue DESC LIMIT 10;",
        );
        assert_eq!(s.projection.len(), 2);
        assert_eq!(s.projection[1].output_name().as_deref(), Some("revenue"));
        let from = s.from.unwrap();
        assert_eq!(from.base.qualifier(), "o");
        assert_eq!(from.joins.len(), 2);
        assert_eq!(from.joins[1].kind, JoinKind::Left);
        assert_eq!(s.group_by, vec![Expr::Column { table: Some("c".into()), name: "state".into() }]);
        assert!(s.order_by[0].descending);
        assert_eq!(s.limit, Some(10));
    }

    #[test]
    fn parses_derived_table() {
        let s = select("SELECT x FROM (SELECT a AS x FROM t) sub");
        match s.from.unwrap().base {
            TableFactor::Derived { alias, subquery } => {
                assert_eq!(alias, "sub");
                assert_eq!(subquery.projection[0].output_name().as_deref(), Some("x"));
            }
            other => panic!("expected derived table, got {:?}", other),
        }
    }

    #[test]
    fn precedence_binds_and_tighter_than_or() {
        let e = parse_expression("a = 1 OR b = 2 AND c = 3").unwrap();
        match e {
            Expr::Binary { op: BinaryOp::Or, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_case_cast_and_predicates() {
        let e = parse_expression(
            "CAST(CASE m WHEN '01' THEN 'Jan' ELSE 'x' END AS TEXT) NOT IN ('a') AND d IS NOT NULL",
        )
        .unwrap();
        let conj = e.conjuncts();
        assert_eq!(conj.len(), 2);
        assert!(matches!(conj[0], Expr::InList { negated: true, .. }));
        assert!(matches!(conj[1], Expr::IsNull { negated: true, .. }));
    }

    #[test]
    fn count_star_and_distinct_aggregates() {
        let s = select("SELECT COUNT(*), COUNT(DISTINCT id) FROM t");
        assert_eq!(s.projection[0].output_name().as_deref(), Some("COUNT(*)"));
        assert_eq!(s.projection[1].output_name().as_deref(), Some("COUNT(DISTINCT id)"));
        assert!(s.is_grouped());
    }

    #[test]
    fn rejects_non_select_statements() {
        assert!(matches!(parse_statement("DELETE FROM t"), Err(EtlError::Unsupported(_))));
        assert!(matches!(parse_statement("SELECT FROM"), Err(EtlError::ParseError(_))));
        assert!(matches!(parse_statement("SELECT a FROM t extra junk"), Err(EtlError::ParseError(_))));
    }
}
