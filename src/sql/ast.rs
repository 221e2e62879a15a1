// src/sql/ast.rs
use std::fmt;

use crate::storage::value::{ColumnType, Value};

/// Function names evaluated over a group of rows rather than a single row.
pub const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Concat => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column {
        table: Option<String>,
        name: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        ty: ColumnType,
    },
    /// Function call; `name` is stored upper-case.
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    CountStar,
}

impl Expr {
    pub fn column(name: &str) -> Expr {
        Expr::Column { table: None, name: name.to_string() }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary { left: Box::new(left), op, right: Box::new(right) }
    }

    pub fn is_aggregate_call(&self) -> bool {
        match self {
            Expr::CountStar => true,
            Expr::Function { name, .. } => AGGREGATES.contains(&name.as_str()),
            _ => false,
        }
    }

    /// True if an aggregate call appears anywhere in the expression.
    pub fn contains_aggregate(&self) -> bool {
        if self.is_aggregate_call() {
            return true;
        }
        self.children().iter().any(|c| c.contains_aggregate())
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Column { .. } | Expr::CountStar => Vec::new(),
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Cast { expr, .. } => vec![&**expr],
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::InList { expr, list, .. } => {
                let mut out: Vec<&Expr> = vec![&**expr];
                out.extend(list.iter());
                out
            }
            Expr::Between { expr, low, high, .. } => vec![&**expr, &**low, &**high],
            Expr::Like { expr, pattern, .. } => vec![&**expr, &**pattern],
            Expr::Case { operand, branches, else_result } => {
                let mut out: Vec<&Expr> = Vec::new();
                if let Some(op) = operand {
                    out.push(&**op);
                }
                for (when, then) in branches {
                    out.push(when);
                    out.push(then);
                }
                if let Some(e) = else_result {
                    out.push(&**e);
                }
                out
            }
            Expr::Function { args, .. } => args.iter().collect(),
        }
    }

    /// Split a predicate on its top-level ANDs.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::Binary { left, op: BinaryOp::And, right } => {
                let mut out = left.conjuncts();
                out.extend(right.conjuncts());
                out
            }
            other => vec![other],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Column { table: Some(t), name } => write!(f, "{}.{}", t, name),
            Expr::Column { table: None, name } => write!(f, "{}", name),
            Expr::Unary { op: UnaryOp::Not, expr } => write!(f, "NOT {}", expr),
            Expr::Unary { op: UnaryOp::Minus, expr } => write!(f, "-{}", expr),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op.as_str(), right),
            Expr::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            Expr::InList { expr, list, negated } => {
                let items: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "{} {}IN ({})", expr, if *negated { "NOT " } else { "" }, items.join(", "))
            }
            Expr::Between { expr, low, high, negated } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
            Expr::Like { expr, pattern, negated } => {
                write!(f, "{} {}LIKE {}", expr, if *negated { "NOT " } else { "" }, pattern)
            }
            Expr::Case { operand, branches, else_result } => {
                write!(f, "CASE")?;
                if let Some(op) = operand {
                    write!(f, " {}", op)?;
                }
                for (when, then) in branches {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(e) = else_result {
                    write!(f, " ELSE {}", e)?;
                }
                write!(f, " END")
            }
            Expr::Cast { expr, ty } => write!(f, "CAST({} AS {})", expr, ty.as_str()),
            Expr::Function { name, args, distinct } => {
                let items: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}({}{})", name, if *distinct { "DISTINCT " } else { "" }, items.join(", "))
            }
            Expr::CountStar => write!(f, "COUNT(*)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    QualifiedWildcard(String),
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    /// Output column name for a non-wildcard item.
    pub fn output_name(&self) -> Option<String> {
        match self {
            SelectItem::Expr { alias: Some(a), .. } => Some(a.clone()),
            SelectItem::Expr { expr: Expr::Column { name, .. }, .. } => Some(name.clone()),
            SelectItem::Expr { expr, .. } => Some(expr.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Named { name: String, alias: Option<String> },
    Derived { subquery: Box<Select>, alias: String },
}

impl TableFactor {
    /// Name columns of this factor are qualified with.
    pub fn qualifier(&self) -> &str {
        match self {
            TableFactor::Named { alias: Some(a), .. } => a,
            TableFactor::Named { name, .. } => name,
            TableFactor::Derived { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub factor: TableFactor,
    pub on: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub base: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    /// Whether rows are collapsed into groups: explicit GROUP BY, or an
    /// aggregate in the select list or HAVING.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
            || self.having.is_some()
            || self.projection.iter().any(|item| match item {
                SelectItem::Expr { expr, .. } => expr.contains_aggregate(),
                _ => false,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<Select>),
}
