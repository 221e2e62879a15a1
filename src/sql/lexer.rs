use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_while, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace1, not_line_ending};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};

use crate::error::{EtlError, EtlResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: keyword or identifier.
    Ident(String),
    /// `"double quoted"` identifier, never a keyword.
    QuotedIdent(String),
    Str(String),
    Integer(i64),
    Real(f64),
    Symbol(&'static str),
}

impl Token {
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    pub fn is_symbol(&self, sym: &str) -> bool {
        matches!(self, Token::Symbol(s) if *s == sym)
    }
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("--"), not_line_ending)).parse(input)
}

fn trivia(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, line_comment)))).parse(input)
}

fn identifier(input: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        |s: &str| Token::Ident(s.to_string()),
    )
    .parse(input)
}

fn quoted_identifier(input: &str) -> IResult<&str, Token> {
    map(
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        |s: &str| Token::QuotedIdent(s.to_string()),
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('\''),
            many0(alt((is_not("'"), value("'", tag("''"))))),
            char('\''),
        ),
        |parts: Vec<&str>| Token::Str(parts.concat()),
    )
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(digit1, opt(preceded(char('.'), digit0)))),
        |s: &str| {
            if s.contains('.') {
                Token::Real(s.parse().unwrap_or(f64::NAN))
            } else {
                s.parse::<i64>()
                    .map(Token::Integer)
                    .unwrap_or_else(|_| Token::Real(s.parse().unwrap_or(f64::NAN)))
            }
        },
    )
    .parse(input)
}

fn fraction(input: &str) -> IResult<&str, Token> {
    map(recognize(preceded(char('.'), digit1)), |s: &str| {
        Token::Real(format!("0{}", s).parse().unwrap_or(f64::NAN))
    })
    .parse(input)
}

fn symbol(input: &str) -> IResult<&str, Token> {
    map(
        alt((
            tag("<="),
            tag(">="),
            tag("<>"),
            tag("!="),
            tag("||"),
            tag("="),
            tag("<"),
            tag(">"),
            tag("+"),
            tag("-"),
            tag("*"),
            tag("/"),
            tag("%"),
            tag("("),
            tag(")"),
            tag(","),
            tag("."),
            tag(";"),
        )),
        |s: &str| Token::Symbol(intern_symbol(s)),
    )
    .parse(input)
}

fn intern_symbol(s: &str) -> &'static str {
    match s {
        "<=" => "<=",
        ">=" => ">=",
        "<>" | "!=" => "<>",
        "||" => "||",
        "=" => "=",
        "<" => "<",
        ">" => ">",
        "+" => "+",
        "-" => "-",
        "*" => "*",
        "/" => "/",
        "%" => "%",
        "(" => "(",
        ")" => ")",
        "," => ",",
        "." => ".",
        _ => ";",
    }
}

fn token(input: &str) -> IResult<&str, Token> {
    terminated(
        alt((
            string_literal,
            quoted_identifier,
            number,
            fraction,
            identifier,
            symbol,
        )),
        trivia,
    )
    .parse(input)
}

/// Split SQL text into tokens. Whitespace and `--` comments are dropped.
pub fn tokenize(input: &str) -> EtlResult<Vec<Token>> {
    let (mut rest, _) = trivia(input).map_err(|e| EtlError::ParseError(e.to_string()))?;
    let mut tokens = Vec::new();
    while !rest.is_empty() {
        match token(rest) {
            Ok((remaining, tok)) => {
                tokens.push(tok);
                rest = remaining;
            }
            Err(_) => {
                let snippet: String = rest.chars().take(20).collect();
                return Err(EtlError::ParseError(format!("unexpected input near '{}'", snippet)));
            }
        }
    }
    Ok(tokens)
}
