//! SQL-style filter dialect executed against stored request documents.
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! query      := SELECT [TOP n] projection FROM alias [WHERE expr] [ORDER BY path [ASC|DESC]]
//! projection := '*' | path (',' path)*
//! expr       := and (OR and)*
//! and        := unary (AND unary)*
//! unary      := NOT unary | '(' expr ')' | predicate
//! predicate  := path op literal | path IS [NOT] NULL
//!             | CONTAINS '(' path ',' literal [',' bool] ')'
//!             | ARRAY_CONTAINS '(' path ',' literal ')'
//! ```
//!
//! Comparisons between mismatched types, or against a missing field, never match.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("query is empty")]
    Empty,
    #[error("expected {expected} but found '{found}'")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("unexpected end of query, expected {0}")]
    UnexpectedEnd(&'static str),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("field '{path}' does not use the collection alias '{alias}'")]
    UnknownAlias { path: String, alias: String },
    #[error("unsupported function '{0}'")]
    UnsupportedFunction(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    Star,
    Comma,
    Dot,
    LParen,
    RParen,
    Op(CompareOp),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(ident) => f.write_str(ident),
            Token::Str(value) => write!(f, "'{value}'"),
            Token::Number(value) => write!(f, "{value}"),
            Token::Star => f.write_str("*"),
            Token::Comma => f.write_str(","),
            Token::Dot => f.write_str("."),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Op(op) => f.write_str(op.symbol()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        match ch {
            c if c.is_whitespace() || c == ';' => index += 1,
            '*' => {
                tokens.push(Token::Star);
                index += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                index += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                index += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                index += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                index += 1;
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Eq));
                index += if chars.get(index + 1) == Some(&'=') { 2 } else { 1 };
            }
            '!' if chars.get(index + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::NotEq));
                index += 2;
            }
            '<' => match chars.get(index + 1) {
                Some('=') => {
                    tokens.push(Token::Op(CompareOp::LtEq));
                    index += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op(CompareOp::NotEq));
                    index += 2;
                }
                _ => {
                    tokens.push(Token::Op(CompareOp::Lt));
                    index += 1;
                }
            },
            '>' => {
                if chars.get(index + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::GtEq));
                    index += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    index += 1;
                }
            }
            '\'' | '"' => {
                let quote = ch;
                let mut value = String::new();
                index += 1;
                loop {
                    match chars.get(index) {
                        None => return Err(QueryError::UnterminatedString),
                        Some(&c) if c == quote => {
                            // doubled quote is an escaped quote
                            if chars.get(index + 1) == Some(&quote) {
                                value.push(quote);
                                index += 2;
                            } else {
                                index += 1;
                                break;
                            }
                        }
                        Some('\\') if chars.get(index + 1) == Some(&quote) => {
                            value.push(quote);
                            index += 2;
                        }
                        Some(&c) => {
                            value.push(c);
                            index += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || (c == '-' && next_is_digit(&chars, index)) => {
                let start = index;
                index += 1;
                while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.')
                {
                    index += 1;
                }
                let raw: String = chars[start..index].iter().collect();
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| QueryError::InvalidNumber(raw.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = index;
                while index < chars.len() && (chars[index].is_alphanumeric() || chars[index] == '_')
                {
                    index += 1;
                }
                tokens.push(Token::Ident(chars[start..index].iter().collect()));
            }
            other => return Err(QueryError::UnexpectedCharacter(other)),
        }
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], index: usize) -> bool {
    chars
        .get(index + 1)
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
}

/// Dotted path below the collection alias, e.g. `c.RequestId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(pub Vec<String>);

impl FieldPath {
    fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |current, segment| current.get(segment))
    }

    fn output_name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl Literal {
    fn matches_equal(&self, value: &Value) -> bool {
        compare(value, self) == Some(Ordering::Equal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Compare {
        path: FieldPath,
        op: CompareOp,
        value: Literal,
    },
    IsNull {
        path: FieldPath,
        negated: bool,
    },
    Contains {
        path: FieldPath,
        needle: Literal,
        ignore_case: bool,
    },
    ArrayContains {
        path: FieldPath,
        item: Literal,
    },
}

impl Condition {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Condition::And(left, right) => left.matches(document) && right.matches(document),
            Condition::Or(left, right) => left.matches(document) || right.matches(document),
            Condition::Not(inner) => !inner.matches(document),
            Condition::Compare { path, op, value } => path
                .resolve(document)
                .and_then(|field| compare(field, value))
                .map(|ordering| op.accepts(ordering))
                .unwrap_or(false),
            Condition::IsNull { path, negated } => {
                let is_null = matches!(path.resolve(document), None | Some(Value::Null));
                is_null != *negated
            }
            Condition::Contains {
                path,
                needle,
                ignore_case,
            } => match (path.resolve(document), needle) {
                (Some(Value::String(haystack)), Literal::Str(needle)) => {
                    if *ignore_case {
                        haystack.to_lowercase().contains(&needle.to_lowercase())
                    } else {
                        haystack.contains(needle.as_str())
                    }
                }
                _ => false,
            },
            Condition::ArrayContains { path, item } => match path.resolve(document) {
                Some(Value::Array(items)) => items.iter().any(|value| item.matches_equal(value)),
                _ => false,
            },
        }
    }
}

fn compare(value: &Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (Value::Number(number), Literal::Number(expected)) => {
            number.as_f64().and_then(|actual| actual.partial_cmp(expected))
        }
        (Value::String(actual), Literal::Str(expected)) => Some(actual.as_str().cmp(expected)),
        (Value::Bool(actual), Literal::Bool(expected)) => Some(actual.cmp(expected)),
        (Value::Null, Literal::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Fields(Vec<FieldPath>),
}

/// Parsed query ready to run against a document collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub top: Option<usize>,
    pub projection: Projection,
    pub filter: Option<Condition>,
    pub order_by: Option<(FieldPath, SortOrder)>,
}

impl RecordQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(QueryError::Empty);
        }
        Parser::new(tokens).query()
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filter
            .as_ref()
            .map(|condition| condition.matches(document))
            .unwrap_or(true)
    }

    /// Filter, order, limit and project the given documents.
    pub fn execute<'a, I>(&self, documents: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut selected: Vec<&Value> = documents
            .into_iter()
            .filter(|document| self.matches(document))
            .collect();

        if let Some((path, order)) = &self.order_by {
            selected.sort_by(|left, right| {
                let ordering = sort_key_cmp(path.resolve(left), path.resolve(right));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.top {
            selected.truncate(limit);
        }

        selected
            .into_iter()
            .map(|document| self.project(document))
            .collect()
    }

    fn project(&self, document: &Value) -> Value {
        match &self.projection {
            Projection::All => document.clone(),
            Projection::Fields(fields) => {
                let mut projected = Map::new();
                for field in fields {
                    if let Some(value) = field.resolve(document) {
                        projected.insert(field.output_name().to_string(), value.clone());
                    }
                }
                Value::Object(projected)
            }
        }
    }
}

fn sort_key_cmp(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    alias: String,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            alias: String::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), QueryError> {
        match self.advance() {
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case(keyword) => Ok(()),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: keyword,
                found: other.to_string(),
            }),
            None => Err(QueryError::UnexpectedEnd(keyword)),
        }
    }

    fn expect(&mut self, expected: Token, label: &'static str) -> Result<(), QueryError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: label,
                found: other.to_string(),
            }),
            None => Err(QueryError::UnexpectedEnd(label)),
        }
    }

    fn query(mut self) -> Result<RecordQuery, QueryError> {
        self.expect_keyword("SELECT")?;

        let top = if self.eat_keyword("TOP") {
            match self.advance() {
                Some(Token::Number(value)) if value >= 0.0 && value.fract() == 0.0 => {
                    Some(value as usize)
                }
                Some(other) => {
                    return Err(QueryError::UnexpectedToken {
                        expected: "row count",
                        found: other.to_string(),
                    })
                }
                None => return Err(QueryError::UnexpectedEnd("row count")),
            }
        } else {
            None
        };

        // Projection paths are validated once the alias is known.
        let raw_projection = self.raw_projection()?;

        self.expect_keyword("FROM")?;
        self.alias = match self.advance() {
            Some(Token::Ident(alias)) => alias,
            Some(other) => {
                return Err(QueryError::UnexpectedToken {
                    expected: "collection alias",
                    found: other.to_string(),
                })
            }
            None => return Err(QueryError::UnexpectedEnd("collection alias")),
        };

        let projection = match raw_projection {
            None => Projection::All,
            Some(paths) => Projection::Fields(
                paths
                    .into_iter()
                    .map(|segments| self.strip_alias(segments))
                    .collect::<Result<_, _>>()?,
            ),
        };

        let filter = if self.eat_keyword("WHERE") {
            Some(self.or_expr()?)
        } else {
            None
        };

        let order_by = if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            let path = self.path()?;
            let order = if self.eat_keyword("DESC") {
                SortOrder::Descending
            } else {
                self.eat_keyword("ASC");
                SortOrder::Ascending
            };
            Some((path, order))
        } else {
            None
        };

        if let Some(extra) = self.advance() {
            return Err(QueryError::UnexpectedToken {
                expected: "end of query",
                found: extra.to_string(),
            });
        }

        Ok(RecordQuery {
            top,
            projection,
            filter,
            order_by,
        })
    }

    fn raw_projection(&mut self) -> Result<Option<Vec<Vec<String>>>, QueryError> {
        if matches!(self.peek(), Some(Token::Star)) {
            self.position += 1;
            return Ok(None);
        }

        let mut paths = vec![self.raw_path()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.position += 1;
            paths.push(self.raw_path()?);
        }
        Ok(Some(paths))
    }

    fn raw_path(&mut self) -> Result<Vec<String>, QueryError> {
        let mut segments = vec![self.identifier("field path")?];
        while matches!(self.peek(), Some(Token::Dot)) {
            self.position += 1;
            segments.push(self.identifier("field name")?);
        }
        Ok(segments)
    }

    fn identifier(&mut self, label: &'static str) -> Result<String, QueryError> {
        match self.advance() {
            Some(Token::Ident(ident)) => Ok(ident),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: label,
                found: other.to_string(),
            }),
            None => Err(QueryError::UnexpectedEnd(label)),
        }
    }

    fn path(&mut self) -> Result<FieldPath, QueryError> {
        let segments = self.raw_path()?;
        self.strip_alias(segments)
    }

    fn strip_alias(&self, mut segments: Vec<String>) -> Result<FieldPath, QueryError> {
        if segments.len() < 2 || segments[0] != self.alias {
            return Err(QueryError::UnknownAlias {
                path: segments.join("."),
                alias: self.alias.clone(),
            });
        }
        segments.remove(0);
        Ok(FieldPath(segments))
    }

    fn or_expr(&mut self) -> Result<Condition, QueryError> {
        let mut condition = self.and_expr()?;
        while self.eat_keyword("OR") {
            let right = self.and_expr()?;
            condition = Condition::Or(Box::new(condition), Box::new(right));
        }
        Ok(condition)
    }

    fn and_expr(&mut self) -> Result<Condition, QueryError> {
        let mut condition = self.unary()?;
        while self.eat_keyword("AND") {
            let right = self.unary()?;
            condition = Condition::And(Box::new(condition), Box::new(right));
        }
        Ok(condition)
    }

    fn unary(&mut self) -> Result<Condition, QueryError> {
        if self.eat_keyword("NOT") {
            return Ok(Condition::Not(Box::new(self.unary()?)));
        }

        if matches!(self.peek(), Some(Token::LParen)) {
            self.position += 1;
            let inner = self.or_expr()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(inner);
        }

        self.predicate()
    }

    fn predicate(&mut self) -> Result<Condition, QueryError> {
        let is_call = matches!(self.tokens.get(self.position + 1), Some(Token::LParen));
        if is_call {
            let name = self.identifier("function name")?;
            return self.function(name);
        }

        let path = self.path()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Condition::IsNull { path, negated });
        }

        let op = match self.advance() {
            Some(Token::Op(op)) => op,
            Some(other) => {
                return Err(QueryError::UnexpectedToken {
                    expected: "comparison operator",
                    found: other.to_string(),
                })
            }
            None => return Err(QueryError::UnexpectedEnd("comparison operator")),
        };
        let value = self.literal()?;

        Ok(Condition::Compare { path, op, value })
    }

    fn function(&mut self, name: String) -> Result<Condition, QueryError> {
        self.expect(Token::LParen, "'('")?;
        let path = self.path()?;
        self.expect(Token::Comma, "','")?;
        let argument = self.literal()?;

        let condition = match name.to_ascii_uppercase().as_str() {
            "CONTAINS" => {
                let ignore_case = if matches!(self.peek(), Some(Token::Comma)) {
                    self.position += 1;
                    matches!(self.literal()?, Literal::Bool(true))
                } else {
                    false
                };
                Condition::Contains {
                    path,
                    needle: argument,
                    ignore_case,
                }
            }
            "ARRAY_CONTAINS" => Condition::ArrayContains {
                path,
                item: argument,
            },
            _ => return Err(QueryError::UnsupportedFunction(name)),
        };

        self.expect(Token::RParen, "')'")?;
        Ok(condition)
    }

    fn literal(&mut self) -> Result<Literal, QueryError> {
        match self.advance() {
            Some(Token::Str(value)) => Ok(Literal::Str(value)),
            Some(Token::Number(value)) => Ok(Literal::Number(value)),
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case("true") => {
                Ok(Literal::Bool(true))
            }
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case("false") => {
                Ok(Literal::Bool(false))
            }
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case("null") => Ok(Literal::Null),
            Some(other) => Err(QueryError::UnexpectedToken {
                expected: "literal",
                found: other.to_string(),
            }),
            None => Err(QueryError::UnexpectedEnd("literal")),
        }
    }
}

/// Strip markdown code fences and line breaks a model may wrap around a query.
pub fn clean_model_query(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.is_empty() {
            continue;
        }
        lines.push(trimmed);
    }
    lines.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn documents() -> Vec<Value> {
        vec![
            json!({
                "RequestId": "AAAA1111",
                "Status": "In progress",
                "Approved": true,
                "ProjectedACR": 40000,
                "ExpectedStartDate": "2024-02-10",
                "OperatingUnit": ["FSI", "South"],
                "Attachment": "utils/uploads/x/diagram.png",
                "ProblemDescription": "Copilot for COBOL migration",
            }),
            json!({
                "RequestId": "BBBB2222",
                "Status": "Blocked due to Rejection",
                "Approved": false,
                "ProjectedACR": 5000,
                "ExpectedStartDate": "2024-05-01",
                "OperatingUnit": ["HLS"],
                "Attachment": null,
                "ProblemDescription": "System is not responding",
            }),
            json!({
                "RequestId": "CCCC3333",
                "Status": "In progress",
                "Approved": true,
                "ProjectedACR": 60000,
                "ExpectedStartDate": "2024-03-31",
                "OperatingUnit": ["FSI"],
                "ProblemDescription": "RAG search over contracts",
            }),
        ]
    }

    fn ids(results: &[Value]) -> Vec<&str> {
        results
            .iter()
            .filter_map(|value| value.get("RequestId").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn select_all_returns_every_document() {
        let query = RecordQuery::parse("SELECT * FROM c").expect("parses");
        let docs = documents();
        assert_eq!(query.execute(&docs).len(), 3);
    }

    #[test]
    fn filters_with_boolean_and_date_ranges() {
        let query = RecordQuery::parse(
            "SELECT * FROM c WHERE c.Approved = True AND c.ExpectedStartDate >= '2024-01-01' AND c.ExpectedStartDate <= '2024-03-31'",
        )
        .expect("parses");
        let docs = documents();
        assert_eq!(ids(&query.execute(&docs)), vec!["AAAA1111", "CCCC3333"]);
    }

    #[test]
    fn projection_keeps_named_fields_only() {
        let query =
            RecordQuery::parse("SELECT c.RequestId, c.Status FROM c WHERE c.ProjectedACR > 50000")
                .expect("parses");
        let docs = documents();
        let results = query.execute(&docs);
        assert_eq!(
            results,
            vec![json!({ "RequestId": "CCCC3333", "Status": "In progress" })]
        );
    }

    #[test]
    fn null_checks_treat_missing_fields_as_null() {
        let docs = documents();
        let present = RecordQuery::parse("SELECT * FROM c WHERE c.Attachment IS NOT NULL")
            .expect("parses");
        assert_eq!(ids(&present.execute(&docs)), vec!["AAAA1111"]);

        let absent =
            RecordQuery::parse("SELECT * FROM c WHERE c.Attachment IS NULL").expect("parses");
        assert_eq!(ids(&absent.execute(&docs)), vec!["BBBB2222", "CCCC3333"]);
    }

    #[test]
    fn functions_or_and_not() {
        let docs = documents();
        let query = RecordQuery::parse(
            "SELECT * FROM c WHERE ARRAY_CONTAINS(c.OperatingUnit, 'FSI') AND NOT (c.ProjectedACR > 50000 OR CONTAINS(c.ProblemDescription, 'rag', true))",
        )
        .expect("parses");
        assert_eq!(ids(&query.execute(&docs)), vec!["AAAA1111"]);
    }

    #[test]
    fn order_by_and_top() {
        let docs = documents();
        let query = RecordQuery::parse("SELECT TOP 2 * FROM c ORDER BY c.ProjectedACR DESC")
            .expect("parses");
        assert_eq!(ids(&query.execute(&docs)), vec!["CCCC3333", "AAAA1111"]);
    }

    #[test]
    fn mismatched_types_never_match() {
        let docs = documents();
        let query =
            RecordQuery::parse("SELECT * FROM c WHERE c.ProjectedACR != 'high'").expect("parses");
        assert!(query.execute(&docs).is_empty());
    }

    #[test]
    fn escaped_quotes_in_strings() {
        let query = RecordQuery::parse("SELECT * FROM c WHERE c.CustomerName = 'O''Brien Ltd'")
            .expect("parses");
        let doc = json!({ "CustomerName": "O'Brien Ltd" });
        assert!(query.matches(&doc));
    }

    #[test]
    fn reports_parse_errors() {
        assert_eq!(RecordQuery::parse("   "), Err(QueryError::Empty));
        assert!(matches!(
            RecordQuery::parse("SELECT * FROM c WHERE x.Status = 'a'"),
            Err(QueryError::UnknownAlias { .. })
        ));
        assert!(matches!(
            RecordQuery::parse("SELECT * FROM c WHERE STARTSWITH(c.Status, 'In')"),
            Err(QueryError::UnsupportedFunction(_))
        ));
        assert!(matches!(
            RecordQuery::parse("SELECT * FROM c WHERE c.Status = 'open"),
            Err(QueryError::UnterminatedString)
        ));
        assert!(matches!(
            RecordQuery::parse("SELECT * FROM c WHERE c.Status"),
            Err(QueryError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn cleans_fenced_model_output() {
        let raw = "```sql\nSELECT c.RequestId\nFROM c\n```";
        assert_eq!(clean_model_query(raw), "SELECT c.RequestId FROM c");
    }
}
