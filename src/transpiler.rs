//! SQL Transpiler for expression trees.
//!
//! Converts expression trees into SQL fragments with positional parameters.
//! Literals never reach the SQL text: each one is pushed to the writer's
//! parameter list and replaced by a placeholder.

use serde::{Deserialize, Serialize};

use crate::ast::*;
use crate::error::{QueryError, QueryResult};

/// Escape character used in generated `LIKE ... ESCAPE` clauses.
pub const LIKE_ESCAPE: char = '!';

/// Placeholder convention used for every bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite)
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
}

impl PlaceholderStyle {
    /// Generate the placeholder for a 1-based parameter index.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${}", index),
        }
    }
}

impl std::fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceholderStyle::Question => write!(f, "question"),
            PlaceholderStyle::Dollar => write!(f, "dollar"),
        }
    }
}

/// An SQL fragment and the values bound by its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Call-local accumulator for one generation pass.
///
/// A writer is created for each generation call and consumed by it, so no
/// parameter list outlives or is shared between calls.
#[derive(Debug)]
pub struct SqlWriter {
    style: PlaceholderStyle,
    params: Vec<Value>,
}

impl SqlWriter {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder.
    pub fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        self.style.placeholder(self.params.len())
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    /// Post-order traversal of `expr`, returning its SQL text.
    pub fn write(&mut self, expr: &Expr) -> QueryResult<String> {
        match expr {
            Expr::Member(name) => Ok(name.clone()),
            Expr::Literal(value) => Ok(self.bind(value.clone())),
            Expr::Binary { op, left, right } => {
                let symbol = op
                    .sql_symbol()
                    .ok_or_else(|| QueryError::UnsupportedOperator(op.to_string()))?;
                let left = self.write(left)?;
                let right = self.write(right)?;
                Ok(format!("{} {} {}", left, symbol, right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.write(left)?;
                let right = self.write(right)?;
                Ok(format!("({} {} {})", left, op.sql_keyword(), right))
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => Ok(format!("NOT {}", self.write(operand)?)),
                UnaryOp::Neg => Err(QueryError::UnsupportedOperator(op.to_string())),
            },
            Expr::Call { name, args } => self.write_call(name, args),
            Expr::List(_) => Err(QueryError::InvalidExpression(
                "list literals are only valid as the receiver of includes()".to_string(),
            )),
        }
    }

    fn write_call(&mut self, name: &str, args: &[Expr]) -> QueryResult<String> {
        let [receiver, argument] = args else {
            return Err(QueryError::unsupported_call(
                name,
                format!("expected exactly one argument, got {}", args.len().saturating_sub(1)),
            ));
        };

        match (name, receiver) {
            (CALL_INCLUDES, Expr::List(items)) => self.write_membership(argument, items),
            (CALL_INCLUDES, _) => self.write_like(name, receiver, argument, LikeAnchor::Anywhere),
            (CALL_STARTS_WITH, _) => self.write_like(name, receiver, argument, LikeAnchor::Start),
            (CALL_ENDS_WITH, _) => self.write_like(name, receiver, argument, LikeAnchor::End),
            _ => Err(QueryError::unsupported_call(
                name,
                format!("supported calls are {}", CALL_VOCABULARY.join(", ")),
            )),
        }
    }

    /// `subject IN (p1, p2, ...)`; the subject is written first so that
    /// parameters follow the SQL text order.
    fn write_membership(&mut self, subject: &Expr, items: &[Expr]) -> QueryResult<String> {
        let subject = self.write(subject)?;
        if items.is_empty() {
            return Ok("1 = 0".to_string());
        }
        let items = items
            .iter()
            .map(|item| self.write(item))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!("{} IN ({})", subject, items.join(", ")))
    }

    fn write_like(
        &mut self,
        name: &str,
        subject: &Expr,
        argument: &Expr,
        anchor: LikeAnchor,
    ) -> QueryResult<String> {
        let term = match argument {
            Expr::Literal(Value::String(term)) => term,
            _ => {
                return Err(QueryError::unsupported_call(
                    name,
                    "the search term must be a string literal",
                ));
            }
        };
        let subject = self.write(subject)?;
        let placeholder = self.bind(Value::String(anchor.pattern(term)));
        Ok(format!(
            "{} LIKE {} ESCAPE '{}'",
            subject, placeholder, LIKE_ESCAPE
        ))
    }
}

/// Where a text match is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeAnchor {
    Start,
    End,
    Anywhere,
}

impl LikeAnchor {
    /// Escape the term and place the wildcards.
    fn pattern(&self, term: &str) -> String {
        let escaped = escape_like(term);
        match self {
            LikeAnchor::Start => format!("{}%", escaped),
            LikeAnchor::End => format!("%{}", escaped),
            LikeAnchor::Anywhere => format!("%{}%", escaped),
        }
    }
}

/// Escape `%`, `_` and the escape character itself.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Trait for converting trees to parameterized SQL.
pub trait ToSql {
    /// Convert with the default `?` placeholders.
    fn to_sql(&self) -> QueryResult<SqlFragment> {
        self.to_sql_with(PlaceholderStyle::default())
    }

    fn to_sql_with(&self, style: PlaceholderStyle) -> QueryResult<SqlFragment>;
}

impl ToSql for Expr {
    fn to_sql_with(&self, style: PlaceholderStyle) -> QueryResult<SqlFragment> {
        let mut writer = SqlWriter::new(style);
        let sql = writer.write(self)?;
        Ok(SqlFragment {
            sql,
            params: writer.into_params(),
        })
    }
}
