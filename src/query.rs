//! Immutable, chainable query descriptor.
//!
//! Every builder method borrows the descriptor and returns a new one, so a
//! base query can be shared and extended in several directions:
//!
//! ```
//! use lambdaql::prelude::*;
//!
//! let users = lambdaql::from("users");
//! let adults = users.filter(col("age").gt(18));
//! let page = adults.order_by("name").take(10);
//!
//! let compiled = page.compile().unwrap();
//! assert_eq!(compiled.sql, "SELECT * FROM users WHERE age > ? ORDER BY name ASC LIMIT 10");
//! assert_eq!(users.compile().unwrap().sql, "SELECT * FROM users");
//! ```
//!
//! A clause whose fragment fails to parse keeps the error in its slot.
//! `compile()` reports it every time until the clause is replaced.

use serde::Serialize;

use crate::ast::*;
use crate::config::CompilerConfig;
use crate::error::{QueryError, QueryResult};
use crate::parser;
use crate::transpiler::{PlaceholderStyle, SqlFragment, SqlWriter, ToSql};

/// Arrow-function source text for a predicate, selector or key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a>(&'a str);

impl<'a> Fragment<'a> {
    pub fn new(text: &'a str) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

/// Wrap fragment text, e.g. `fragment("u => u.age > 18")`.
pub fn fragment(text: &str) -> Fragment<'_> {
    Fragment(text)
}

/// Anything usable as a `WHERE` / `HAVING` predicate.
pub trait IntoPredicate {
    fn into_predicate(self) -> QueryResult<Expr>;
}

impl IntoPredicate for Expr {
    fn into_predicate(self) -> QueryResult<Expr> {
        Ok(self)
    }
}

impl IntoPredicate for Fragment<'_> {
    fn into_predicate(self) -> QueryResult<Expr> {
        parser::parse_predicate(self.0)
    }
}

/// Anything usable as a projection list.
pub trait IntoSelection {
    fn into_selection(self) -> QueryResult<Vec<String>>;
}

impl IntoSelection for Fragment<'_> {
    fn into_selection(self) -> QueryResult<Vec<String>> {
        parser::parse_selector(self.0)
    }
}

impl IntoSelection for Vec<String> {
    fn into_selection(self) -> QueryResult<Vec<String>> {
        if self.is_empty() {
            return Err(QueryError::InvalidExpression(
                "selection must name at least one field".to_string(),
            ));
        }
        if let Some(position) = self.iter().position(|field| field.trim().is_empty()) {
            return Err(QueryError::InvalidExpression(format!(
                "selection entry {} must name a field",
                position + 1
            )));
        }
        Ok(self)
    }
}

impl IntoSelection for Vec<&str> {
    fn into_selection(self) -> QueryResult<Vec<String>> {
        self.as_slice().into_selection()
    }
}

impl IntoSelection for &[&str] {
    fn into_selection(self) -> QueryResult<Vec<String>> {
        self.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_selection()
    }
}

impl<const N: usize> IntoSelection for [&str; N] {
    fn into_selection(self) -> QueryResult<Vec<String>> {
        self.as_slice().into_selection()
    }
}

/// Anything naming a single field (order-by and group-by keys).
pub trait IntoKey {
    fn into_key(self) -> QueryResult<String>;
}

impl IntoKey for &str {
    fn into_key(self) -> QueryResult<String> {
        self.to_string().into_key()
    }
}

impl IntoKey for String {
    fn into_key(self) -> QueryResult<String> {
        if self.trim().is_empty() {
            return Err(QueryError::InvalidExpression(
                "key must name a field".to_string(),
            ));
        }
        Ok(self)
    }
}

impl IntoKey for Fragment<'_> {
    fn into_key(self) -> QueryResult<String> {
        parser::parse_key(self.0)
    }
}

impl IntoKey for Expr {
    fn into_key(self) -> QueryResult<String> {
        match self {
            Expr::Member(name) => Ok(name),
            other => Err(QueryError::InvalidExpression(format!(
                "key must be a field reference, got `{}`",
                other
            ))),
        }
    }
}

/// A join clause; the condition is emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub condition: String,
}

/// Compiled SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl From<CompiledQuery> for SqlFragment {
    fn from(query: CompiledQuery) -> Self {
        SqlFragment {
            sql: query.sql,
            params: query.params,
        }
    }
}

/// Query descriptor over one source table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    filter: Option<QueryResult<Expr>>,
    columns: Option<QueryResult<Vec<String>>>,
    order: Vec<QueryResult<(String, SortOrder)>>,
    joins: Vec<Join>,
    group_by: Option<QueryResult<String>>,
    having: Option<QueryResult<Expr>>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    /// Start a descriptor selecting every column of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            columns: None,
            order: Vec::new(),
            joins: Vec::new(),
            group_by: None,
            having: None,
            limit: None,
            offset: None,
        }
    }

    fn with(&self, change: impl FnOnce(&mut Query)) -> Query {
        let mut next = self.clone();
        change(&mut next);
        next
    }

    /// Set the filter, replacing any previous one.
    pub fn filter(&self, predicate: impl IntoPredicate) -> Query {
        let predicate = predicate.into_predicate();
        self.with(|q| q.filter = Some(predicate))
    }

    /// Combine with the stored filter using `AND`.
    pub fn and_filter(&self, predicate: impl IntoPredicate) -> Query {
        self.combine_filter(LogicalOp::And, predicate.into_predicate())
    }

    /// Combine with the stored filter using `OR`.
    pub fn or_filter(&self, predicate: impl IntoPredicate) -> Query {
        self.combine_filter(LogicalOp::Or, predicate.into_predicate())
    }

    fn combine_filter(&self, op: LogicalOp, predicate: QueryResult<Expr>) -> Query {
        let combined = match self.filter.clone() {
            None => predicate,
            Some(previous) => previous.and_then(|left| {
                predicate.map(|right| Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }),
        };
        self.with(|q| q.filter = Some(combined))
    }

    /// Set the projection list, replacing any previous one.
    pub fn select(&self, selection: impl IntoSelection) -> Query {
        let columns = selection.into_selection();
        self.with(|q| q.columns = Some(columns))
    }

    /// Append an ascending sort key.
    pub fn order_by(&self, key: impl IntoKey) -> Query {
        self.push_order(key, SortOrder::Asc)
    }

    /// Append a descending sort key.
    pub fn order_by_desc(&self, key: impl IntoKey) -> Query {
        self.push_order(key, SortOrder::Desc)
    }

    fn push_order(&self, key: impl IntoKey, order: SortOrder) -> Query {
        let entry = key.into_key().map(|field| (field, order));
        self.with(|q| q.order.push(entry))
    }

    pub fn take(&self, n: u64) -> Query {
        self.with(|q| q.limit = Some(n))
    }

    pub fn skip(&self, n: u64) -> Query {
        self.with(|q| q.offset = Some(n))
    }

    /// Append an `INNER JOIN table ON condition`.
    pub fn join(&self, table: &str, condition: &str) -> Query {
        self.push_join(JoinKind::Inner, table, condition)
    }

    /// Append a `LEFT JOIN table ON condition`.
    pub fn left_join(&self, table: &str, condition: &str) -> Query {
        self.push_join(JoinKind::Left, table, condition)
    }

    fn push_join(&self, kind: JoinKind, table: &str, condition: &str) -> Query {
        let join = Join {
            kind,
            table: table.to_string(),
            condition: condition.to_string(),
        };
        self.with(|q| q.joins.push(join))
    }

    pub fn group_by(&self, key: impl IntoKey) -> Query {
        let key = key.into_key();
        self.with(|q| q.group_by = Some(key))
    }

    pub fn having(&self, predicate: impl IntoPredicate) -> Query {
        let predicate = predicate.into_predicate();
        self.with(|q| q.having = Some(predicate))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// The stored filter, if set and valid.
    pub fn filter_expr(&self) -> Option<&Expr> {
        self.filter.as_ref().and_then(|f| f.as_ref().ok())
    }

    /// Compile with `?` placeholders.
    pub fn compile(&self) -> QueryResult<CompiledQuery> {
        self.compile_with(&CompilerConfig::default())
    }

    /// Compile to SQL text and positional parameters.
    pub fn compile_with(&self, config: &CompilerConfig) -> QueryResult<CompiledQuery> {
        if self.table.trim().is_empty() {
            return Err(QueryError::InvalidExpression(
                "source table must not be empty".to_string(),
            ));
        }

        let mut writer = SqlWriter::new(config.placeholder);
        let mut sql = String::from("SELECT ");

        // Columns
        match &self.columns {
            Some(columns) => sql.push_str(&stored(columns)?.join(", ")),
            None => sql.push('*'),
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            sql.push_str(&format!(" {} {} ON {}", join.kind, join.table, join.condition));
        }

        // WHERE
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&writer.write(stored(filter)?)?);
        }

        if let Some(key) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(stored(key)?);
        }

        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&writer.write(stored(having)?)?);
        }

        // ORDER BY
        if !self.order.is_empty() {
            let keys = self
                .order
                .iter()
                .map(|entry| stored(entry).map(|(field, order)| format!("{} {}", field, order)))
                .collect::<QueryResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        if let Some(n) = self.offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }

        tracing::debug!(
            table = %self.table,
            params = writer.params().len(),
            placeholder = %config.placeholder,
            "compiled query"
        );

        Ok(CompiledQuery {
            sql,
            params: writer.into_params(),
        })
    }
}

impl ToSql for Query {
    fn to_sql_with(&self, style: PlaceholderStyle) -> QueryResult<SqlFragment> {
        self.compile_with(&CompilerConfig::with_placeholder(style))
            .map(SqlFragment::from)
    }
}

/// Borrow a slot's value or hand back a copy of its stored error.
fn stored<T>(slot: &QueryResult<T>) -> QueryResult<&T> {
    slot.as_ref().map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_table() {
        let compiled = Query::new("users").compile().unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM users");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_builder_does_not_mutate_receiver() {
        let base = Query::new("users").filter(col("age").gt(18));
        let _ = base.take(5).order_by("name").select(["name"]);
        assert_eq!(base.compile().unwrap().sql, "SELECT * FROM users WHERE age > ?");
    }

    #[test]
    fn test_filter_replaces() {
        let q = Query::new("t")
            .filter(col("a").eq(1))
            .filter(col("b").eq(2));
        let compiled = q.compile().unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM t WHERE b = ?");
        assert_eq!(compiled.params, vec![Value::Int(2)]);
    }

    #[test]
    fn test_and_filter_combines() {
        let q = Query::new("t")
            .filter(col("a").eq(1))
            .and_filter(col("b").eq(2))
            .or_filter(col("c").eq(3));
        assert_eq!(
            q.compile().unwrap().sql,
            "SELECT * FROM t WHERE ((a = ? AND b = ?) OR c = ?)"
        );
    }

    #[test]
    fn test_and_filter_without_previous_is_filter() {
        let a = Query::new("t").and_filter(col("a").eq(1));
        let b = Query::new("t").filter(col("a").eq(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_accumulates() {
        let q = Query::new("t").order_by("a").order_by_desc("b").order_by(col("c"));
        assert_eq!(
            q.compile().unwrap().sql,
            "SELECT * FROM t ORDER BY a ASC, b DESC, c ASC"
        );
    }

    #[test]
    fn test_bad_fragment_fails_until_replaced() {
        let bad = Query::new("t").filter(fragment("u => u.a ? 1 : 2"));
        assert!(bad.compile().unwrap_err().is_parse());
        assert!(bad.compile().unwrap_err().is_parse());

        let fixed = bad.filter(fragment("u => u.a == 1"));
        assert_eq!(fixed.compile().unwrap().sql, "SELECT * FROM t WHERE a = ?");
    }

    #[test]
    fn test_bad_key_expr() {
        let err = Query::new("t").group_by(col("a").eq(1)).compile().unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression(_)));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let err = Query::new("t").select(Vec::<String>::new()).compile().unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression(_)));
    }

    #[test]
    fn test_blank_selection_entry_rejected() {
        for columns in [vec!["a", "", "b"], vec!["a", "  "]] {
            let err = Query::new("t").select(columns).compile().unwrap_err();
            assert!(matches!(err, QueryError::InvalidExpression(ref msg) if msg.contains("must name a field")));
        }

        let fixed = Query::new("t").select(["a", ""]).select(["a", "b"]);
        assert_eq!(fixed.compile().unwrap().sql, "SELECT a, b FROM t");
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(Query::new("").compile().is_err());
    }

    #[test]
    fn test_query_to_sql() {
        let fragment = Query::new("t")
            .filter(col("a").eq(1))
            .to_sql_with(PlaceholderStyle::Dollar)
            .unwrap();
        assert_eq!(fragment.sql, "SELECT * FROM t WHERE a = $1");
        assert_eq!(fragment.params, vec![Value::Int(1)]);
    }
}
