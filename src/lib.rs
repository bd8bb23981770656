//! # lambdaql: predicates in, parameterized SQL out
//!
//! lambdaql compiles typed predicates, projections and sort keys into one SQL
//! statement plus a vector of positional bound values. Literal data never
//! reaches the SQL text.
//!
//! ## Quick Example
//!
//! ```
//! use lambdaql::prelude::*;
//!
//! let query = lambdaql::from("users")
//!     .filter(col("age").gt(18) & col("isActive").eq(true))
//!     .order_by("name")
//!     .take(10);
//!
//! let compiled = query.compile().unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT * FROM users WHERE (age > ? AND isActive = ?) ORDER BY name ASC LIMIT 10"
//! );
//! assert_eq!(compiled.params, vec![Value::Int(18), Value::Bool(true)]);
//! ```
//!
//! ## Fragments
//!
//! Predicates stored as arrow-function text are parsed into the same trees:
//!
//! ```
//! use lambdaql::prelude::*;
//!
//! let query = lambdaql::from("users")
//!     .filter(fragment("u => u.age > 18 && ['admin', 'mod'].includes(u.role)"))
//!     .select(fragment("u => ({ name: u.name, email: u.email })"));
//!
//! let compiled = query.compile().unwrap();
//! assert_eq!(compiled.sql, "SELECT name, email FROM users WHERE (age > ? AND role IN (?, ?))");
//! ```
//!
//! | Fragment            | SQL                          |
//! |---------------------|------------------------------|
//! | `u.a === 1`         | `a = ?`                      |
//! | `a && b`, `a \|\| b`| `(a AND b)`, `(a OR b)`      |
//! | `!u.banned`         | `NOT banned`                 |
//! | `u.name.startsWith('J')` | `name LIKE ? ESCAPE '!'` bound to `J%` |
//! | `[1, 2].includes(u.id)`  | `id IN (?, ?)`          |

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod query;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{CompilerConfig, Config};
    pub use crate::engine::Database;
    pub use crate::error::*;
    pub use crate::query::{
        CompiledQuery, Fragment, IntoKey, IntoPredicate, IntoSelection, Query, fragment,
    };
    pub use crate::transpiler::{PlaceholderStyle, ToSql};
}

/// Start a query over `table`.
///
/// # Example
///
/// ```
/// let compiled = lambdaql::from("users").select(["name", "email"]).compile().unwrap();
/// assert_eq!(compiled.sql, "SELECT name, email FROM users");
/// assert!(compiled.params.is_empty());
/// ```
pub fn from(table: &str) -> query::Query {
    query::Query::new(table)
}
