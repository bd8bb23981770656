//! Expression trees for predicates, selectors and keys.
//!
//! A tree is built either directly with the [`builders`] functions or by the
//! [`parser`](crate::parser) from fragment text. Both produce the same [`Expr`].

pub mod builders;
pub mod expr;
pub mod operators;
pub mod values;

pub use builders::*;
pub use expr::*;
pub use operators::*;
pub use values::*;
