//! Builder functions and combinators for expression trees.
//!
//! ```
//! use lambdaql::prelude::*;
//!
//! let adult = col("age").gt(18) & col("isActive").eq(true);
//! assert_eq!(adult.to_string(), "(age > 18 && isActive == true)");
//! ```

use crate::ast::{
    BinaryOp, CALL_ENDS_WITH, CALL_INCLUDES, CALL_STARTS_WITH, Expr, LogicalOp, UnaryOp, Value,
};

/// Create a field reference expression
pub fn col(name: &str) -> Expr {
    Expr::Member(name.to_string())
}

/// Create a literal expression
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Create a NULL literal
pub fn null() -> Expr {
    Expr::Literal(Value::Null)
}

/// Logical negation (NOT expr)
pub fn not(expr: impl Into<Expr>) -> Expr {
    Expr::Unary {
        op: UnaryOp::Not,
        operand: Box::new(expr.into()),
    }
}

/// Create a method call expression; `receiver` becomes `args[0]`.
pub fn call<I>(name: &str, receiver: impl Into<Expr>, args: I) -> Expr
where
    I: IntoIterator<Item = Expr>,
{
    let mut all = vec![receiver.into()];
    all.extend(args);
    Expr::Call {
        name: name.to_string(),
        args: all,
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(left: Expr, op: LogicalOp, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Extension trait to add fluent comparison and logical methods to Expr
pub trait ExprExt {
    fn eq(self, rhs: impl Into<Expr>) -> Expr;
    fn ne(self, rhs: impl Into<Expr>) -> Expr;
    fn gt(self, rhs: impl Into<Expr>) -> Expr;
    fn lt(self, rhs: impl Into<Expr>) -> Expr;
    fn gte(self, rhs: impl Into<Expr>) -> Expr;
    fn lte(self, rhs: impl Into<Expr>) -> Expr;

    /// `(self AND rhs)`
    fn and(self, rhs: impl Into<Expr>) -> Expr;
    /// `(self OR rhs)`
    fn or(self, rhs: impl Into<Expr>) -> Expr;

    /// Prefix match: `self LIKE 'pattern%'`
    fn starts_with(self, pattern: &str) -> Expr;
    /// Suffix match: `self LIKE '%pattern'`
    fn ends_with(self, pattern: &str) -> Expr;
    /// Substring match: `self LIKE '%pattern%'`
    fn contains(self, pattern: &str) -> Expr;

    /// Membership test: `self IN (v1, v2, ...)`
    ///
    /// # Example
    /// ```ignore
    /// col("role").is_in(["admin", "mod"])  // role IN (?, ?)
    /// ```
    fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>;
}

impl ExprExt for Expr {
    fn eq(self, rhs: impl Into<Expr>) -> Expr {
        binary(self, BinaryOp::Eq, rhs.into())
    }

    fn ne(self, rhs: impl Into<Expr>) -> Expr {
        binary(self, BinaryOp::Ne, rhs.into())
    }

    fn gt(self, rhs: impl Into<Expr>) -> Expr {
        binary(self, BinaryOp::Gt, rhs.into())
    }

    fn lt(self, rhs: impl Into<Expr>) -> Expr {
        binary(self, BinaryOp::Lt, rhs.into())
    }

    fn gte(self, rhs: impl Into<Expr>) -> Expr {
        binary(self, BinaryOp::Gte, rhs.into())
    }

    fn lte(self, rhs: impl Into<Expr>) -> Expr {
        binary(self, BinaryOp::Lte, rhs.into())
    }

    fn and(self, rhs: impl Into<Expr>) -> Expr {
        logical(self, LogicalOp::And, rhs.into())
    }

    fn or(self, rhs: impl Into<Expr>) -> Expr {
        logical(self, LogicalOp::Or, rhs.into())
    }

    fn starts_with(self, pattern: &str) -> Expr {
        call(CALL_STARTS_WITH, self, [lit(pattern)])
    }

    fn ends_with(self, pattern: &str) -> Expr {
        call(CALL_ENDS_WITH, self, [lit(pattern)])
    }

    fn contains(self, pattern: &str) -> Expr {
        call(CALL_INCLUDES, self, [lit(pattern)])
    }

    fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Expr::List(values.into_iter().map(lit).collect());
        call(CALL_INCLUDES, list, [self])
    }
}

impl std::ops::BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        logical(self, LogicalOp::And, rhs)
    }
}

impl std::ops::BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        logical(self, LogicalOp::Or, rhs)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        not(self)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit(b)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit(n)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit(n)
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        lit(n)
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        lit(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        lit(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_builds_binary() {
        let expr = col("age").gte(21);
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Gte,
                left: Box::new(Expr::Member("age".into())),
                right: Box::new(Expr::Literal(Value::Int(21))),
            }
        );
    }

    #[test]
    fn test_operators_match_combinators() {
        let a = col("a").eq(1);
        let b = col("b").ne("x");
        assert_eq!(a.clone() & b.clone(), a.clone().and(b.clone()));
        assert_eq!(a.clone() | b.clone(), a.clone().or(b));
        assert_eq!(!a.clone(), not(a));
    }

    #[test]
    fn test_field_to_field_comparison() {
        let expr = col("created_at").lt(col("updated_at"));
        assert_eq!(expr.literal_count(), 0);
    }

    #[test]
    fn test_is_in_puts_list_first() {
        let expr = col("id").is_in([1, 2, 3]);
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, CALL_INCLUDES);
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], Expr::List(items) if items.len() == 3));
                assert_eq!(args[1], col("id"));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }
}
