use crate::ast::{BinaryOp, LogicalOp, UnaryOp, Value};
use serde::{Deserialize, Serialize};

/// Membership test (`[a, b].includes(x)`) or substring match (`x.includes('a')`).
pub const CALL_INCLUDES: &str = "includes";
/// Prefix text match.
pub const CALL_STARTS_WITH: &str = "startsWith";
/// Suffix text match.
pub const CALL_ENDS_WITH: &str = "endsWith";

/// The call names the generator knows how to render.
pub const CALL_VOCABULARY: &[&str] = &[CALL_INCLUDES, CALL_STARTS_WITH, CALL_ENDS_WITH];

/// A node of a predicate, selector or key tree.
///
/// Every leaf is a [`Expr::Member`] or a [`Expr::Literal`]. Children are
/// boxed and owned by their parent, so a tree is never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Field reference, possibly pre-qualified (`users.id`).
    Member(String),
    Literal(Value),
    /// Comparison or arithmetic (left op right)
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Method call; `args[0]` is the receiver.
    Call { name: String, args: Vec<Expr> },
    /// List literal, only valid as the receiver of a membership call.
    List(Vec<Expr>),
}

impl Expr {
    /// The field name if this node is a member reference.
    pub fn as_member(&self) -> Option<&str> {
        match self {
            Expr::Member(name) => Some(name),
            _ => None,
        }
    }

    /// Number of literal leaves, i.e. the parameters this tree binds.
    pub fn literal_count(&self) -> usize {
        match self {
            Expr::Member(_) => 0,
            Expr::Literal(_) => 1,
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.literal_count() + right.literal_count()
            }
            Expr::Unary { operand, .. } => operand.literal_count(),
            Expr::Call { args, .. } => args.iter().map(Expr::literal_count).sum(),
            Expr::List(items) => items.iter().map(Expr::literal_count).sum(),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Member(name) => write!(f, "{}", name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Logical { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Expr::Call { name, args } => {
                let mut args = args.iter();
                if let Some(receiver) = args.next() {
                    write!(f, "{}.", receiver)?;
                }
                write!(f, "{}(", name)?;
                for (i, arg) in args.enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;

    #[test]
    fn test_display_reads_like_the_fragment() {
        let expr = col("age").gt(18).and(col("name").starts_with("Jo"));
        assert_eq!(expr.to_string(), "(age > 18 && name.startsWith('Jo'))");
    }

    #[test]
    fn test_literal_count() {
        let expr = col("role").is_in(["admin", "mod"]).or(!col("banned"));
        assert_eq!(expr.literal_count(), 2);
    }
}
