//! End-to-end compile tests: builder calls in, SQL text and params out.

use lambdaql::prelude::*;
use pretty_assertions::assert_eq;

fn dollar() -> CompilerConfig {
    CompilerConfig::with_placeholder(PlaceholderStyle::Dollar)
}

#[test]
fn test_filtered_ordered_page() {
    let compiled = lambdaql::from("users")
        .filter(fragment("u => u.age > 18 && u.isActive === true"))
        .order_by(fragment("u => u.name"))
        .take(10)
        .compile()
        .unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE (age > ? AND isActive = ?) ORDER BY name ASC LIMIT 10"
    );
    assert_eq!(compiled.params, vec![Value::Int(18), Value::Bool(true)]);
}

#[test]
fn test_typed_and_text_predicates_agree() {
    let typed = lambdaql::from("users")
        .filter(col("age").gt(18) & col("isActive").eq(true))
        .compile()
        .unwrap();
    let text = lambdaql::from("users")
        .filter(fragment("(u: User) => { return u.age > 18 && u.isActive == true; }"))
        .compile()
        .unwrap();
    assert_eq!(typed, text);
}

#[test]
fn test_selector_projection() {
    let compiled = lambdaql::from("users")
        .select(fragment("u => ({ name: u.name, email: u.email })"))
        .compile()
        .unwrap();
    assert_eq!(compiled.sql, "SELECT name, email FROM users");
    assert!(compiled.params.is_empty());
}

#[test]
fn test_conditional_is_parse_error() {
    let query = lambdaql::from("users").filter(fragment("u => u.age > 18 ? u.a : u.b"));
    let err = query.compile().unwrap_err();
    match err {
        QueryError::Parse { fragment, message, .. } => {
            assert_eq!(fragment, "u => u.age > 18 ? u.a : u.b");
            assert!(message.contains("conditional"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_param_count_matches_leaves() {
    let compiled = lambdaql::from("t")
        .filter(fragment(
            "u => u.a == 1 && (u.b != 'two' || u.c < 3.5) && !(u.d >= false)",
        ))
        .compile()
        .unwrap();
    assert_eq!(
        compiled.params,
        vec![
            Value::Int(1),
            Value::from("two"),
            Value::Float(3.5),
            Value::Bool(false),
        ]
    );
    assert_eq!(compiled.sql.matches('?').count(), compiled.params.len());
}

#[test]
fn test_later_filter_wins() {
    let compiled = lambdaql::from("t")
        .filter(col("a").eq(1))
        .filter(col("b").eq(2))
        .compile()
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM t WHERE b = ?");
    assert_eq!(compiled.params, vec![Value::Int(2)]);
}

#[test]
fn test_compile_is_idempotent() {
    let query = lambdaql::from("users")
        .filter(col("name").starts_with("Jo") | col("role").is_in(["admin", "mod"]))
        .left_join("teams", "teams.id = users.team_id")
        .order_by_desc("createdAt");
    assert_eq!(query.compile().unwrap(), query.compile().unwrap());
}

#[test]
fn test_limit_before_offset_regardless_of_call_order() {
    let a = lambdaql::from("t").take(10).skip(20).compile().unwrap();
    let b = lambdaql::from("t").skip(20).take(10).compile().unwrap();
    assert_eq!(a.sql, "SELECT * FROM t LIMIT 10 OFFSET 20");
    assert_eq!(a, b);
}

#[test]
fn test_take_and_skip_replace() {
    let compiled = lambdaql::from("t").take(5).take(7).skip(1).skip(2).compile().unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM t LIMIT 7 OFFSET 2");
}

#[test]
fn test_full_clause_order() {
    let compiled = lambdaql::from("orders")
        .select(["customers.name", "orders.status"])
        .join("customers", "customers.id = orders.customer_id")
        .left_join("refunds", "refunds.order_id = orders.id")
        .filter(fragment("o => o['orders.total'] > 100"))
        .group_by("orders.status")
        .having(fragment("o => o.status != 'void'"))
        .order_by("customers.name")
        .take(20)
        .skip(40)
        .compile_with(&dollar())
        .unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT customers.name, orders.status FROM orders \
         INNER JOIN customers ON customers.id = orders.customer_id \
         LEFT JOIN refunds ON refunds.order_id = orders.id \
         WHERE orders.total > $1 \
         GROUP BY orders.status \
         HAVING status != $2 \
         ORDER BY customers.name ASC \
         LIMIT 20 OFFSET 40"
    );
    assert_eq!(compiled.params, vec![Value::Int(100), Value::from("void")]);
}

#[test]
fn test_filter_params_precede_having_params() {
    let compiled = lambdaql::from("t")
        .having(col("n").gt(5))
        .group_by("g")
        .filter(col("a").eq(1) & col("b").eq(2))
        .compile_with(&dollar())
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM t WHERE (a = $1 AND b = $2) GROUP BY g HAVING n > $3"
    );
    assert_eq!(compiled.params, vec![Value::Int(1), Value::Int(2), Value::Int(5)]);
}

#[test]
fn test_like_patterns() {
    let compiled = lambdaql::from("users")
        .filter(fragment(
            "u => u.name.startsWith('Jo') && u.email.endsWith('@x.io') && u.bio.includes('100%')",
        ))
        .compile()
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE ((name LIKE ? ESCAPE '!' AND email LIKE ? ESCAPE '!') \
         AND bio LIKE ? ESCAPE '!')"
    );
    assert_eq!(
        compiled.params,
        vec![Value::from("Jo%"), Value::from("%@x.io"), Value::from("%100!%%")]
    );
}

#[test]
fn test_membership_from_builder() {
    let compiled = lambdaql::from("users")
        .filter(col("id").is_in([3, 5, 8]))
        .compile_with(&dollar())
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM users WHERE id IN ($1, $2, $3)");
}

#[test]
fn test_generation_errors() {
    let err = lambdaql::from("t")
        .filter(fragment("u => u.a * 2 > 3"))
        .compile()
        .unwrap_err();
    assert_eq!(err, QueryError::UnsupportedOperator("*".into()));

    let err = lambdaql::from("t")
        .filter(fragment("u => u.name.trim() == 'x'"))
        .compile()
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedCall { name, .. } if name == "trim"));
}

#[test]
fn test_bad_order_key_fails_compile() {
    let err = lambdaql::from("t")
        .order_by(fragment("u => u.a == 1"))
        .compile()
        .unwrap_err();
    assert!(err.is_parse());
}

#[test]
fn test_compiled_query_json() {
    let compiled = lambdaql::from("t")
        .filter(col("a").eq("x") & col("b").eq(Value::Null))
        .compile()
        .unwrap();
    let json = serde_json::to_value(&compiled).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "sql": "SELECT * FROM t WHERE (a = ? AND b = ?)",
            "params": ["x", null],
        })
    );
}

#[test]
fn test_deeply_nested_fragment_fails_compile() {
    let text = format!("u => {}u.a == 1{}", "(".repeat(10_000), ")".repeat(10_000));
    let err = lambdaql::from("t").filter(fragment(&text)).compile().unwrap_err();
    assert!(err.is_parse());
    assert!(err.to_string().contains("nested too deeply"));
}

#[test]
fn test_escaped_string_binds_decoded_text() {
    let compiled = lambdaql::from("t")
        .filter(fragment(r"u => u.code == '\x41B' && u.tag == 'it\'s'"))
        .compile()
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM t WHERE (code = ? AND tag = ?)");
    assert_eq!(
        compiled.params,
        vec![Value::String("AB".to_string()), Value::String("it's".to_string())]
    );

    let err = lambdaql::from("t")
        .filter(fragment(r"u => u.code == '\q'"))
        .compile()
        .unwrap_err();
    assert!(err.is_parse());
}

#[test]
fn test_integer_literals_stay_integers() {
    let compiled = lambdaql::from("t")
        .filter(fragment("u => u.id == -9223372036854775808"))
        .compile()
        .unwrap();
    assert_eq!(compiled.params, vec![Value::Int(i64::MIN)]);

    let err = lambdaql::from("t")
        .filter(fragment("u => u.id == 9223372036854775808"))
        .compile()
        .unwrap_err();
    assert!(err.is_parse());
}

#[test]
fn test_blank_selection_entry_fails_compile() {
    let err = lambdaql::from("t").select(vec!["a", " ", "b"]).compile().unwrap_err();
    assert!(matches!(err, QueryError::InvalidExpression(_)));
}

#[test]
fn test_annotated_parameter() {
    let compiled = lambdaql::from("t")
        .filter(fragment("(u: Record<string, number>) => u.a > 1"))
        .compile()
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM t WHERE a > ?");
}
