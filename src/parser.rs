//! Fragment parser using nom.
//!
//! Parses arrow-function fragments into expression trees, projection lists
//! and key fields.
//!
//! # Syntax Overview
//!
//! ```text
//! (u: User) => u.age >= 18 && ['admin', 'mod'].includes(u.role)
//! ────┬────    ──────┬──────────────────────────┬────────────────
//!     │              │                          │
//!     │              │                          └── Call (receiver first)
//!     │              └── Comparison (field op literal)
//!     └── Lambda head (one parameter, optional type annotation)
//! ```
//!
//! Selectors return the referenced fields in order:
//! `u => ({ name: u.name, contact: { email: u.email } })` gives `[name, email]`.

use std::borrow::Cow;
use std::cell::Cell;
use std::iter;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_while, take_while_m_n},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{opt, recognize},
    error::{ErrorKind, ParseError},
    sequence::{pair, tuple},
};

use crate::ast::*;
use crate::error::{QueryError, QueryResult};

/// Parse a predicate fragment into an expression tree.
///
/// # Example
///
/// ```
/// use lambdaql::parser::parse_predicate;
///
/// let expr = parse_predicate("u => u.age > 18 && u.isActive === true").unwrap();
/// assert_eq!(expr.to_string(), "(age > 18 && isActive == true)");
/// ```
pub fn parse_predicate(fragment: &str) -> QueryResult<Expr> {
    run(fragment, lambda(fragment, Scope::expr))
}

/// Parse a record-shaped selector into its flat, ordered field list.
pub fn parse_selector(fragment: &str) -> QueryResult<Vec<String>> {
    let fields = run(fragment, lambda(fragment, Scope::projection))?;
    if fields.is_empty() {
        return Err(reject(QueryError::parse(
            fragment,
            0,
            "selector must reference at least one field",
        )));
    }
    Ok(fields)
}

/// Parse an ordering or grouping key: a fragment selecting exactly one field.
pub fn parse_key(fragment: &str) -> QueryResult<String> {
    run(fragment, lambda(fragment, Scope::key))
}

/// Parse error carrying the remaining input and, when known, a precise message.
#[derive(Debug, Clone, PartialEq)]
struct FragmentError<'a> {
    input: &'a str,
    message: Option<Cow<'static, str>>,
}

impl<'a> ParseError<&'a str> for FragmentError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            message: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, FragmentError<'a>>;

fn failure<'a>(input: &'a str, message: impl Into<Cow<'static, str>>) -> nom::Err<FragmentError<'a>> {
    nom::Err::Failure(FragmentError {
        input,
        message: Some(message.into()),
    })
}

/// Abort the whole parse with a message. No alternative is tried afterwards.
fn fail<'a, T>(input: &'a str, message: impl Into<Cow<'static, str>>) -> PResult<'a, T> {
    Err(failure(input, message))
}

fn reject(err: QueryError) -> QueryError {
    tracing::debug!(error = %err, "fragment rejected");
    err
}

/// Turn a parser outcome into a `QueryResult`, requiring the whole fragment
/// to be consumed.
fn run<'a, T>(fragment: &'a str, result: PResult<'a, T>) -> QueryResult<T> {
    let error = match result {
        Ok((rest, value)) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                return Ok(value);
            }
            let message = unsupported_construct(rest)
                .unwrap_or_else(|| format!("unexpected trailing input '{}'", snippet(rest)));
            QueryError::parse(fragment, offset(fragment, rest), message)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let message = match e.message {
                Some(message) => message.into_owned(),
                None => describe(e.input),
            };
            QueryError::parse(fragment, offset(fragment, e.input), message)
        }
        Err(nom::Err::Incomplete(_)) => {
            QueryError::parse(fragment, fragment.len(), "unexpected end of fragment")
        }
    };
    Err(reject(error))
}

fn offset(fragment: &str, rest: &str) -> usize {
    fragment.len().saturating_sub(rest.len())
}

fn snippet(input: &str) -> String {
    input.chars().take(16).collect()
}

fn describe(input: &str) -> String {
    let input = input.trim_start();
    if input.is_empty() {
        return "unexpected end of fragment".to_string();
    }
    unsupported_construct(input).unwrap_or_else(|| format!("unexpected input near '{}'", snippet(input)))
}

/// Recognize JS constructs that have no place in a predicate.
fn unsupported_construct(input: &str) -> Option<String> {
    let message = if input.starts_with("??") {
        "nullish coalescing is not supported"
    } else if input.starts_with('?') {
        "conditional expressions are not supported"
    } else if input.starts_with('`') {
        "template literals are not supported"
    } else if input.starts_with("=>") {
        "nested lambdas are not supported"
    } else if input.starts_with('=') {
        "assignment is not supported, use === for comparison"
    } else if input.starts_with('&') || input.starts_with('|') || input.starts_with('^') {
        "bitwise operators are not supported"
    } else {
        return None;
    };
    Some(message.to_string())
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Parse a JS identifier.
fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

/// Match `keyword` as a whole word.
fn keyword<'a>(input: &'a str, word: &str) -> Option<&'a str> {
    input
        .strip_prefix(word)
        .filter(|rest| !rest.starts_with(is_ident_char))
}

/// Consume `token` after optional whitespace, or fail with a precise message.
fn expect(input: &str, token: char) -> PResult<'_, ()> {
    let (input, _) = multispace0(input)?;
    match input.strip_prefix(token) {
        Some(rest) => Ok((rest, ())),
        None if input.is_empty() => fail(input, format!("expected '{}' before end of fragment", token)),
        None => fail(
            input,
            unsupported_construct(input).unwrap_or_else(|| format!("expected '{}' near '{}'", token, snippet(input))),
        ),
    }
}

/// Parse the lambda head (`u =>`, `(u) =>`, `(u: T) =>`, `function (u) {`),
/// the body, and the closing of a block body.
fn lambda<'a, T, F>(input: &'a str, body: F) -> PResult<'a, T>
where
    F: Fn(&Scope<'a>, &'a str) -> PResult<'a, T>,
{
    let (input, _) = multispace0(input)?;

    let (input, param, block) = if let Some(rest) = keyword(input, "function") {
        let (rest, _) = multispace0(rest)?;
        let (rest, _) = opt(identifier)(rest)?;
        let (rest, param) = parenthesized_param(rest)?;
        let (rest, _) = expect(rest, '{')?;
        (rest, param, true)
    } else {
        let (rest, param) = if input.starts_with('(') {
            parenthesized_param(input)?
        } else {
            identifier(input).or_else(|_| fail(input, "expected a lambda parameter"))?
        };
        let (rest, _) = multispace0(rest)?;
        let rest = match rest.strip_prefix("=>") {
            Some(rest) => rest,
            None => return fail(rest, "expected '=>' after the lambda parameter"),
        };
        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('{') {
            Some(rest) => (rest, param, true),
            None => (rest, param, false),
        }
    };

    let scope = Scope::new(param);
    if !block {
        return body(&scope, input);
    }

    let (input, _) = multispace0(input)?;
    let input = match keyword(input, "return") {
        Some(rest) => rest,
        None => return fail(input, "block bodies must consist of a single return statement"),
    };
    let (input, value) = body(&scope, input)?;
    let (input, _) = multispace0(input)?;
    let input = input.strip_prefix(';').unwrap_or(input);
    let (input, _) = expect(input, '}')?;
    Ok((input, value))
}

/// `(u)` or `(u: Type)`
fn parenthesized_param(input: &str) -> PResult<'_, &str> {
    let (input, _) = expect(input, '(')?;
    let (input, _) = multispace0(input)?;
    let (input, param) = identifier(input).or_else(|_| fail(input, "expected a lambda parameter"))?;
    let (input, _) = multispace0(input)?;
    let input = match input.strip_prefix(':') {
        Some(annotation) => skip_annotation(annotation),
        None => input,
    };
    if input.trim_start().starts_with(',') {
        return fail(input, "fragments take exactly one parameter");
    }
    let (input, _) = expect(input, ')')?;
    Ok((input, param))
}

/// Skip a type annotation up to the `)` or `,` that ends it, stepping over
/// bracketed generics such as `Map<string, number>`.
fn skip_annotation(input: &str) -> &str {
    let mut depth = 0usize;
    for (idx, c) in input.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ']' | '}' => depth = depth.saturating_sub(1),
            ')' | ',' if depth == 0 => return &input[idx..],
            ')' => depth -= 1,
            _ => {}
        }
    }
    &input[input.len()..]
}

/// Deepest nesting of prefix operators, parentheses and selector shapes.
const MAX_DEPTH: usize = 64;

/// Intermediate result of a postfix chain: the bare parameter is only valid
/// as the root of a member access.
enum Operand {
    Param,
    Expr(Expr),
}

/// Parsing context of one lambda body.
struct Scope<'p> {
    param: &'p str,
    depth: Cell<usize>,
}

impl<'p> Scope<'p> {
    fn new(param: &'p str) -> Self {
        Self {
            param,
            depth: Cell::new(0),
        }
    }

    /// Run `parse` one nesting level deeper, failing past `MAX_DEPTH`.
    fn nested<'i, T>(&self, input: &'i str, parse: impl FnOnce(&'i str) -> PResult<'i, T>) -> PResult<'i, T> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return fail(input, "expression nested too deeply");
        }
        self.depth.set(depth + 1);
        let result = parse(input);
        self.depth.set(depth);
        result
    }

    fn expr<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        self.or_expr(input)
    }

    fn or_expr<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, left) = self.and_expr(input)?;
        self.logical_chain(input, left, "||", LogicalOp::Or, |i| self.and_expr(i))
    }

    fn and_expr<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, left) = self.equality(input)?;
        self.logical_chain(input, left, "&&", LogicalOp::And, |i| self.equality(i))
    }

    fn equality<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, left) = self.relational(input)?;
        binary_chain(
            input,
            left,
            |i| self.relational(i),
            &[
                ("===", BinaryOp::Eq),
                ("!==", BinaryOp::Ne),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
        )
    }

    fn relational<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, left) = self.additive(input)?;
        binary_chain(
            input,
            left,
            |i| self.additive(i),
            &[
                ("<=", BinaryOp::Lte),
                (">=", BinaryOp::Gte),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
        )
    }

    fn additive<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, left) = self.multiplicative(input)?;
        binary_chain(
            input,
            left,
            |i| self.multiplicative(i),
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
        )
    }

    fn multiplicative<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, left) = self.unary(input)?;
        binary_chain(
            input,
            left,
            |i| self.unary(i),
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
        )
    }

    fn logical_chain<'i, F>(
        &self,
        mut input: &'i str,
        mut left: Expr,
        token: &str,
        op: LogicalOp,
        operand: F,
    ) -> PResult<'i, Expr>
    where
        F: Fn(&'i str) -> PResult<'i, Expr>,
    {
        loop {
            let (remaining, _) = multispace0(input)?;
            let Some(after_op) = remaining.strip_prefix(token) else {
                break;
            };
            let (after_right, right) = operand(after_op)?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            input = after_right;
        }
        Ok((input, left))
    }

    fn unary<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        self.nested(input, |input| self.prefixed(input))
    }

    fn prefixed<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (input, _) = multispace0(input)?;

        if let Some(rest) = input.strip_prefix('!') {
            let (rest, operand) = self.unary(rest)?;
            return Ok((
                rest,
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            ));
        }

        if let Some(rest) = input.strip_prefix('-') {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                let (rest, value) = number(rest, true)?;
                return Ok((rest, Expr::Literal(value)));
            }
            let (rest, operand) = self.unary(rest)?;
            let negated = match operand {
                Expr::Literal(Value::Int(n)) => match n.checked_neg() {
                    Some(n) => Expr::Literal(Value::Int(n)),
                    None => return fail(input, "integer literal is out of range"),
                },
                Expr::Literal(Value::Float(n)) => Expr::Literal(Value::Float(-n)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            };
            return Ok((rest, negated));
        }

        self.postfix(input)
    }

    /// Member access, bracket access and method calls on a primary.
    fn postfix<'i>(&self, input: &'i str) -> PResult<'i, Expr> {
        let (start, _) = multispace0(input)?;
        let (mut input, mut operand) = self.primary(start)?;

        loop {
            let (remaining, _) = multispace0(input)?;

            if let Some(rest) = remaining.strip_prefix('.') {
                let (rest, _) = multispace0(rest)?;
                let (rest, name) =
                    identifier(rest).or_else(|_| fail(rest, "expected a property name after '.'"))?;
                let (after_ws, _) = multispace0(rest)?;

                if after_ws.starts_with('(') {
                    let receiver = match operand {
                        Operand::Param => return fail(remaining, "the lambda parameter cannot be called"),
                        Operand::Expr(expr) => expr,
                    };
                    let (rest, args) = self.arguments(after_ws)?;
                    operand = Operand::Expr(Expr::Call {
                        name: name.to_string(),
                        args: iter::once(receiver).chain(args).collect(),
                    });
                    input = rest;
                } else {
                    operand = access(remaining, operand, name)?;
                    input = rest;
                }
                continue;
            }

            if let Some(rest) = remaining.strip_prefix('[') {
                let (rest, _) = multispace0(rest)?;
                let (rest, key) = match string_literal(rest) {
                    Ok(parsed) => parsed,
                    Err(nom::Err::Error(_)) => return fail(rest, "bracket access requires a string key"),
                    Err(e) => return Err(e),
                };
                let (rest, _) = expect(rest, ']')?;
                operand = access(remaining, operand, &key)?;
                input = rest;
                continue;
            }

            break;
        }

        match operand {
            Operand::Param => fail(
                start,
                format!("the lambda parameter '{}' cannot be used as a value", self.param),
            ),
            Operand::Expr(Expr::List(_)) => fail(
                start,
                "list literals are only supported as the receiver of includes()",
            ),
            Operand::Expr(expr) => Ok((input, expr)),
        }
    }

    /// `(arg, arg, ...)`
    fn arguments<'i>(&self, input: &'i str) -> PResult<'i, Vec<Expr>> {
        self.sequence(input, '(', ')', |i| self.expr(i))
    }

    /// Comma-separated items between `open` and `close`, trailing comma allowed.
    fn sequence<'i, T, F>(&self, input: &'i str, open: char, close: char, item: F) -> PResult<'i, Vec<T>>
    where
        F: Fn(&'i str) -> PResult<'i, T>,
    {
        let (mut input, _) = expect(input, open)?;
        let mut items = Vec::new();
        loop {
            let (remaining, _) = multispace0(input)?;
            if let Some(rest) = remaining.strip_prefix(close) {
                return Ok((rest, items));
            }
            let (rest, value) = item(remaining)?;
            items.push(value);
            let (rest, _) = multispace0(rest)?;
            if let Some(rest) = rest.strip_prefix(',') {
                input = rest;
                continue;
            }
            let (rest, _) = expect(rest, close)?;
            return Ok((rest, items));
        }
    }

    fn primary<'i>(&self, input: &'i str) -> PResult<'i, Operand> {
        let (input, _) = multispace0(input)?;

        match input.chars().next() {
            Some('(') => {
                let (rest, expr) = self.expr(&input[1..])?;
                let (rest, _) = expect(rest, ')')?;
                Ok((rest, Operand::Expr(expr)))
            }
            Some('[') => {
                let (rest, items) = self.sequence(input, '[', ']', |i| self.expr(i))?;
                Ok((rest, Operand::Expr(Expr::List(items))))
            }
            Some('\'') | Some('"') => {
                let (rest, s) = string_literal(input)?;
                Ok((rest, Operand::Expr(Expr::Literal(Value::String(s)))))
            }
            Some('`') => fail(input, "template literals are not supported"),
            Some(c) if c.is_ascii_digit() => {
                let (rest, value) = number(input, false)?;
                Ok((rest, Operand::Expr(Expr::Literal(value))))
            }
            Some(c) if is_ident_start(c) => {
                let (rest, name) = identifier(input)?;
                let operand = match name {
                    "true" => Operand::Expr(Expr::Literal(Value::Bool(true))),
                    "false" => Operand::Expr(Expr::Literal(Value::Bool(false))),
                    "null" | "undefined" => Operand::Expr(Expr::Literal(Value::Null)),
                    name if name == self.param => Operand::Param,
                    other => {
                        return fail(
                            input,
                            format!(
                                "unknown identifier '{}': only the lambda parameter '{}' may be referenced",
                                other, self.param
                            ),
                        );
                    }
                };
                Ok((rest, operand))
            }
            Some(_) => fail(input, describe(input)),
            None => fail(input, "unexpected end of fragment"),
        }
    }

    /// Selector body: object, array, parenthesized selector or a single member.
    fn projection<'i>(&self, input: &'i str) -> PResult<'i, Vec<String>> {
        self.nested(input, |input| self.shape(input))
    }

    fn shape<'i>(&self, input: &'i str) -> PResult<'i, Vec<String>> {
        let (input, _) = multispace0(input)?;

        if let Some(rest) = input.strip_prefix('(') {
            let (rest, fields) = self.projection(rest)?;
            let (rest, _) = expect(rest, ')')?;
            return Ok((rest, fields));
        }

        if input.starts_with('{') {
            let (rest, groups) = self.sequence(input, '{', '}', |i| self.property(i))?;
            return Ok((rest, groups.into_iter().flatten().collect()));
        }

        if input.starts_with('[') {
            let (rest, groups) = self.sequence(input, '[', ']', |i| self.projection(i))?;
            return Ok((rest, groups.into_iter().flatten().collect()));
        }

        match self.postfix(input)? {
            (rest, Expr::Member(name)) => Ok((rest, vec![name])),
            _ => fail(input, "selectors may only reference fields of the lambda parameter"),
        }
    }

    /// `key: selector` inside an object selector. The key is ignored.
    fn property<'i>(&self, input: &'i str) -> PResult<'i, Vec<String>> {
        let (input, _) = multispace0(input)?;
        let (input, _) = match string_literal(input) {
            Ok((rest, key)) => (rest, key),
            Err(nom::Err::Error(_)) => identifier(input)
                .map(|(rest, key)| (rest, key.to_string()))
                .or_else(|_| fail(input, "expected a property name"))?,
            Err(e) => return Err(e),
        };
        let (input, _) = expect(input, ':')?;
        self.projection(input)
    }

    /// Ordering or grouping key: exactly one member.
    fn key<'i>(&self, input: &'i str) -> PResult<'i, String> {
        let (start, _) = multispace0(input)?;
        match self.postfix(start)? {
            (rest, Expr::Member(name)) => Ok((rest, name)),
            _ => fail(start, "keys must select a single field of the lambda parameter"),
        }
    }
}

/// Extend a member path: `u.a` then `.b` gives `a.b`.
fn access<'i>(at: &'i str, operand: Operand, name: &str) -> Result<Operand, nom::Err<FragmentError<'i>>> {
    match operand {
        Operand::Param => Ok(Operand::Expr(Expr::Member(name.to_string()))),
        Operand::Expr(Expr::Member(parent)) => {
            Ok(Operand::Expr(Expr::Member(format!("{}.{}", parent, name))))
        }
        Operand::Expr(_) => Err(failure(
            at,
            "property access is only supported on the lambda parameter and its fields",
        )),
    }
}

/// Generic left-associative binary chain parser
fn binary_chain<'i, F>(
    mut input: &'i str,
    mut left: Expr,
    operand: F,
    operators: &[(&str, BinaryOp)],
) -> PResult<'i, Expr>
where
    F: Fn(&'i str) -> PResult<'i, Expr>,
{
    loop {
        let (remaining, _) = multispace0(input)?;

        let matched = operators
            .iter()
            .find_map(|(token, op)| remaining.strip_prefix(token).map(|rest| (rest, *op)));

        let Some((after_op, op)) = matched else {
            break;
        };
        let (after_right, right) = operand(after_op)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        input = after_right;
    }

    Ok((input, left))
}

/// Parse a number (integer, decimal or exponent form). `negative` applies a
/// `-` that was consumed by the caller, so `i64::MIN` stays representable.
fn number(input: &str, negative: bool) -> PResult<'_, Value> {
    let parsed: PResult<'_, &str> = recognize(tuple((
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            digit1,
        ))),
    )))(input);
    let (rest, text) = parsed?;

    if rest.starts_with(is_ident_char) {
        return fail(rest, format!("invalid numeric literal '{}{}'", text, snippet(rest)));
    }

    let signed = if negative {
        format!("-{}", text)
    } else {
        text.to_string()
    };
    let is_integer = !text.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
    if is_integer {
        return match signed.parse::<i64>() {
            Ok(n) => Ok((rest, Value::Int(n))),
            Err(_) => fail(input, format!("integer literal '{}' is out of range", signed)),
        };
    }
    match signed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok((rest, Value::Float(n))),
        _ => fail(input, format!("numeric literal '{}' is out of range", signed)),
    }
}

/// Parse a single- or double-quoted string with JS escape sequences.
fn string_literal(input: &str) -> PResult<'_, String> {
    let quote = match input.chars().next() {
        Some(c @ ('\'' | '"')) => c,
        _ => {
            return Err(nom::Err::Error(FragmentError::from_error_kind(
                input,
                ErrorKind::Char,
            )));
        }
    };

    let mut rest = &input[quote.len_utf8()..];
    let mut value = String::new();
    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];
        if c == quote {
            return Ok((after, value));
        }
        if c == '\\' {
            let (after, decoded) = escape(rest, after)?;
            value.push(decoded);
            rest = after;
        } else {
            value.push(c);
            rest = after;
        }
    }

    fail(input, "unterminated string literal")
}

/// Decode the escape sequence after the backslash at `at`.
fn escape<'a>(at: &'a str, input: &'a str) -> PResult<'a, char> {
    let Some(c) = input.chars().next() else {
        return fail(at, "unterminated string literal");
    };
    let rest = &input[c.len_utf8()..];

    let simple = match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' if !rest.starts_with(|d: char| d.is_ascii_digit()) => Some('\0'),
        '\\' | '\'' | '"' => Some(c),
        _ => None,
    };
    if let Some(decoded) = simple {
        return Ok((rest, decoded));
    }

    let (rest, code) = match c {
        'x' => hex_code(at, rest, 2, 2)?,
        'u' => match rest.strip_prefix('{') {
            Some(braced) => {
                let (braced, code) = hex_code(at, braced, 1, 6)?;
                match braced.strip_prefix('}') {
                    Some(rest) => (rest, code),
                    None => return fail(at, "unterminated \\u{...} escape sequence"),
                }
            }
            None => hex_code(at, rest, 4, 4)?,
        },
        other => return fail(at, format!("unsupported escape sequence '\\{}'", other)),
    };

    match char::from_u32(code) {
        Some(decoded) => Ok((rest, decoded)),
        None => fail(at, format!("escape sequence '\\u{{{:x}}}' is not a valid character", code)),
    }
}

/// Between `min` and `max` hex digits as a code point.
fn hex_code<'a>(at: &'a str, input: &'a str, min: usize, max: usize) -> PResult<'a, u32> {
    let digits: PResult<'a, &str> = take_while_m_n(min, max, |c: char| c.is_ascii_hexdigit())(input);
    match digits.map(|(rest, digits)| (rest, u32::from_str_radix(digits, 16))) {
        Ok((rest, Ok(code))) => Ok((rest, code)),
        _ => fail(at, "malformed hexadecimal escape sequence"),
    }
}
