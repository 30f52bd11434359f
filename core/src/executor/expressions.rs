//! Expression evaluation
//!
//! There is no tokenizer and no AST. An expression is split on operators in a
//! fixed priority order, each side evaluated recursively:
//!
//! 1. membership (`a in b`)
//! 2. comparison (first of `==`, `!=`, `>=`, `<=`, `>`, `<`; one per expression)
//! 3. addition / concatenation (`+`, folded left)
//! 4. literals (strings, lists, numbers, booleans, null, parenthesized groups)
//! 5. variable path lookup (`node.data.label`)
//!
//! Splits only happen at the top level, outside string literals and brackets.
//! Evaluation never fails: anything that cannot be resolved is `Undefined`.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::{Arg, Val};
use crate::parser::scan::{find_top_level, is_identifier, is_wrapped, split_top_level};

/// Variable environment
pub type Vars = HashMap<String, Val>;

const COMPARISONS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

/* ===================== Public API ===================== */

/// Evaluate raw expression text against the variable environment
pub fn evaluate(expr: &str, vars: &Vars) -> Val {
    let expr = expr.trim();
    if expr.is_empty() {
        return Val::Undefined;
    }

    if let Some(pos) = find_top_level(expr, " in ") {
        let needle = evaluate(&expr[..pos], vars);
        let haystack = evaluate(&expr[pos + 4..], vars);
        return Val::Bool(contains(&haystack, &needle));
    }

    for op in COMPARISONS {
        if let Some(pos) = find_top_level(expr, op) {
            let left = evaluate(&expr[..pos], vars);
            let right = evaluate(&expr[pos + op.len()..], vars);
            return Val::Bool(compare(op, &left, &right));
        }
    }

    let terms = split_top_level(expr, '+');
    if terms.len() > 1 {
        return terms
            .iter()
            .map(|term| evaluate(term, vars))
            .reduce(|acc, next| add(&acc, &next))
            .unwrap_or(Val::Undefined);
    }

    literal(expr, vars)
}

/// Resolve every argument expression of a call
pub fn evaluate_args(args: &[Arg], vars: &Vars) -> HashMap<String, Val> {
    args.iter()
        .map(|arg| (arg.name.clone(), evaluate(&arg.expr, vars)))
        .collect()
}

/* ===================== Operators ===================== */

fn contains(haystack: &Val, needle: &Val) -> bool {
    match haystack {
        Val::List(items) => items.iter().any(|item| item.equals(needle)),
        Val::Str(s) => match needle {
            Val::Str(n) => s.contains(n.as_str()),
            other if other.is_nullish() => false,
            other => s.contains(&other.to_string()),
        },
        Val::Obj(map) => needle.as_str().map(|k| map.contains_key(k)).unwrap_or(false),
        _ => false,
    }
}

fn compare(op: &str, left: &Val, right: &Val) -> bool {
    match op {
        "==" => left.equals(right),
        "!=" => !left.equals(right),
        _ => match left.compare(right) {
            Some(ord) => match op {
                ">=" => ord != Ordering::Less,
                "<=" => ord != Ordering::Greater,
                ">" => ord == Ordering::Greater,
                "<" => ord == Ordering::Less,
                _ => false,
            },
            None => false,
        },
    }
}

fn add(left: &Val, right: &Val) -> Val {
    if matches!(left, Val::Str(_)) || matches!(right, Val::Str(_)) {
        return Val::Str(left.concat_text() + &right.concat_text());
    }
    Val::Num(addend(left) + addend(right))
}

/// Booleans add as 1 and 0; any other non-number adds as 0
fn addend(value: &Val) -> f64 {
    match value {
        Val::Num(n) => *n,
        Val::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/* ===================== Literals ===================== */

fn literal(expr: &str, vars: &Vars) -> Val {
    if let Some(s) = string_literal(expr) {
        return Val::Str(s);
    }

    if is_wrapped(expr, '[', ']') {
        let inner = expr[1..expr.len() - 1].trim();
        if inner.is_empty() {
            return Val::List(Vec::new());
        }
        return Val::List(
            split_top_level(inner, ',')
                .into_iter()
                .filter(|piece| !piece.trim().is_empty())
                .map(|piece| evaluate(piece, vars))
                .collect(),
        );
    }

    if is_wrapped(expr, '(', ')') {
        return evaluate(&expr[1..expr.len() - 1], vars);
    }

    if let Some(n) = number_literal(expr) {
        return Val::Num(n);
    }

    match expr {
        "True" | "true" => Val::Bool(true),
        "False" | "false" => Val::Bool(false),
        "None" | "null" => Val::Null,
        _ => lookup_path(expr, vars),
    }
}

/// A single quoted string spanning the whole expression, unescaped.
fn string_literal(expr: &str) -> Option<String> {
    let quote = expr.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &expr[1..];

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\'')) => out.push('\''),
                Some((_, '\\')) => out.push('\\'),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return None,
            },
            c if c == quote => {
                // The closing quote must end the expression.
                return (idx + c.len_utf8() == body.len()).then_some(out);
            }
            c => out.push(c),
        }
    }
    None
}

/// `-?[0-9]+(\.[0-9]+)?`
fn number_literal(expr: &str) -> Option<f64> {
    let digits = expr.strip_prefix('-').unwrap_or(expr);
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !frac.map(all_digits).unwrap_or(true) {
        return None;
    }
    expr.parse().ok()
}

/* ===================== Variable Paths ===================== */

/// Resolve `a.b.c` against the environment. Numeric segments index lists.
/// A missing link anywhere yields `Undefined`.
fn lookup_path(path: &str, vars: &Vars) -> Val {
    let mut parts = path.split('.').map(str::trim);

    let root = match parts.next() {
        Some(name) if is_identifier(name) => name,
        _ => return Val::Undefined,
    };
    let mut current = match vars.get(root) {
        Some(v) => v,
        None => return Val::Undefined,
    };

    for part in parts {
        let next = match current {
            Val::Obj(map) => map.get(part),
            Val::List(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Val::Undefined,
        }
    }

    current.clone()
}
