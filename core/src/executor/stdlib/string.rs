//! String methods

use super::MethodCall;
use crate::executor::errors::RuntimeError;
use crate::executor::types::Val;

pub fn call(call: &MethodCall<'_>, s: &str) -> Result<Val, RuntimeError> {
    match call.method {
        "split" => split(call, s),
        "replace" => {
            let from = text_arg(call, 0)?;
            let to = call.required(1)?.concat_text();
            Ok(Val::Str(s.replace(from, &to)))
        }
        "lower" => Ok(Val::Str(s.to_lowercase())),
        "upper" => Ok(Val::Str(s.to_uppercase())),
        "length" => Ok(Val::Num(s.chars().count() as f64)),
        _ => Err(call.unknown("string")),
    }
}

/// `split()` splits on runs of whitespace; `split(sep)` on every `sep`.
fn split(call: &MethodCall<'_>, s: &str) -> Result<Val, RuntimeError> {
    let parts: Vec<Val> = match call.arg(0) {
        None | Some(Val::Undefined) | Some(Val::Null) => {
            s.split_whitespace().map(Val::from).collect()
        }
        Some(Val::Str(sep)) if sep.is_empty() => return Err(call.invalid("empty separator")),
        Some(Val::Str(sep)) => s.split(sep.as_str()).map(Val::from).collect(),
        Some(other) => {
            return Err(call.invalid(format!(
                "separator must be a string, got {}",
                other.type_name()
            )))
        }
    };
    Ok(Val::List(parts))
}

fn text_arg<'a>(call: &MethodCall<'a>, idx: usize) -> Result<&'a str, RuntimeError> {
    match call.required(idx)? {
        Val::Str(s) => Ok(s),
        other => Err(call.invalid(format!("expected a string, got {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use std::collections::HashMap;

    fn run(method: &str, args: HashMap<String, Val>, s: &str) -> Result<Val, RuntimeError> {
        let call = MethodCall {
            line: 3,
            method,
            args: &args,
        };
        super::call(&call, s)
    }

    #[test]
    fn test_split() {
        assert_eq!(
            run("split", hashmap! { "0".to_string() => Val::from(",") }, "a,b,,c").unwrap(),
            Val::List(vec![Val::from("a"), Val::from("b"), Val::from(""), Val::from("c")])
        );
        assert_eq!(
            run("split", HashMap::new(), "  a  b ").unwrap(),
            Val::List(vec![Val::from("a"), Val::from("b")])
        );
    }

    #[test]
    fn test_replace_and_case() {
        let args = hashmap! {
            "0".to_string() => Val::from("o"),
            "1".to_string() => Val::from("0"),
        };
        assert_eq!(run("replace", args, "foo").unwrap(), Val::from("f00"));
        assert_eq!(run("upper", HashMap::new(), "Node").unwrap(), Val::from("NODE"));
        assert_eq!(run("lower", HashMap::new(), "Node").unwrap(), Val::from("node"));
    }

    #[test]
    fn test_invalid_arguments_carry_line() {
        let err = run("replace", HashMap::new(), "foo").unwrap_err();
        assert_eq!(err.line(), 3);
        assert!(matches!(
            run("strip", HashMap::new(), "foo"),
            Err(RuntimeError::UnknownMethod { kind: "string", .. })
        ));
    }
}
