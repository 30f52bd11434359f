//! List methods

use super::MethodCall;
use crate::executor::errors::RuntimeError;
use crate::executor::types::Val;

pub fn call(call: &MethodCall<'_>, items: &mut Vec<Val>) -> Result<Val, RuntimeError> {
    match call.method {
        "append" => {
            items.push(call.required(0)?.clone());
            Ok(Val::Null)
        }
        "pop" => pop(call, items),
        "remove" => {
            let needle = call.required(0)?;
            let pos = items
                .iter()
                .position(|item| item.equals(needle))
                .ok_or_else(|| call.invalid(format!("{} is not in the list", needle)))?;
            items.remove(pos);
            Ok(Val::Null)
        }
        "clear" => {
            items.clear();
            Ok(Val::Null)
        }
        "length" => Ok(Val::Num(items.len() as f64)),
        _ => Err(call.unknown("list")),
    }
}

/// `pop()` takes the last item; `pop(i)` takes index `i`, counting from the
/// end when negative.
fn pop(call: &MethodCall<'_>, items: &mut Vec<Val>) -> Result<Val, RuntimeError> {
    if items.is_empty() {
        return Err(call.invalid("pop from empty list"));
    }

    let len = items.len() as i64;
    let idx = match call.arg(0) {
        None | Some(Val::Undefined) | Some(Val::Null) => len - 1,
        Some(Val::Num(n)) if n.fract() == 0.0 => {
            let i = *n as i64;
            if i < 0 {
                len + i
            } else {
                i
            }
        }
        Some(other) => {
            return Err(call.invalid(format!(
                "index must be an integer, got {}",
                other.type_name()
            )))
        }
    };

    if idx < 0 || idx >= len {
        return Err(call.invalid(format!("index {} out of range", idx)));
    }
    Ok(items.remove(idx as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use std::collections::HashMap;

    fn nums(values: &[f64]) -> Vec<Val> {
        values.iter().map(|n| Val::Num(*n)).collect()
    }

    fn run(
        method: &str,
        args: HashMap<String, Val>,
        items: &mut Vec<Val>,
    ) -> Result<Val, RuntimeError> {
        let call = MethodCall {
            line: 1,
            method,
            args: &args,
        };
        super::call(&call, items)
    }

    #[test]
    fn test_append_and_length() {
        let mut items = nums(&[1.0]);
        run("append", hashmap! { "0".to_string() => Val::Num(2.0) }, &mut items).unwrap();
        assert_eq!(items, nums(&[1.0, 2.0]));
        assert_eq!(run("length", HashMap::new(), &mut items).unwrap(), Val::Num(2.0));
    }

    #[test]
    fn test_pop_variants() {
        let mut items = nums(&[1.0, 2.0, 3.0]);
        assert_eq!(run("pop", HashMap::new(), &mut items).unwrap(), Val::Num(3.0));
        assert_eq!(
            run("pop", hashmap! { "0".to_string() => Val::Num(0.0) }, &mut items).unwrap(),
            Val::Num(1.0)
        );
        assert_eq!(
            run("pop", hashmap! { "0".to_string() => Val::Num(-1.0) }, &mut items).unwrap(),
            Val::Num(2.0)
        );
        assert!(matches!(
            run("pop", HashMap::new(), &mut items),
            Err(RuntimeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_remove_first_match() {
        let mut items = nums(&[1.0, 2.0, 1.0]);
        run("remove", hashmap! { "0".to_string() => Val::Num(1.0) }, &mut items).unwrap();
        assert_eq!(items, nums(&[2.0, 1.0]));
        assert!(run("remove", hashmap! { "0".to_string() => Val::Num(9.0) }, &mut items).is_err());
    }

    #[test]
    fn test_clear_and_unknown() {
        let mut items = nums(&[1.0]);
        run("clear", HashMap::new(), &mut items).unwrap();
        assert!(items.is_empty());
        assert!(matches!(
            run("sort", HashMap::new(), &mut items),
            Err(RuntimeError::UnknownMethod { kind: "list", .. })
        ));
    }
}
