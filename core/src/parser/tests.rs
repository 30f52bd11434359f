use super::*;

fn ops(source: &str) -> Vec<Op> {
    let program = parse(source);
    assert!(program.is_ok(), "unexpected parse error: {:?}", program.error);
    program.instructions.into_iter().map(|i| i.op).collect()
}

/* ===================== Classification ===================== */

#[test]
fn test_simple_statements() {
    let source = r#"x = 1
print(x)
sleep(0.5)
time.sleep(2)
graph.list_nodes()
node = graph.add_node(label="A")
# comment

total += 2"#;

    assert_eq!(
        ops(source),
        vec![
            Op::Assign {
                var: "x".into(),
                expr: "1".into()
            },
            Op::Print { expr: "x".into() },
            Op::Sleep {
                duration: "0.5".into()
            },
            Op::Sleep {
                duration: "2".into()
            },
            Op::Call {
                target: "graph".into(),
                action: "list_nodes".into(),
                args: vec![]
            },
            Op::AssignCall {
                var: "node".into(),
                target: "graph".into(),
                action: "add_node".into(),
                args: vec![Arg::new("label", "\"A\"")]
            },
            Op::Nop,
            Op::Nop,
            Op::Assign {
                var: "total".into(),
                expr: "total + 2".into()
            },
        ]
    );
}

#[test]
fn test_lines_are_one_based() {
    let program = parse("x = 1\n\ny = 2");
    let lines: Vec<usize> = program.instructions.iter().map(|i| i.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[test]
fn test_assignment_of_non_call_expression() {
    // A parenthesized right side that is not `id.action(...)` stays an expression
    assert_eq!(
        ops(r#"label = "node(" + name + ")""#),
        vec![Op::Assign {
            var: "label".into(),
            expr: r#""node(" + name + ")""#.into()
        }]
    );
    assert_eq!(
        ops("same = a == b"),
        vec![Op::Assign {
            var: "same".into(),
            expr: "a == b".into()
        }]
    );
}

#[test]
fn test_trailing_comment_is_stripped() {
    assert_eq!(
        ops(r##"print("# not a comment") # a comment"##),
        vec![Op::Print {
            expr: r##""# not a comment""##.into()
        }]
    );
}

/* ===================== Arguments ===================== */

#[test]
fn test_quoted_commas_do_not_split_args() {
    let program = parse(r#"f.g("x,y", 2)"#);
    match &program.instructions[0].op {
        Op::Call { args, .. } => {
            assert_eq!(args, &vec![Arg::new("0", "\"x,y\""), Arg::new("1", "2")]);
        }
        other => panic!("Expected Call, got {:?}", other),
    }
}

#[test]
fn test_named_and_positional_args() {
    let args = parse_args(r#"1, label="a=b", tags=[1, 2], (3 + 4)"#);
    assert_eq!(
        args,
        vec![
            Arg::new("0", "1"),
            Arg::new("label", "\"a=b\""),
            Arg::new("tags", "[1, 2]"),
            Arg::new("1", "(3 + 4)"),
        ]
    );
    assert!(args[0].is_positional());
    assert!(!args[1].is_positional());
}

#[test]
fn test_comparison_arg_is_positional() {
    assert_eq!(parse_args("a == b"), vec![Arg::new("0", "a == b")]);
}

/* ===================== Blocks ===================== */

#[test]
fn test_if_else_targets() {
    let source = r#"if x:
    print("a")
else:
    print("b")
print("c")"#;
    let program = parse(source);
    let ops: Vec<&Op> = program.instructions.iter().map(|i| &i.op).collect();

    // 0: jump_if_false -> 3, 1: print a, 2: jump -> 4, 3: print b, 4: print c
    assert_eq!(
        ops[0],
        &Op::JumpIfFalse {
            condition: "x".into(),
            target: 3
        }
    );
    assert_eq!(ops[2], &Op::Jump { target: 4 });
    assert_eq!(ops[4], &Op::Print { expr: "\"c\"".into() });
}

#[test]
fn test_for_loop_layout() {
    let source = "for n in [1, 2]:\n    print(n)\nprint(\"done\")";
    assert_eq!(
        ops(source),
        vec![
            Op::IterInit {
                var: "n".into(),
                iterable: "[1, 2]".into()
            },
            Op::IterNext {
                var: "n".into(),
                exit: 4
            },
            Op::Print { expr: "n".into() },
            Op::Jump { target: 1 },
            Op::Print {
                expr: "\"done\"".into()
            },
        ]
    );
}

#[test]
fn test_nested_blocks_resolve_in_range() {
    let source = r#"
for row in rows:
    for cell in row:
        if cell > 1:
            print(cell)
        else:
            if cell == 0:
                print("zero")
    print("row done")
if done:
    print("end")
"#;
    let program = parse(source);
    assert!(program.is_ok());
    assert!(program.jump_targets_resolved());

    let len = program.len();
    for inst in &program.instructions {
        if let Some(target) = inst.op.jump_target() {
            assert!(target <= len, "line {} jumps to {}", inst.line, target);
        }
    }
}

#[test]
fn test_blank_lines_do_not_close_blocks() {
    let source = "if x:\n    a = 1\n\n    b = 2\nc = 3";
    let program = parse(source);
    // The jump-if-false skips both assignments and the blank line
    assert_eq!(
        program.instructions[0].op,
        Op::JumpIfFalse {
            condition: "x".into(),
            target: 4
        }
    );
}

#[test]
fn test_block_open_at_end_of_input() {
    let program = parse("for x in xs:\n    print(x)");
    let len = program.len();
    match &program.instructions[1].op {
        Op::IterNext { exit, .. } => assert_eq!(*exit, len),
        other => panic!("Expected IterNext, got {:?}", other),
    }
}

/* ===================== Errors ===================== */

#[test]
fn test_else_without_if() {
    let program = parse("x = 1\nelse:\n    y = 2");
    assert!(program.instructions.is_empty());
    assert_eq!(
        program.error,
        Some(ParseError::ElseWithoutIf {
            line: 2,
            text: "else:".into()
        })
    );
}

#[test]
fn test_else_at_wrong_indent() {
    let source = "if a:\n    if b:\n        x = 1\nelse:\n    x = 2\n  else:\n    x = 3";
    let program = parse(source);
    assert!(matches!(
        program.error,
        Some(ParseError::ElseWithoutIf { line: 6, .. })
    ));
}

#[test]
fn test_unrecognized_statement() {
    let program = parse("x = 1\nthis is not valid\n");
    assert!(!program.is_ok());
    assert!(program.instructions.is_empty());
    let err = program.error.clone().unwrap();
    assert_eq!(err.line(), 2);
    assert!(err.to_string().contains("this is not valid"));
    assert!(program.into_result().is_err());
}

#[test]
fn test_invalid_headers() {
    assert!(!parse("for x of xs:\n    print(x)").is_ok());
    assert!(!parse("if :\n    print(1)").is_ok());
    assert!(!parse("1 = x").is_ok());
}

/* ===================== Program ===================== */

#[test]
fn test_parse_is_deterministic() {
    let source = r#"
items = ["a", "b"]
for item in items:
    if item == "a":
        graph.add_node(label=item)
    else:
        print("skip " + item)
"#;
    assert_eq!(parse(source), parse(source));
    assert_eq!(parse(source).version_hash(), parse(source).version_hash());
    assert_ne!(parse(source).version_hash(), parse("x = 1").version_hash());
}

#[test]
fn test_program_serializes() {
    let program = parse("if x:\n    print(x)");
    let json = serde_json::to_string(&program).unwrap();
    assert!(json.contains(r#""op":"jump_if_false""#));
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back, program);
}
