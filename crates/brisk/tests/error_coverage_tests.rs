//! Error reporting: codes, messages, locations and batched syntax errors

use std::collections::HashMap;

use brisk::parser::parse_source;
use brisk::*;
use pretty_assertions::assert_eq;

fn runtime_error(source: &str) -> RuntimeError {
    let mut interp = Interpreter::new().with_output(CaptureSink::new());
    match interp.run_source("err.brs", source) {
        Err(BriskError::Runtime(err)) => err,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

fn syntax_errors(source: &str) -> Vec<SyntaxError> {
    let interp = Interpreter::new();
    match interp.parse("err.brs", source) {
        Err(BriskError::Syntax(errors)) => errors,
        other => panic!("expected syntax errors, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Runtime Errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_divide_by_zero_report() {
    let err = runtime_error("sub main()\n    x = 1 / 0\nend sub\n");
    assert_eq!(err.detail, RuntimeErrorDetail::DivideByZero);
    assert_eq!(err.code, 20);
    assert_eq!(err.message, "Divide by Zero.");
    let location = err.location.clone().unwrap();
    assert_eq!((&*location.file, location.line), ("err.brs", 2));
    assert!(err.to_string().starts_with("Divide by Zero. (runtime error &h14) in err.brs(2,"));
}

#[test]
fn test_innermost_statement_location_wins() {
    let src = "function inner()\n    return invalid.x\nend function\n\nsub main()\n    y = inner()\nend sub\n";
    let err = runtime_error(src);
    assert_eq!(err.detail, RuntimeErrorDetail::DotOnNonObject);
    assert_eq!(err.location.map(|l| l.line), Some(2));
}

#[test]
fn test_codes_match_the_catalogue() {
    let cases = [
        (RuntimeErrorDetail::BadSyntax, 0x02),
        (RuntimeErrorDetail::IndexOutOfBounds, 0x10),
        (RuntimeErrorDetail::UserDefined, 0x28),
        (RuntimeErrorDetail::UnterminatedString, 0xB3),
        (RuntimeErrorDetail::EndOfFile, 0xB7),
        (RuntimeErrorDetail::NotAFunction, 0xE0),
        (RuntimeErrorDetail::UninitializedVariable, 0xE9),
        (RuntimeErrorDetail::DotOnNonObject, 0xEC),
        (RuntimeErrorDetail::MemberFunctionNotFound, 0xF4),
        (RuntimeErrorDetail::RoWrongNumberOfParams, 0xF5),
    ];
    for (detail, code) in cases {
        assert_eq!(detail.code(), code, "{detail:?}");
        assert_eq!(RuntimeErrorDetail::from_code(code), Some(detail));
    }
}

#[test]
fn test_exit_outside_loop() {
    let err = runtime_error("sub main()\n    exit for\nend sub\n");
    assert_eq!(err.detail, RuntimeErrorDetail::ExitForWithoutFor);
    let err = runtime_error("sub main()\n    continue while\nend sub\n");
    assert_eq!(err.detail, RuntimeErrorDetail::ContinueWhileWithoutWhile);
}

#[test]
fn test_redefined_function_in_one_program() {
    let src = "sub twice()\nend sub\n\nsub twice()\nend sub\n";
    let err = runtime_error(src);
    assert_eq!(err.detail, RuntimeErrorDetail::DuplicateSub);
    assert_eq!(err.location.map(|l| l.line), Some(4));
}

#[test]
fn test_caught_error_object() {
    let src = r#"
sub main()
    try
        x = [1, 2]
        x.nope()
    catch e
        print e.number; " "; e.message; " "; e.rethrown
    end try
end sub
"#;
    let sink = CaptureSink::new();
    let mut interp = Interpreter::new().with_output(sink.clone());
    interp.run_source("err.brs", src).unwrap();
    assert!(sink.printed().starts_with(" 244 "));
    assert!(sink.printed().ends_with(" false\n"));
}

#[test]
fn test_throw_with_custom_number() {
    let src = r#"
sub main()
    throw { number: 500, message: "custom" }
end sub
"#;
    let err = runtime_error(src);
    assert_eq!(err.detail, RuntimeErrorDetail::UserDefined);
    assert_eq!(err.code, 500);
    assert_eq!(err.message, "custom");
}

#[test]
fn test_interrupted_context_stops_before_first_statement() {
    let ctx = EvalContext::new();
    ctx.interrupt();
    let mut interp = Interpreter::new().with_output(CaptureSink::new()).with_context(ctx);
    let program = interp.parse("err.brs", "print 1").unwrap();
    assert!(matches!(interp.run(&program), Err(EvalError::Interrupted)));
}

// ═══════════════════════════════════════════════════════════════════════
// Syntax Errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_syntax_errors_are_batched() {
    let errors = syntax_errors("x = = 1\ny = 2\nz = )\nw = 3\n");
    assert_eq!(errors.len(), 2);
    let lines: Vec<u32> = errors.iter().map(|e| e.location.line).collect();
    assert_eq!(lines, vec![1, 3]);
    assert!(errors.iter().all(|e| &*e.location.file == "err.brs"));
}

#[test]
fn test_unterminated_string() {
    let errors = syntax_errors("s = \"open\n");
    assert_eq!(errors[0].detail, RuntimeErrorDetail::UnterminatedString);
    assert_eq!(errors[0].detail.code(), 179);
}

#[test]
fn test_unterminated_block() {
    let errors = syntax_errors("sub main()\n    if true then\n        print 1\nend sub\n");
    assert!(!errors.is_empty());
}

#[test]
fn test_syntax_error_prevents_execution() {
    let sink = CaptureSink::new();
    let mut interp = Interpreter::new().with_output(sink.clone());
    let result = interp.run_source("err.brs", "print \"before\"\nx = = 1\n");
    assert!(matches!(result, Err(BriskError::Syntax(_))));
    assert_eq!(sink.printed(), "");
}

#[test]
fn test_syntax_error_display() {
    let errors = syntax_errors("x = = 1\n");
    assert!(errors[0].to_string().starts_with("err.brs(1,"));
    let summary = BriskError::Syntax(errors).to_string();
    assert!(summary.starts_with("1 syntax error(s), first at err.brs(1,"));
}

#[test]
fn test_preprocessor_error_directive() {
    let mut defines = HashMap::new();
    defines.insert("debug".to_string(), true);
    let result = parse_source("err.brs", "#if debug\n#error debug builds are not shipped\n#end if\n", &defines);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("debug builds are not shipped"));
}
