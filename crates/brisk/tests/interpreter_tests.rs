//! End-to-end tests for the interpreter: functions, scoping, operators
//! and the built-in globals

use brisk::*;
use pretty_assertions::assert_eq;

fn run(source: &str) -> (Result<Value, BriskError>, CaptureSink) {
    let sink = CaptureSink::new();
    let mut interp = Interpreter::new().with_output(sink.clone());
    (interp.run_source("test.brs", source), sink)
}

/// Run `source` and return what it printed. Panics on any error.
fn output(source: &str) -> String {
    let (result, sink) = run(source);
    if let Err(err) = result {
        panic!("program failed: {err}\noutput so far: {:?}", sink.printed());
    }
    sink.printed()
}

fn runtime_error(source: &str) -> RuntimeError {
    match run(source).0 {
        Err(BriskError::Runtime(err)) => err,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_recursion() {
    let src = r#"
function fact(n as integer) as integer
    if n <= 1 then return 1
    return n * fact(n - 1)
end function

sub main()
    print fact(10)
end sub
"#;
    assert_eq!(output(src), " 3628800\n");
}

#[test]
fn test_functions_are_callable_before_their_declaration() {
    let src = r#"
sub main()
    print greet("Ada")
end sub

function greet(name as string) as string
    return "Hello, " + name
end function
"#;
    assert_eq!(output(src), "Hello, Ada\n");
}

#[test]
fn test_callee_cannot_see_caller_locals() {
    let src = r#"
sub main()
    secret = 5
    peek()
end sub

sub peek()
    print secret
end sub
"#;
    let err = runtime_error(src);
    assert_eq!(err.detail, RuntimeErrorDetail::UninitializedVariable);
    assert_eq!(err.location.map(|l| l.line), Some(8));
}

#[test]
fn test_default_arguments() {
    let src = r#"
function add(a as integer, b = 2 as integer) as integer
    return a + b
end function

sub main()
    print add(1); add(1, 5)
end sub
"#;
    assert_eq!(output(src), " 3 6\n");
}

#[test]
fn test_default_may_use_earlier_parameter() {
    let src = r#"
function greet(name, greeting = "Hi " + name)
    return greeting
end function

sub main()
    print greet("Bo")
    print greet("Bo", "Yo")
end sub
"#;
    assert_eq!(output(src), "Hi Bo\nYo\n");
}

#[test]
fn test_too_few_and_too_many_arguments() {
    let decl = "function add(a as integer, b = 2 as integer) as integer\n    return a + b\nend function\n";

    let err = runtime_error(&format!("{decl}sub main()\n    add()\nend sub\n"));
    assert_eq!(err.detail, RuntimeErrorDetail::WrongNumberOfParams);
    assert!(err.is_type_error());

    let err = runtime_error(&format!("{decl}sub main()\n    add(1, 2, 3)\nend sub\n"));
    assert_eq!(err.detail, RuntimeErrorDetail::WrongNumberOfParams);
}

#[test]
fn test_argument_type_is_checked() {
    let src = r#"
function twice(n as integer) as integer
    return n * 2
end function

sub main()
    print twice("x")
end sub
"#;
    let err = runtime_error(src);
    assert_eq!(err.detail, RuntimeErrorDetail::TypeMismatch);
}

#[test]
fn test_numeric_arguments_convert_to_declared_kind() {
    let src = r#"
function half(n as float) as float
    return n / 2
end function

sub main()
    print half(5)
    print Type(half(5))
end sub
"#;
    assert_eq!(output(src), " 2.5\nFloat\n");
}

#[test]
fn test_sub_returns_invalid() {
    let src = r#"
sub nothing()
end sub

sub main()
    print nothing()
end sub
"#;
    assert_eq!(output(src), "invalid\n");
}

#[test]
fn test_anonymous_function() {
    let src = r#"
sub main()
    double = function(x)
        return x * 2
    end function
    print double(21)
end sub
"#;
    assert_eq!(output(src), " 42\n");
}

#[test]
fn test_method_call_binds_m_to_receiver() {
    let src = r#"
function bump(n)
    m.total = m.total + n
    return m.total
end function

sub main()
    counter = { total: 10, bump: bump }
    counter.bump(5)
    print counter.bump(1)
    print m.total
end sub
"#;
    assert_eq!(output(src), " 16\ninvalid\n");
}

#[test]
fn test_plain_call_sees_global_m() {
    let src = r#"
sub remember()
    m.seen = true
end sub

sub main()
    remember()
    print m.seen
    print GetGlobalAA().seen
end sub
"#;
    assert_eq!(output(src), "true\ntrue\n");
}

#[test]
fn test_entry_point_return_value() {
    let (result, _) = run("function main()\n    return 7\nend function\n");
    assert_eq!(result.unwrap(), Value::Int32(7));
}

#[test]
fn test_stack_overflow_is_a_runtime_error() {
    let src = r#"
function dive(n)
    return dive(n + 1)
end function

sub main()
    dive(0)
end sub
"#;
    let config = EngineConfig::default().with_max_call_depth(64);
    let mut interp = Interpreter::from_config(&config).with_output(CaptureSink::new());
    match interp.run_source("deep.brs", src) {
        Err(BriskError::Runtime(err)) => assert_eq!(err.detail, RuntimeErrorDetail::StackOverflow),
        other => panic!("expected stack overflow, got {other:?}"),
    }

    // Frames unwound: the interpreter is usable afterwards
    interp.eval_source("after.brs", "x = 1 + 1").unwrap();
    assert_eq!(interp.env().get("x"), Some(&Value::Int32(2)));
}

// ═══════════════════════════════════════════════════════════════════════
// Operators
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_string_plus_number_is_type_mismatch() {
    let err = runtime_error("sub main()\n    x = \"a\" + 1\nend sub\n");
    assert_eq!(err.detail, RuntimeErrorDetail::TypeMismatch);
    assert_eq!(err.code, 24);
    assert_eq!(err.location.map(|l| l.line), Some(2));
}

#[test]
fn test_numeric_promotion() {
    let src = r#"
sub main()
    print 5 / 2
    print 7 \ 2
    print Type(1 + 2)
    print Type(1 + 2.5)
    print Type(1 + 2.5#)
    print 2 ^ 10
    print 7 mod 3
end sub
"#;
    assert_eq!(output(src), " 2.5\n 3\nInteger\nFloat\nDouble\n 1024\n 1\n");
}

#[test]
fn test_logical_operators_short_circuit() {
    let src = r#"
function boom() as boolean
    print "evaluated"
    return true
end function

sub main()
    print false and boom()
    print true or boom()
end sub
"#;
    assert_eq!(output(src), "false\ntrue\n");
}

#[test]
fn test_string_comparison_and_concatenation() {
    let src = r#"
sub main()
    s = "ab"
    s += "cd"
    print s; " "; s = "abcd"; " "; "apple" < "banana"
end sub
"#;
    assert_eq!(output(src), "abcd true true\n");
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Globals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_string_builtins() {
    let src = r#"
sub main()
    print Str(5)
    print Len("hello")
    print UCase("abc"); LCase("DEF")
    print Left("hello", 2); Right("hello", 2); Mid("hello", 2, 3)
    print Instr(1, "hello", "l")
end sub
"#;
    assert_eq!(output(src), " 5\n 5\nABCdef\nheloell\n 3\n");
}

#[test]
fn test_numeric_builtins() {
    let src = r#"
sub main()
    print Val("12.5xyz")
    print Val("ff", 16)
    print Int(-2.5)
    print Abs(-3)
    print StrI(255, 16)
end sub
"#;
    assert_eq!(output(src), " 12.5\n 255\n-3\n 3\nff\n");
}

#[test]
fn test_type_names() {
    let src = r#"
sub main()
    print Type(1); " "; Type("s"); " "; Type(true); " "; Type(invalid)
    print Type({}); " "; Type([])
end sub
"#;
    assert_eq!(output(src), "Integer String Boolean Invalid\nroAssociativeArray roArray\n");
}

#[test]
fn test_json_round_trip() {
    let src = r#"
sub main()
    data = ParseJson("{""n"": 3, ""list"": [1, 2], ""name"": ""x""}")
    print data.n
    print data.list.count()
    print data.name
    print FormatJson({b: [true, "x"], a: 1})
end sub
"#;
    assert_eq!(output(src), " 3\n 2\nx\n{\"a\":1,\"b\":[true,\"x\"]}\n");
}

#[test]
fn test_parse_json_failure_is_invalid() {
    assert_eq!(output("sub main()\n    print ParseJson(\"{nope\")\nend sub\n"), "invalid\n");
}

#[test]
fn test_create_object() {
    let src = r#"
sub main()
    list = CreateObject("roArray")
    list.push(1)
    list.push("two")
    print list.count(); " "; list.join(",")
    aa = CreateObject("roAssociativeArray")
    aa.Key = 1
    print aa.doesExist("KEY")
    print Type(CreateObject("roNothing"))
end sub
"#;
    assert_eq!(output(src), " 2 1,two\ntrue\nInvalid\n");
}

#[test]
fn test_unknown_class_warns_in_dev_mode() {
    let sink = CaptureSink::new();
    let mut interp = Interpreter::new().with_output(sink.clone()).with_dev_mode(true);
    interp.eval_source("test.brs", "x = CreateObject(\"roNothing\")").unwrap();
    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("roNothing"));
}

#[test]
fn test_undefined_function() {
    let err = runtime_error("sub main()\n    nothingHere()\nend sub\n");
    assert_eq!(err.detail, RuntimeErrorDetail::FunctionNotFound);
}

#[test]
fn test_calling_a_non_function() {
    let err = runtime_error("sub main()\n    x = 5\n    x()\nend sub\n");
    assert_eq!(err.detail, RuntimeErrorDetail::NotAFunction);
}
