use std::rc::Rc;

use geoscript::{
    console::{Console, Level, MemorySink, SinkError},
    executor::{Bindings, ExecutableUnit, Executor},
    value::{Value, ValueKind},
};
use indexmap::IndexMap;

fn executor() -> Executor {
    Executor::new(MemorySink::new())
}

fn feature(name: &str) -> Value {
    let mut properties = IndexMap::new();
    properties.insert("name".into(), Value::string(name));
    let mut entries = IndexMap::new();
    entries.insert("type".into(), Value::string("Feature"));
    entries.insert("properties".into(), Value::map(properties));
    Value::map(entries)
}

fn sample_bindings() -> Bindings {
    [
        ("layer1", feature("Etna")),
        ("count", Value::int(2)),
        ("label", Value::string("volcano")),
    ]
    .into_iter()
    .collect()
}

#[test]
fn returning_a_bound_name_yields_the_same_value() {
    let bindings = sample_bindings();
    for name in bindings.names() {
        let result = executor()
            .execute(&format!("return {name}"), &bindings)
            .expect("execute");
        let bound = bindings.get(&name).expect("bound value");
        assert!(Value::same(&result, &bound), "{name} was copied");
    }
}

#[test]
fn empty_source_yields_absent_result() {
    let result = executor()
        .execute("", &sample_bindings())
        .expect("empty source runs");
    assert!(result.is_unit());

    let result = executor().execute("", &Bindings::new()).expect("no bindings");
    assert!(result.is_unit());
}

#[test]
fn empty_bindings_still_evaluate() {
    let result = executor()
        .execute("return 1+1", &Bindings::new())
        .expect("execute");
    assert!(matches!(result.0.as_ref(), ValueKind::Int(2)));
}

#[test]
fn falling_off_the_end_is_absent() {
    let result = executor()
        .execute("var x = count + 1\nx", &sample_bindings())
        .expect("execute");
    assert!(result.is_unit());
}

#[test]
fn syntax_error_is_a_compile_failure_with_a_message() {
    let bindings = sample_bindings();
    let before = bindings.as_value().to_string();

    let err = executor()
        .execute("return (1 +", &bindings)
        .expect_err("should not compile");
    assert!(err.is_compile());
    assert!(!err.message().is_empty());
    assert!(err.stack_trace().contains("at <script>"), "{}", err.stack_trace());
    assert_eq!(bindings.as_value().to_string(), before);
}

#[test]
fn runtime_failure_is_distinguishable_from_compile_failure() {
    let err = executor()
        .execute("return missing + 1", &Bindings::new())
        .expect_err("should fail");
    assert!(!err.is_compile());
    assert!(err.message().contains("undefined variable `missing`"));
}

#[test]
fn runtime_trace_lists_frames_down_to_the_script() {
    let source = "fn check(f) {\n  return f.properties.height\n}\nreturn check(layer1)";
    let err = executor()
        .execute(source, &sample_bindings())
        .expect_err("should fail");
    let trace = err.stack_trace();
    let lines: Vec<&str> = trace.lines().collect();
    assert!(lines[0].contains("missing field `height`"), "{trace}");
    assert!(lines[0].ends_with("(2:10)"), "{trace}");
    assert_eq!(lines[1], "    at check (2:10)");
    assert_eq!(lines[2], "    at <script> (4:8)");
}

#[test]
fn runaway_recursion_is_a_runtime_failure() {
    let err = executor()
        .execute("fn f() { return f() }\nreturn f()", &Bindings::new())
        .expect_err("recursion is capped");
    assert!(!err.is_compile());
    assert!(err.message().contains("maximum call depth"), "{}", err.message());
}

#[test]
fn bounded_recursion_still_runs() {
    let source = "fn depth(n) {\n  if n == 0 { return 0 }\n  return depth(n - 1) + 1\n}\nreturn depth(10)";
    let result = executor().execute(source, &Bindings::new()).expect("execute");
    assert!(matches!(result.0.as_ref(), ValueKind::Int(10)));
}

#[test]
fn self_referencing_maps_compare_without_overflow() {
    let source = "var a = {}\na.me = a\nvar b = {}\nb.me = b\nreturn [a == b, a == a]";
    let result = executor().execute(source, &Bindings::new()).expect("execute");
    let flags: Vec<bool> = result
        .array_snapshot()
        .expect("array")
        .iter()
        .map(|flag| flag.is_truthy())
        .collect();
    assert_eq!(flags, [false, true]);
}

#[test]
fn negating_the_smallest_int_does_not_overflow() {
    let source = "var m = -9223372036854775807 - 1\nreturn [-m, std.math.abs(m)]";
    let result = executor().execute(source, &Bindings::new()).expect("execute");
    for item in result.array_snapshot().expect("array") {
        match item.0.as_ref() {
            ValueKind::Float(f) => assert_eq!(*f, 9_223_372_036_854_775_808.0),
            _ => panic!("expected Float, found {}", item.type_name()),
        }
    }
}

#[test]
fn mutation_of_a_bound_value_is_visible_to_the_caller() {
    let bindings = sample_bindings();
    executor()
        .execute(
            "layer1.properties.style = { fillColor: \"#53d453\" }",
            &bindings,
        )
        .expect("execute");

    let layer = bindings.get("layer1").expect("layer1");
    let properties = layer.get_field("properties").expect("properties");
    let style = properties.get_field("style").expect("style was added");
    assert_eq!(
        style.get_field("fillColor").and_then(|c| c.as_str().map(String::from)),
        Some("#53d453".to_string())
    );
}

#[test]
fn this_is_the_bindings_object() {
    let bindings = sample_bindings();
    let result = executor()
        .execute("this.extra = label\nreturn this", &bindings)
        .expect("execute");
    assert!(Value::same(&result, &bindings.as_value()));
    assert!(bindings.get("extra").is_some());
}

#[test]
fn lambdas_keep_the_receiver_of_the_script() {
    let result = executor()
        .execute(
            "const read = || this.count\nreturn read()",
            &sample_bindings(),
        )
        .expect("execute");
    assert!(matches!(result.0.as_ref(), ValueKind::Int(2)));
}

#[test]
fn scripts_run_in_strict_mode() {
    let err = executor()
        .execute("leaked = 1", &Bindings::new())
        .expect_err("implicit globals are rejected");
    assert!(err.message().contains("undeclared"), "{}", err.message());

    let err = executor()
        .execute("return label + count", &sample_bindings())
        .expect_err("no silent coercion");
    assert!(err.message().contains("cannot add"), "{}", err.message());
}

#[test]
fn nothing_leaks_between_runs() {
    let executor = executor();
    executor
        .execute("var remembered = 1\nreturn remembered", &Bindings::new())
        .expect("first run");
    let err = executor
        .execute("return remembered", &Bindings::new())
        .expect_err("fresh scope per run");
    assert!(err.message().contains("remembered"));
}

#[test]
fn invalid_binding_names_fail_to_compile() {
    for name in ["1st", "with space", "return", ""] {
        let bindings: Bindings = [(name, Value::int(1))].into_iter().collect();
        let err = executor()
            .execute("return 1", &bindings)
            .expect_err("invalid name");
        assert!(err.is_compile(), "{name}");
    }
}

#[test]
fn compiled_unit_parameters_follow_binding_order() {
    let bindings = sample_bindings();
    let unit = ExecutableUnit::compile("return count", bindings.names()).expect("compile");
    assert_eq!(unit.params(), ["layer1", "count", "label"]);
    assert!(unit.is_strict());
}

#[test]
fn script_console_output_goes_through_the_interceptor() {
    let original = MemorySink::new();
    let console = Console::intercept(Rc::clone(&original));
    let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    console.subscribe(move |level, payload| {
        sink.borrow_mut().push(format!("{level} {}", payload.len()));
    });

    let executor = Executor::new(console.clone());
    executor
        .execute("console.info(\"found\", count)", &sample_bindings())
        .expect("execute");

    assert_eq!(original.events(), [(Level::Info, "found 2".to_string())]);
    assert_eq!(*seen.borrow(), ["INFO 2"]);
}

#[test]
fn failing_observer_fails_the_script() {
    let console = Console::intercept(MemorySink::new());
    console.register_observer(|_: &str, _: &[Value]| -> Result<(), SinkError> {
        Err(SinkError::Observer("panel closed".into()))
    });
    let err = Executor::new(console)
        .execute("console.log(1)\nreturn 2", &Bindings::new())
        .expect_err("observer failure propagates");
    assert!(err.message().contains("panel closed"), "{}", err.message());
}
