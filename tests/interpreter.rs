use std::rc::Rc;

use geoscript::{
    console::{Level, MemorySink},
    diagnostics::ScriptError,
    runtime::Interpreter,
    value::{Value, ValueKind},
};
use indexmap::IndexMap;

fn eval(source: &str) -> Value {
    let mut interpreter = Interpreter::with_sink(MemorySink::new());
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> ScriptError {
    let mut interpreter = Interpreter::with_sink(MemorySink::new());
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn expect_int(value: &Value) -> i64 {
    match value.0.as_ref() {
        ValueKind::Int(n) => *n,
        _ => panic!("expected Int, found {}", value.type_name()),
    }
}

fn expect_map(value: &Value) -> IndexMap<String, Value> {
    match value.0.as_ref() {
        ValueKind::Map(map) => map.borrow().clone(),
        _ => panic!("expected Map, found {}", value.type_name()),
    }
}

fn expect_array(value: &Value) -> Vec<Value> {
    value
        .array_snapshot()
        .unwrap_or_else(|| panic!("expected Array, found {}", value.type_name()))
}

fn expect_bool(value: &Value) -> bool {
    match value.0.as_ref() {
        ValueKind::Bool(b) => *b,
        _ => panic!("expected Bool, found {}", value.type_name()),
    }
}

fn expect_str(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected String, found {}", value.type_name()))
        .to_string()
}

fn ints(value: &Value) -> Vec<i64> {
    expect_array(value).iter().map(expect_int).collect()
}

#[test]
fn evaluates_basic_arithmetic() {
    let value = eval("return 2 + 2;");
    assert_eq!(expect_int(&value), 4);
}

#[test]
fn matches_when_pattern() {
    let value = eval(
        r#"
        var value = 2
        when value {
            1 -> { return 1; }
            2 -> { return 42; }
            else -> { return 0; }
        }
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn returns_last_expression_from_script() {
    let value = eval(
        r#"
        var x = 40
        x + 2
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn break_carries_value_out_of_loop() {
    let value = eval(
        r#"
        loop {
            break 7
        }
        "#,
    );
    assert_eq!(expect_int(&value), 7);
}

#[test]
fn for_loop_accumulates_sum() {
    let value = eval(
        r#"
        var mut sum = 0
        for item in [1, 2, 3, 4] {
            sum = sum + item
        }
        sum
        "#,
    );
    assert_eq!(expect_int(&value), 10);
}

#[test]
fn map_field_assignment_updates_value() {
    let value = eval(
        r#"
        var inventory = {
            "apples": 3,
            bananas: 7
        }
        inventory.bananas = inventory.bananas + 5
        inventory
        "#,
    );
    let map = expect_map(&value);
    assert_eq!(map.len(), 2);
    assert_eq!(expect_int(&map["apples"]), 3);
    assert_eq!(expect_int(&map["bananas"]), 12);
}

#[test]
fn array_element_assignment_updates_value() {
    let value = eval(
        r#"
        var numbers = [1, 2, 3]
        numbers[1] = numbers[1] + 5
        numbers
        "#,
    );
    assert_eq!(ints(&value), [1, 7, 3]);
}

#[test]
fn recursive_function_evaluates() {
    let value = eval(
        r#"
        fn fib(n) {
            if n <= 1 {
                return n
            }
            return fib(n - 1) + fib(n - 2)
        }

        fib(6)
        "#,
    );
    assert_eq!(expect_int(&value), 8);
}

#[test]
fn const_assignment_is_rejected() {
    let err = eval_error(
        r#"
        const answer = 42
        answer = 13
        "#,
    );
    let message = format!("{err}");
    assert!(
        message.contains("cannot assign to immutable binding"),
        "{message}"
    );
}

#[test]
fn logical_operators_short_circuit_and_yield_operands() {
    assert!(!expect_bool(&eval("false && fail(\"evaluated\")")));
    assert_eq!(expect_int(&eval("0 || 5")), 5);
    assert_eq!(expect_str(&eval("\"left\" || fail(\"evaluated\")")), "left");
    assert!(expect_array(&eval("[] && 1")).is_empty());
}

#[test]
fn strings_concatenate_and_compare() {
    assert_eq!(expect_str(&eval("'geo' + \"script\"")), "geoscript");
    assert!(expect_bool(&eval("\"2024-01-02\" > \"2024-01-01\"")));
}

#[test]
fn sloppy_code_coerces_and_defines_globals() {
    let value = eval(
        r#"
        fn leak() {
            counter = 3
        }
        leak()
        "count: " + counter
        "#,
    );
    assert_eq!(expect_str(&value), "count: 3");
}

#[test]
fn strict_directive_rejects_undeclared_assignment() {
    let err = eval_error(
        r#"
        "use strict"
        counter = 3
        "#,
    );
    assert!(
        err.to_string().contains("assignment to undeclared variable `counter`"),
        "{err}"
    );
}

#[test]
fn strict_directive_rejects_mixed_addition() {
    let err = eval_error("\"use strict\";\nreturn \"n = \" + 1");
    assert!(err.to_string().contains("cannot add String and Int"), "{err}");
}

#[test]
fn lambdas_capture_their_scope() {
    let value = eval(
        r#"
        var offset = 10
        const add = |n| n + offset
        offset = 20
        add(1)
        "#,
    );
    assert_eq!(expect_int(&value), 21);
}

#[test]
fn missing_arguments_are_none() {
    let value = eval(
        r#"
        fn describe(a, b) {
            return type_of(b)
        }
        describe(1)
        "#,
    );
    assert_eq!(expect_str(&value), "Unit");
}

#[test]
fn functions_mutate_shared_arrays_in_place() {
    let value = eval(
        r#"
        var items = [1]
        fn grow(list) {
            std.collections.push(list, 2)
            list[0] = 0
        }
        grow(items)
        items
        "#,
    );
    assert_eq!(ints(&value), [0, 2]);
}

#[test]
fn this_is_none_outside_a_receiver() {
    assert!(eval("fn me() { return this }\nme()").is_unit());
}

#[test]
fn runtime_errors_record_call_frames() {
    let err = eval_error(
        r#"
        fn inner() {
            return missing
        }
        fn outer() {
            return inner()
        }
        outer()
        "#,
    );
    let diagnostic = err.into_diagnostic();
    let frames: Vec<&str> = diagnostic
        .stack
        .iter()
        .map(|frame| frame.function.as_str())
        .collect();
    assert_eq!(frames, ["inner", "outer"]);
    assert!(diagnostic.message.contains("undefined variable `missing`"));
}

#[test]
fn interpreter_recovers_after_a_failed_statement() {
    let mut interpreter = Interpreter::with_sink(MemorySink::new());
    interpreter.eval_source("var kept = 1").expect("declare");
    assert!(interpreter.eval_source("fn f() { return nope }\nf()").is_err());
    let value = interpreter.eval_source("kept + 1").expect("still usable");
    assert_eq!(expect_int(&value), 2);
}

#[test]
fn console_calls_reach_the_injected_sink() {
    let sink = MemorySink::new();
    let mut interpreter = Interpreter::with_sink(Rc::clone(&sink) as Rc<dyn geoscript::LogSink>);
    interpreter
        .eval_source("console.log(\"count\", 3)\nconsole.warn([1, 2])")
        .expect("logging");
    assert_eq!(
        sink.events(),
        [
            (Level::Log, "count 3".to_string()),
            (Level::Warn, "[1, 2]".to_string())
        ]
    );
}

#[test]
fn std_length_helpers() {
    assert_eq!(expect_int(&eval("std.string.len(\"hello\")")), 5);
    assert_eq!(expect_int(&eval("std.collections.len([1, 2, 3])")), 3);
    assert_eq!(expect_int(&eval("len({ a: 1, b: 2 })")), 2);
}

#[test]
fn std_math_helpers() {
    assert_eq!(expect_int(&eval("std.math.abs(-42)")), 42);

    let sqrt_val = eval("std.math.sqrt(49)");
    match sqrt_val.0.as_ref() {
        ValueKind::Float(f) => assert!((*f - 7.0).abs() < 1e-6),
        _ => panic!("expected Float, found {}", sqrt_val.type_name()),
    }

    assert_eq!(expect_int(&eval("std.math.min(3, 9)")), 3);
    assert_eq!(expect_int(&eval("std.math.max(3, 9)")), 9);
}

#[test]
fn std_math_pow_round() {
    let rounded = eval("std.math.round(3.6)");
    match rounded.0.as_ref() {
        ValueKind::Float(f) => assert_eq!(*f, 4.0),
        _ => panic!("expected Float, found {}", rounded.type_name()),
    }

    let pow = eval("std.math.pow(2, 8)");
    match pow.0.as_ref() {
        ValueKind::Float(f) => assert_eq!(*f, 256.0),
        _ => panic!("expected Float, found {}", pow.type_name()),
    }
}

#[test]
fn std_collections_mutate_in_place() {
    let value = eval(
        r#"
        var list = [2, 3]
        std.collections.push(list, 4)
        std.collections.unshift(list, 1)
        const last = std.collections.pop(list)
        std.collections.insert(list, 0, last)
        list
        "#,
    );
    assert_eq!(ints(&value), [4, 1, 2, 3]);

    let inserted = eval(
        r#"
        var map = { a: 1 }
        std.collections.insert(map, "b", 2)
        std.collections.remove(map, "a")
        map
        "#,
    );
    let map = expect_map(&inserted);
    assert_eq!(map.keys().collect::<Vec<_>>(), ["b"]);
}

#[test]
fn std_collections_lookups() {
    assert_eq!(expect_int(&eval("std.collections.get({ a: 1 }, \"b\", 9)")), 9);
    assert!(eval("std.collections.get({ a: 1 }, \"b\")").is_unit());
    assert!(expect_bool(&eval("std.collections.has({ a: 1 }, \"a\")")));
    assert!(expect_bool(&eval("std.collections.has([1, 2], 2)")));
    assert_eq!(
        expect_array(&eval("std.collections.keys({ x: 1, y: 2 })")).len(),
        2
    );
    assert_eq!(ints(&eval("std.collections.slice([1, 2, 3, 4], 1, -1)")), [2, 3]);
    assert_eq!(ints(&eval("std.collections.concat([1], [2, 3])")), [1, 2, 3]);
}

#[test]
fn std_collections_range_and_pop() {
    assert_eq!(ints(&eval("std.collections.range(0, 5)")), [0, 1, 2, 3, 4]);
    assert_eq!(ints(&eval("std.collections.range_step(5, 0, -2)")), [5, 3, 1]);
    assert_eq!(expect_int(&eval("std.collections.pop([1, 2, 3])")), 3);
    assert!(eval("std.collections.pop([])").is_unit());
}

#[test]
fn std_collections_higher_order_helpers() {
    let value = eval(
        r#"
        const numbers = std.collections.range(1, 6)
        const evens = std.collections.filter(numbers, |n| n % 2 == 0)
        const doubled = std.collections.map(evens, |n| n * 2)
        std.collections.reduce(doubled, |acc, n| acc + n, 0)
        "#,
    );
    assert_eq!(expect_int(&value), 12);

    let found = eval("std.collections.find([1, 5, 8], |n, i| n > 4)");
    assert_eq!(expect_int(&found), 5);
}

#[test]
fn sort_by_is_stable_and_in_place() {
    let value = eval(
        r#"
        var events = [
            { id: "b", day: 2 },
            { id: "a", day: 1 },
            { id: "c", day: 2 }
        ]
        std.collections.sort_by(events, |x, y| x.day - y.day)
        std.collections.map(events, |e| e.id)
        "#,
    );
    let ids: Vec<String> = expect_array(&value).iter().map(expect_str).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn failing_comparator_leaves_array_untouched() {
    let mut interpreter = Interpreter::with_sink(MemorySink::new());
    interpreter.eval_source("var list = [3, 1, 2]").expect("declare");
    assert!(interpreter
        .eval_source("std.collections.sort_by(list, |a, b| fail(\"no\"))")
        .is_err());
    let list = interpreter.eval_source("list").expect("read back");
    assert_eq!(ints(&list), [3, 1, 2]);
}

#[test]
fn std_string_utilities() {
    assert_eq!(
        expect_str(&eval("std.string.replace(\"hello world\", \"world\", \"map\")")),
        "hello map"
    );
    assert!(expect_bool(&eval("std.string.starts_with(\"geoscript\", \"geo\")")));
    assert!(expect_bool(&eval("std.string.ends_with(\"geoscript\", \"script\")")));
    assert!(expect_bool(&eval("std.string.contains(\"geoscript\", \"oscr\")")));
    assert_eq!(
        expect_str(&eval("std.string.join([\"a\", 1, \"c\"], \"-\")")),
        "a-1-c"
    );
    assert_eq!(expect_str(&eval("std.string.to_lower(\"EONET\")")), "eonet");
    assert_eq!(expect_str(&eval("std.string.from(12)")), "12");
}

#[test]
fn std_json_round_trips_through_text() {
    let value = eval(
        r#"
        const text = std.json.stringify({ type: "Point", coordinates: [1, 2] })
        const parsed = std.json.parse(text)
        parsed.coordinates[1]
        "#,
    );
    assert_eq!(expect_int(&value), 2);

    let text = eval("std.json.stringify([1, none])");
    assert_eq!(expect_str(&text), "[1,null]");

    let err = eval_error("std.json.stringify({ f: len })");
    assert!(err.to_string().contains("Function"), "{err}");
}
