use indexmap::IndexMap;

use crate::{
    console::{Level, LogSink},
    diagnostics::{Diagnostic, Result, ScriptError},
    environment::EnvironmentRef,
    geojson,
    runtime::{values_equal, Interpreter},
    value::{NativeCallback, NativeFunction, Value, ValueKind},
};

pub fn install(env: &EnvironmentRef) {
    let len_fn = native("len", 1, collections_len);

    let mut console = IndexMap::new();
    console.insert("log".into(), native("log", usize::MAX, console_log));
    console.insert("info".into(), native("info", usize::MAX, console_info));
    console.insert("warn".into(), native("warn", usize::MAX, console_warn));
    console.insert("error".into(), native("error", usize::MAX, console_error));

    let mut string = IndexMap::new();
    string.insert("len".into(), len_fn.clone());
    string.insert("is_empty".into(), native("is_empty", 1, string_is_empty));
    string.insert("to_upper".into(), native("to_upper", 1, string_to_upper));
    string.insert("to_lower".into(), native("to_lower", 1, string_to_lower));
    string.insert("trim".into(), native("trim", 1, string_trim));
    string.insert("split".into(), native("split", 2, string_split));
    string.insert("replace".into(), native("replace", 3, string_replace));
    string.insert(
        "starts_with".into(),
        native("starts_with", 2, string_starts_with),
    );
    string.insert("ends_with".into(), native("ends_with", 2, string_ends_with));
    string.insert("contains".into(), native("contains", 2, string_contains));
    string.insert("join".into(), native("join", 2, string_join));
    string.insert("from".into(), native("from", 1, string_from));

    let mut collections = IndexMap::new();
    collections.insert("len".into(), len_fn.clone());
    collections.insert("push".into(), native("push", 2, collections_push));
    collections.insert("pop".into(), native("pop", 1, collections_pop));
    collections.insert("unshift".into(), native("unshift", 2, collections_unshift));
    collections.insert("insert".into(), native("insert", 3, collections_insert));
    collections.insert("remove".into(), native("remove", 2, collections_remove));
    collections.insert("get".into(), native("get", usize::MAX, collections_get));
    collections.insert("has".into(), native("has", 2, collections_has));
    collections.insert("keys".into(), native("keys", 1, collections_keys));
    collections.insert("values".into(), native("values", 1, collections_values));
    collections.insert("range".into(), native("range", 2, collections_range));
    collections.insert(
        "range_step".into(),
        native("range_step", 3, collections_range_step),
    );
    collections.insert("concat".into(), native("concat", 2, collections_concat));
    collections.insert("slice".into(), native("slice", 3, collections_slice));
    collections.insert("map".into(), native("map", 2, collections_map));
    collections.insert("filter".into(), native("filter", 2, collections_filter));
    collections.insert("reduce".into(), native("reduce", 3, collections_reduce));
    collections.insert("find".into(), native("find", 2, collections_find));
    collections.insert("sort_by".into(), native("sort_by", 2, collections_sort_by));

    let mut math = IndexMap::new();
    math.insert("abs".into(), native("abs", 1, math_abs));
    math.insert("floor".into(), native("floor", 1, math_floor));
    math.insert("ceil".into(), native("ceil", 1, math_ceil));
    math.insert("sqrt".into(), native("sqrt", 1, math_sqrt));
    math.insert("round".into(), native("round", 1, math_round));
    math.insert("pow".into(), native("pow", 2, math_pow));
    math.insert("min".into(), native("min", 2, math_min));
    math.insert("max".into(), native("max", 2, math_max));

    let mut json = IndexMap::new();
    json.insert("stringify".into(), native("stringify", usize::MAX, json_stringify));
    json.insert("parse".into(), native("parse", 1, json_parse));

    let mut std_exports = IndexMap::new();
    std_exports.insert("string".into(), module("string", string));
    std_exports.insert("collections".into(), module("collections", collections));
    std_exports.insert("math".into(), module("math", math));
    std_exports.insert("json".into(), module("json", json));

    let mut scope = env.borrow_mut();
    scope.define("len".into(), len_fn, false);
    scope.define("type_of".into(), native("type_of", 1, type_of), false);
    scope.define("fail".into(), native("fail", 1, fail), false);
    scope.define(
        "console".into(),
        Value::module(vec!["console".into()], console),
        false,
    );
    scope.define(
        "std".into(),
        Value::module(vec!["std".into()], std_exports),
        false,
    );
}

fn native(name: &'static str, arity: usize, callback: NativeCallback) -> Value {
    Value::new(ValueKind::NativeFunction(NativeFunction {
        name,
        arity,
        callback,
    }))
}

fn module(name: &str, exports: IndexMap<String, Value>) -> Value {
    Value::module(vec!["std".into(), name.into()], exports)
}

fn runtime(message: impl Into<String>) -> ScriptError {
    ScriptError::from(Diagnostic::runtime(message))
}

fn ensure_between(args: &[Value], min: usize, max: usize, name: &str) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(runtime(format!(
            "`{name}` expected {min} to {max} arguments but received {}",
            args.len()
        )));
    }
    Ok(())
}

fn expect_string<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| runtime(format!("`{name}` expected String but found {}", value.type_name())))
}

fn expect_int(value: &Value, name: &str) -> Result<i64> {
    match &*value.0 {
        ValueKind::Int(n) => Ok(*n),
        _ => Err(runtime(format!(
            "`{name}` expected Int but found {}",
            value.type_name()
        ))),
    }
}

fn expect_number(value: &Value, name: &str) -> Result<f64> {
    match &*value.0 {
        ValueKind::Int(n) => Ok(*n as f64),
        ValueKind::Float(f) => Ok(*f),
        _ => Err(runtime(format!(
            "`{name}` expected numeric but found {}",
            value.type_name()
        ))),
    }
}

fn expect_array(value: &Value, name: &str) -> Result<Vec<Value>> {
    value
        .array_snapshot()
        .ok_or_else(|| runtime(format!("`{name}` expected Array but found {}", value.type_name())))
}

fn type_of(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].type_name()))
}

fn fail(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    Err(runtime(args[0].to_string()))
}

fn emit(interpreter: &mut Interpreter, level: Level, args: &[Value]) -> Result<Value> {
    interpreter.sink().write(level, args).map_err(|err| {
        runtime(format!("console.{} failed: {err}", level.method_name()))
    })?;
    Ok(Value::unit())
}

fn console_log(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    emit(interpreter, Level::Log, args)
}

fn console_info(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    emit(interpreter, Level::Info, args)
}

fn console_warn(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    emit(interpreter, Level::Warn, args)
}

fn console_error(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    emit(interpreter, Level::Error, args)
}

fn string_is_empty(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.is_empty")?;
    Ok(Value::bool(text.is_empty()))
}

fn string_to_upper(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.to_upper")?;
    Ok(Value::string(text.to_uppercase()))
}

fn string_to_lower(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.to_lower")?;
    Ok(Value::string(text.to_lowercase()))
}

fn string_trim(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.trim")?;
    Ok(Value::string(text.trim()))
}

fn string_split(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.split")?;
    let separator = expect_string(&args[1], "std.string.split")?;
    if separator.is_empty() {
        return Err(runtime("separator must not be empty"));
    }
    let parts = text.split(separator).map(Value::string).collect();
    Ok(Value::array(parts))
}

fn string_replace(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.replace")?;
    let from = expect_string(&args[1], "std.string.replace")?;
    let to = expect_string(&args[2], "std.string.replace")?;
    Ok(Value::string(text.replace(from, to)))
}

fn string_starts_with(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.starts_with")?;
    let prefix = expect_string(&args[1], "std.string.starts_with")?;
    Ok(Value::bool(text.starts_with(prefix)))
}

fn string_ends_with(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.ends_with")?;
    let suffix = expect_string(&args[1], "std.string.ends_with")?;
    Ok(Value::bool(text.ends_with(suffix)))
}

fn string_contains(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.string.contains")?;
    let needle = expect_string(&args[1], "std.string.contains")?;
    Ok(Value::bool(text.contains(needle)))
}

fn string_join(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let items = expect_array(&args[0], "std.string.join")?;
    let separator = expect_string(&args[1], "std.string.join")?;
    let mut output = String::new();
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            output.push_str(separator);
        }
        output.push_str(&item.to_string());
    }
    Ok(Value::string(output))
}

fn string_from(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].to_string()))
}

fn collections_len(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let len = match &*args[0].0 {
        ValueKind::String(s) => s.chars().count(),
        ValueKind::Array(values) => values.borrow().len(),
        ValueKind::Map(map) => map.borrow().len(),
        _ => return Err(runtime("len expects string, array, or map")),
    };
    Ok(Value::int(len as i64))
}

fn collections_push(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let values = args[0]
        .as_array()
        .ok_or_else(|| runtime("push expects array as first argument"))?;
    let mut values = values.borrow_mut();
    values.push(args[1].clone());
    Ok(Value::int(values.len() as i64))
}

fn collections_pop(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let values = args[0]
        .as_array()
        .ok_or_else(|| runtime("pop expects array"))?;
    let popped = values.borrow_mut().pop();
    Ok(popped.unwrap_or_else(Value::unit))
}

fn collections_unshift(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let values = args[0]
        .as_array()
        .ok_or_else(|| runtime("unshift expects array as first argument"))?;
    let mut values = values.borrow_mut();
    values.insert(0, args[1].clone());
    Ok(Value::int(values.len() as i64))
}

fn collections_insert(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    match &*args[0].0 {
        ValueKind::Map(map) => {
            let key = expect_string(&args[1], "std.collections.insert")?;
            map.borrow_mut().insert(key.to_string(), args[2].clone());
            Ok(args[0].clone())
        }
        ValueKind::Array(values) => {
            let idx = expect_int(&args[1], "std.collections.insert")?;
            let mut values = values.borrow_mut();
            let slot = usize::try_from(idx)
                .ok()
                .filter(|slot| *slot <= values.len())
                .ok_or_else(|| {
                    runtime(format!(
                        "insert index {idx} out of bounds for length {}",
                        values.len()
                    ))
                })?;
            values.insert(slot, args[2].clone());
            drop(values);
            Ok(args[0].clone())
        }
        _ => Err(runtime("insert expects map or array as first argument")),
    }
}

fn collections_remove(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    match &*args[0].0 {
        ValueKind::Map(map) => {
            let key = expect_string(&args[1], "std.collections.remove")?;
            Ok(map.borrow_mut().shift_remove(key).unwrap_or_else(Value::unit))
        }
        ValueKind::Array(values) => {
            let idx = expect_int(&args[1], "std.collections.remove")?;
            let mut values = values.borrow_mut();
            match usize::try_from(idx).ok().filter(|slot| *slot < values.len()) {
                Some(slot) => Ok(values.remove(slot)),
                None => Ok(Value::unit()),
            }
        }
        _ => Err(runtime("remove expects map or array as first argument")),
    }
}

fn collections_get(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    ensure_between(args, 2, 3, "std.collections.get")?;
    let fallback = args.get(2).cloned().unwrap_or_else(Value::unit);
    let found = match (&*args[0].0, &*args[1].0) {
        (ValueKind::Map(map), ValueKind::String(key)) => map.borrow().get(key).cloned(),
        (ValueKind::Array(values), ValueKind::Int(idx)) => usize::try_from(*idx)
            .ok()
            .and_then(|slot| values.borrow().get(slot).cloned()),
        (ValueKind::Unit, _) => None,
        _ => {
            return Err(runtime(format!(
                "get cannot look up {} in {}",
                args[1].type_name(),
                args[0].type_name()
            )));
        }
    };
    Ok(found.unwrap_or(fallback))
}

fn collections_has(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let present = match &*args[0].0 {
        ValueKind::Map(map) => {
            let key = expect_string(&args[1], "std.collections.has")?;
            map.borrow().contains_key(key)
        }
        ValueKind::Array(values) => values
            .borrow()
            .iter()
            .any(|value| values_equal(value, &args[1])),
        _ => return Err(runtime("has expects map or array")),
    };
    Ok(Value::bool(present))
}

fn collections_keys(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    match args[0].as_map() {
        Some(map) => {
            let keys = map.borrow().keys().cloned().map(Value::string).collect();
            Ok(Value::array(keys))
        }
        None => Err(runtime("keys expects map")),
    }
}

fn collections_values(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    match &*args[0].0 {
        ValueKind::Map(map) => Ok(Value::array(map.borrow().values().cloned().collect())),
        ValueKind::Array(values) => Ok(Value::array(values.borrow().clone())),
        _ => Err(runtime("values expects map or array")),
    }
}

fn collections_range(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    range_values(args, None)
}

fn collections_range_step(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    range_values(args, Some(2))
}

fn range_values(args: &[Value], step_idx: Option<usize>) -> Result<Value> {
    let start = expect_int(&args[0], "std.collections.range")?;
    let end = expect_int(&args[1], "std.collections.range")?;
    let step = if let Some(idx) = step_idx {
        let raw = expect_int(&args[idx], "std.collections.range_step")?;
        if raw == 0 {
            return Err(runtime("range step must be non-zero"));
        }
        raw
    } else if start <= end {
        1
    } else {
        -1
    };

    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        values.push(Value::int(current));
        current += step;
    }
    Ok(Value::array(values))
}

fn collections_concat(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let mut left = expect_array(&args[0], "std.collections.concat")?;
    left.extend(expect_array(&args[1], "std.collections.concat")?);
    Ok(Value::array(left))
}

fn collections_slice(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let values = expect_array(&args[0], "std.collections.slice")?;
    let len = values.len() as i64;
    let clamp = |raw: i64| -> usize {
        let resolved = if raw < 0 { len + raw } else { raw };
        resolved.clamp(0, len) as usize
    };
    let start = clamp(expect_int(&args[1], "std.collections.slice")?);
    let end = clamp(expect_int(&args[2], "std.collections.slice")?);
    if start >= end {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(values[start..end].to_vec()))
}

fn collections_map(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let items = expect_array(&args[0], "std.collections.map")?;
    let mut mapped = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        mapped.push(interpreter.call_function(&args[1], None, vec![item, Value::int(idx as i64)])?);
    }
    Ok(Value::array(mapped))
}

fn collections_filter(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let items = expect_array(&args[0], "std.collections.filter")?;
    let mut kept = Vec::new();
    for (idx, item) in items.into_iter().enumerate() {
        let verdict =
            interpreter.call_function(&args[1], None, vec![item.clone(), Value::int(idx as i64)])?;
        if verdict.is_truthy() {
            kept.push(item);
        }
    }
    Ok(Value::array(kept))
}

fn collections_reduce(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let items = expect_array(&args[0], "std.collections.reduce")?;
    let mut acc = args[2].clone();
    for (idx, item) in items.into_iter().enumerate() {
        acc = interpreter.call_function(&args[1], None, vec![acc, item, Value::int(idx as i64)])?;
    }
    Ok(acc)
}

fn collections_find(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let items = expect_array(&args[0], "std.collections.find")?;
    for (idx, item) in items.into_iter().enumerate() {
        let verdict =
            interpreter.call_function(&args[1], None, vec![item.clone(), Value::int(idx as i64)])?;
        if verdict.is_truthy() {
            return Ok(item);
        }
    }
    Ok(Value::unit())
}

/// Stable in-place sort. The comparator returns a negative number when its
/// first argument orders first.
fn collections_sort_by(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let target = args[0]
        .as_array()
        .ok_or_else(|| runtime("sort_by expects array as first argument"))?;
    let items = target.borrow().clone();

    // Insertion sort: the comparator is script code and may fail, so the
    // ordering is computed on a copy and written back only on success.
    let mut sorted: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        let mut slot = sorted.len();
        while slot > 0 {
            let verdict = interpreter.call_function(
                &args[1],
                None,
                vec![sorted[slot - 1].clone(), item.clone()],
            )?;
            if expect_number(&verdict, "std.collections.sort_by")? <= 0.0 {
                break;
            }
            slot -= 1;
        }
        sorted.insert(slot, item);
    }

    *target.borrow_mut() = sorted;
    Ok(args[0].clone())
}

fn math_abs(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    match &*args[0].0 {
        ValueKind::Int(n) => Ok(n
            .checked_abs()
            .map_or_else(|| Value::float((*n as f64).abs()), Value::int)),
        _ => Ok(Value::float(expect_number(&args[0], "std.math.abs")?.abs())),
    }
}

fn math_floor(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.floor")?;
    Ok(Value::float(number.floor()))
}

fn math_ceil(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.ceil")?;
    Ok(Value::float(number.ceil()))
}

fn math_sqrt(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.sqrt")?;
    if number < 0.0 {
        return Err(runtime("sqrt expects non-negative input"));
    }
    Ok(Value::float(number.sqrt()))
}

fn math_round(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let number = expect_number(&args[0], "std.math.round")?;
    Ok(Value::float(number.round()))
}

fn math_pow(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let base = expect_number(&args[0], "std.math.pow")?;
    let exponent = expect_number(&args[1], "std.math.pow")?;
    Ok(Value::float(base.powf(exponent)))
}

fn math_min(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let a = expect_number(&args[0], "std.math.min")?;
    let b = expect_number(&args[1], "std.math.min")?;
    Ok(if b < a { args[1].clone() } else { args[0].clone() })
}

fn math_max(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let a = expect_number(&args[0], "std.math.max")?;
    let b = expect_number(&args[1], "std.math.max")?;
    Ok(if b > a { args[1].clone() } else { args[0].clone() })
}

/// `stringify(value)` is compact; `stringify(value, true)` pretty-prints.
fn json_stringify(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    ensure_between(args, 1, 2, "std.json.stringify")?;
    let json = geojson::to_json(&args[0])?;
    let pretty = args.get(1).map(Value::is_truthy).unwrap_or(false);
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    Ok(Value::string(text))
}

fn json_parse(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text = expect_string(&args[0], "std.json.parse")?;
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(geojson::from_json(&json))
}
