use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::Stmt,
    diagnostics::{Diagnostic, Result, ScriptError},
    environment::EnvironmentRef,
    runtime::Interpreter,
};

/// Nesting beyond this depth is elided when printing, which also keeps
/// self-referencing structures printable.
const MAX_DISPLAY_DEPTH: usize = 16;

/// A handle to a script value. Cloning shares the underlying value, so
/// arrays and maps mutated through one handle change for every holder.
#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn unit() -> Self {
        Self::new(ValueKind::Unit)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(RefCell::new(values)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Map(RefCell::new(entries)))
    }

    pub fn module(name: Vec<String>, exports: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Module(ModuleValue { name, exports }))
    }

    /// Identity comparison: both handles point at the same value.
    pub fn same(a: &Value, b: &Value) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn is_unit(&self) -> bool {
        matches!(&*self.0, ValueKind::Unit)
    }

    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::Unit => false,
            ValueKind::Bool(b) => *b,
            ValueKind::Int(n) => *n != 0,
            ValueKind::Float(f) => *f != 0.0,
            ValueKind::String(s) => !s.is_empty(),
            ValueKind::Array(values) => !values.borrow().is_empty(),
            ValueKind::Map(map) => !map.borrow().is_empty(),
            ValueKind::Module(module) => !module.exports.is_empty(),
            ValueKind::Function(_) | ValueKind::NativeFunction(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Unit => "Unit",
            ValueKind::Bool(_) => "Bool",
            ValueKind::Int(_) => "Int",
            ValueKind::Float(_) => "Float",
            ValueKind::String(_) => "String",
            ValueKind::Array(_) => "Array",
            ValueKind::Map(_) => "Map",
            ValueKind::Module(_) => "Module",
            ValueKind::Function(_) => "Function",
            ValueKind::NativeFunction(_) => "Function",
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(&*self.0, ValueKind::Int(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&RefCell<Vec<Value>>> {
        match &*self.0 {
            ValueKind::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&RefCell<IndexMap<String, Value>>> {
        match &*self.0 {
            ValueKind::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(&*self.0, ValueKind::Array(_) | ValueKind::Map(_))
    }

    /// Copies array elements out so callers never hold a borrow while
    /// running script code.
    pub fn array_snapshot(&self) -> Option<Vec<Value>> {
        self.as_array().map(|values| values.borrow().clone())
    }

    /// Looks up `key` on a map, returning `None` for other kinds too.
    pub fn get_field(&self, key: &str) -> Option<Value> {
        self.as_map().and_then(|map| map.borrow().get(key).cloned())
    }

    fn write_display(&self, f: &mut fmt::Formatter<'_>, depth: usize, quoted: bool) -> fmt::Result {
        match &*self.0 {
            ValueKind::Unit => write!(f, "none"),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Float(n) => write!(f, "{n}"),
            ValueKind::String(s) if quoted => write!(f, "\"{s}\""),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::Array(_) | ValueKind::Map(_) if depth >= MAX_DISPLAY_DEPTH => {
                write!(f, "...")
            }
            ValueKind::Array(values) => {
                write!(f, "[")?;
                for (idx, value) in values.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    value.write_display(f, depth + 1, true)?;
                }
                write!(f, "]")
            }
            ValueKind::Map(map) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in map.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: ")?;
                    value.write_display(f, depth + 1, true)?;
                }
                write!(f, "}}")
            }
            ValueKind::Module(module) => write!(f, "<module {}>", module.name.join(".")),
            ValueKind::Function(fun) => write!(
                f,
                "<fn {}>",
                fun.name.clone().unwrap_or_else(|| "anonymous".into())
            ),
            ValueKind::NativeFunction(fun) => write!(f, "<native fn {}>", fun.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_display(f, 0, true)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_display(f, 0, false)
    }
}

pub enum ValueKind {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(RefCell<Vec<Value>>),
    Map(RefCell<IndexMap<String, Value>>),
    Module(ModuleValue),
    Function(UserFunction),
    NativeFunction(NativeFunction),
}

/// A read-only namespace such as `std.math`.
pub struct ModuleValue {
    pub name: Vec<String>,
    pub exports: IndexMap<String, Value>,
}

pub struct UserFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub env: EnvironmentRef,
    /// Lambdas with an expression body yield their last value.
    pub implicit_return: bool,
    /// Receiver captured by lambdas; `fn` declarations have none.
    pub captured_this: Option<Value>,
}

pub type NativeCallback = fn(&mut Interpreter, &[Value]) -> Result<Value>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub callback: NativeCallback,
}

impl NativeFunction {
    pub fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
        if self.arity != usize::MAX && args.len() != self.arity {
            return Err(ScriptError::from(Diagnostic::runtime(format!(
                "function `{}` expected {} arguments but received {}",
                self.name,
                self.arity,
                args.len()
            ))));
        }
        (self.callback)(interpreter, args)
    }
}
