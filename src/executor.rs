use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    ast::Stmt,
    console::LogSink,
    diagnostics::{Diagnostic, DiagnosticKind, ScriptError},
    lexer,
    parser::{self, STRICT_DIRECTIVE},
    runtime::Interpreter,
    value::{UserFunction, Value, ValueKind},
};

pub const SCRIPT_FRAME: &str = "<script>";

#[derive(Clone, Debug)]
pub struct Bindings {
    map: Value,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self {
            map: Value::map(IndexMap::new()),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.map
            .as_map()
            .and_then(|entries| entries.borrow_mut().insert(name.into(), value))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.map.get_field(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.split().0
    }

    pub fn len(&self) -> usize {
        self.map
            .as_map()
            .map(|entries| entries.borrow().len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_value(&self) -> Value {
        self.map.clone()
    }

    fn split(&self) -> (Vec<String>, Vec<Value>) {
        match self.map.as_map() {
            Some(entries) => entries
                .borrow()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .unzip(),
            None => (Vec::new(), Vec::new()),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}

pub struct ExecutableUnit {
    params: Vec<String>,
    body: Vec<Stmt>,
    strict: bool,
}

impl ExecutableUnit {
    pub fn compile(source: &str, params: Vec<String>) -> Result<Self, ExecutionError> {
        for name in &params {
            if !lexer::is_identifier(name) {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::Parser,
                    format!("invalid binding name `{name}`"),
                )
                .with_note("binding names must be identifiers and not keywords");
                return Err(ExecutionError::compile(diagnostic, source));
            }
        }

        let prefix = strict_prefix();
        let text = format!("{prefix}{source}");
        let program = parser::parse_program(&text)
            .map_err(|diag| ExecutionError::compile(diag.rebase(prefix.len()), source))?;

        Ok(Self {
            params,
            body: program.items,
            strict: program.strict,
        })
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

fn strict_prefix() -> String {
    format!("\"{STRICT_DIRECTIVE}\";\n")
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("compile error: {}", .diagnostic.message)]
    Compile { diagnostic: Diagnostic, trace: String },
    #[error("runtime error: {}", .diagnostic.message)]
    Runtime { diagnostic: Diagnostic, trace: String },
}

impl ExecutionError {
    fn compile(mut diagnostic: Diagnostic, source: &str) -> Self {
        diagnostic.push_frame(SCRIPT_FRAME, None);
        let trace = diagnostic.render_trace(source);
        ExecutionError::Compile { diagnostic, trace }
    }

    fn runtime(diagnostic: Diagnostic, source: &str) -> Self {
        let trace = diagnostic.render_trace(source);
        ExecutionError::Runtime { diagnostic, trace }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            ExecutionError::Compile { diagnostic, .. }
            | ExecutionError::Runtime { diagnostic, .. } => diagnostic,
        }
    }

    /// Human-readable failure message; never empty.
    pub fn message(&self) -> &str {
        let message = self.diagnostic().message.as_str();
        if message.trim().is_empty() {
            "script failed without a message"
        } else {
            message
        }
    }

    pub fn stack_trace(&self) -> &str {
        match self {
            ExecutionError::Compile { trace, .. } | ExecutionError::Runtime { trace, .. } => trace,
        }
    }

    pub fn is_compile(&self) -> bool {
        matches!(self, ExecutionError::Compile { .. })
    }
}

pub struct Executor {
    sink: Rc<dyn LogSink>,
}

impl Executor {
    pub fn new(sink: Rc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Runs `source` with `bindings` as its only visible names (besides the
    /// prelude). Returns the value of an explicit `return`, or `none`.
    pub fn execute(&self, source: &str, bindings: &Bindings) -> Result<Value, ExecutionError> {
        let (names, values) = bindings.split();
        tracing::debug!(bindings = ?names, "compiling script");
        let unit = ExecutableUnit::compile(source, names)?;
        self.invoke(unit, bindings.as_value(), values, source)
    }

    fn invoke(
        &self,
        unit: ExecutableUnit,
        receiver: Value,
        args: Vec<Value>,
        source: &str,
    ) -> Result<Value, ExecutionError> {
        let mut interpreter = Interpreter::with_sink(Rc::clone(&self.sink));
        interpreter.set_strict(unit.strict);

        let function = Value::new(ValueKind::Function(UserFunction {
            name: Some(SCRIPT_FRAME.to_string()),
            params: unit.params,
            body: unit.body,
            env: interpreter.globals(),
            implicit_return: false,
            captured_this: None,
        }));

        let offset = strict_prefix().len();
        match interpreter.call_function(&function, Some(receiver), args) {
            Ok(value) => {
                tracing::debug!(result = value.type_name(), "script finished");
                Ok(value)
            }
            Err(err) => {
                let diagnostic = match err {
                    ScriptError::Diagnostic(diag) => diag,
                    other => other.into_diagnostic(),
                };
                tracing::debug!(error = %diagnostic.message, "script failed");
                Err(ExecutionError::runtime(diagnostic.rebase(offset), source))
            }
        }
    }
}
