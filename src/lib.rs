//! Script sandbox for GeoJSON layers: a small embedded language, an executor
//! that runs scripts against explicitly named bindings, and a console that
//! mirrors every log call to registered observers.

pub mod ast;
pub mod console;
pub mod diagnostics;
pub mod environment;
pub mod executor;
pub mod geojson;
pub mod lexer;
pub mod panel;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod session;
pub mod stdlib;
pub mod value;

pub use console::{Console, ConsoleRef, Level, LogObserver, LogSink, SinkError};
pub use diagnostics::{Diagnostic, DiagnosticKind, ScriptError, SourceSpan};
pub use executor::{Bindings, ExecutionError, Executor};
pub use panel::ConsolePanel;
pub use repl::Repl;
pub use runtime::Interpreter;
pub use session::{RunOutcome, Session, SessionConfig, Status};
pub use value::Value;
