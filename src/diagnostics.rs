use std::fmt;

use thiserror::Error;

/// Represents a byte span within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Moves the span `offset` bytes towards the start of the text.
    pub fn rebase(self, offset: usize) -> Self {
        Self {
            start: self.start.saturating_sub(offset),
            end: self.end.saturating_sub(offset),
        }
    }

    /// One-based line and column of the span start within `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (idx, ch) in source.char_indices() {
            if idx >= self.start {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Runtime,
}

impl DiagnosticKind {
    /// Lexer and parser diagnostics happen before any code runs.
    pub fn is_compile_time(&self) -> bool {
        matches!(self, DiagnosticKind::Lexer | DiagnosticKind::Parser)
    }
}

/// A call frame the error unwound through, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub span: Option<SourceSpan>,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
    pub stack: Vec<StackFrame>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Runtime, message)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Attaches `span` only when no more precise location is known yet.
    pub fn or_span(mut self, span: SourceSpan) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn push_frame(&mut self, function: impl Into<String>, span: Option<SourceSpan>) {
        self.stack.push(StackFrame {
            function: function.into(),
            span,
        });
    }

    /// Shifts every recorded span back by `offset` bytes.
    pub fn rebase(mut self, offset: usize) -> Self {
        self.span = self.span.map(|span| span.rebase(offset));
        for frame in &mut self.stack {
            frame.span = frame.span.map(|span| span.rebase(offset));
        }
        self
    }

    /// Renders the message followed by one `at` line per stack frame.
    pub fn render_trace(&self, source: &str) -> String {
        let mut out = format!("{:?}: {}", self.kind, self.message);
        if let Some(span) = self.span {
            let (line, col) = span.line_col(source);
            out.push_str(&format!(" ({line}:{col})"));
        }
        for frame in &self.stack {
            out.push_str("\n    at ");
            out.push_str(&frame.function);
            if let Some(span) = frame.span {
                let (line, col) = span.line_col(source);
                out.push_str(&format!(" ({line}:{col})"));
            }
        }
        for note in &self.notes {
            out.push_str(&format!("\n  note: {note}"));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        if !self.notes.is_empty() {
            writeln!(f)?;
            for note in &self.notes {
                writeln!(f, "  note: {note}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the script interpreter.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScriptError {
    /// Views any error as a diagnostic; I/O and JSON failures become runtime ones.
    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            ScriptError::Diagnostic(diag) => diag,
            other => Diagnostic::runtime(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
