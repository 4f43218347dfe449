use std::{
    cell::{Cell, RefCell},
    fmt,
    io::{self, Write},
    rc::Rc,
};

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Log,
    Info,
    Warn,
    Error,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Log, Level::Info, Level::Warn, Level::Error];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Level::Log => "LOG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    pub fn method_name(self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write log output: {0}")]
    Io(#[from] io::Error),
    #[error("log observer failed: {0}")]
    Observer(String),
}

pub trait LogSink {
    fn write(&self, level: Level, payload: &[Value]) -> Result<(), SinkError>;
}

impl<T: LogSink + ?Sized> LogSink for Rc<T> {
    fn write(&self, level: Level, payload: &[Value]) -> Result<(), SinkError> {
        (**self).write(level, payload)
    }
}

pub trait LogObserver {
    fn observe(&self, level: &str, payload: &[Value]) -> Result<(), SinkError>;
}

impl<F> LogObserver for F
where
    F: Fn(&str, &[Value]) -> Result<(), SinkError>,
{
    fn observe(&self, level: &str, payload: &[Value]) -> Result<(), SinkError> {
        self(level, payload)
    }
}

pub type ConsoleRef = Rc<Console>;

pub struct Console {
    original: Box<dyn LogSink>,
    observers: RefCell<Vec<Rc<dyn LogObserver>>>,
}

impl Console {
    pub fn intercept(original: impl LogSink + 'static) -> ConsoleRef {
        Rc::new(Self {
            original: Box::new(original),
            observers: RefCell::new(Vec::new()),
        })
    }

    /// Appends an observer. It only sees events emitted after this call.
    pub fn register_observer(&self, observer: impl LogObserver + 'static) {
        self.register_shared(Rc::new(observer));
    }

    pub fn register_shared(&self, observer: Rc<dyn LogObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&str, &[Value]) + 'static,
    {
        self.register_observer(
            move |level: &str, payload: &[Value]| -> Result<(), SinkError> {
                callback(level, payload);
                Ok(())
            },
        );
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn log(&self, payload: &[Value]) -> Result<(), SinkError> {
        self.write(Level::Log, payload)
    }

    pub fn info(&self, payload: &[Value]) -> Result<(), SinkError> {
        self.write(Level::Info, payload)
    }

    pub fn warn(&self, payload: &[Value]) -> Result<(), SinkError> {
        self.write(Level::Warn, payload)
    }

    pub fn error(&self, payload: &[Value]) -> Result<(), SinkError> {
        self.write(Level::Error, payload)
    }
}

impl LogSink for Console {
    /// The original sink always runs first. Observers then run in
    /// registration order; the first failure stops the dispatch and is
    /// returned to whoever logged.
    fn write(&self, level: Level, payload: &[Value]) -> Result<(), SinkError> {
        self.original.write(level, payload)?;

        let observers: Vec<Rc<dyn LogObserver>> = self.observers.borrow().clone();
        let name = level.canonical_name();
        for observer in observers {
            observer.observe(name, payload)?;
        }
        Ok(())
    }
}

pub fn format_payload(payload: &[Value]) -> String {
    payload
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Default)]
pub struct StdStreamSink;

impl LogSink for StdStreamSink {
    fn write(&self, level: Level, payload: &[Value]) -> Result<(), SinkError> {
        let line = format_payload(payload);
        match level {
            Level::Log | Level::Info => writeln!(io::stdout().lock(), "{line}")?,
            Level::Warn | Level::Error => writeln!(io::stderr().lock(), "{line}")?,
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: Level, payload: &[Value]) -> Result<(), SinkError> {
        let message = format_payload(payload);
        match level {
            Level::Log | Level::Info => {
                tracing::info!(target: "geoscript::console", console_level = %level, "{message}")
            }
            Level::Warn => tracing::warn!(target: "geoscript::console", "{message}"),
            Level::Error => tracing::error!(target: "geoscript::console", "{message}"),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<(Level, String)>>,
    writes: Cell<usize>,
}

impl MemorySink {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, payload: &[Value]) -> Result<(), SinkError> {
        self.writes.set(self.writes.get() + 1);
        self.events
            .borrow_mut()
            .push((level, format_payload(payload)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_are_upper_case() {
        let names: Vec<_> = Level::ALL.iter().map(|level| level.canonical_name()).collect();
        assert_eq!(names, ["LOG", "INFO", "WARN", "ERROR"]);
        for level in Level::ALL {
            assert_eq!(level.method_name().to_uppercase(), level.canonical_name());
        }
    }

    #[test]
    fn observer_registered_during_dispatch_misses_current_event() {
        let original = MemorySink::new();
        let console = Console::intercept(Rc::clone(&original));
        let late_calls = Rc::new(Cell::new(0));

        let registrar = Rc::downgrade(&console);
        let counter = Rc::clone(&late_calls);
        console.subscribe(move |_, _| {
            if let Some(console) = registrar.upgrade() {
                let counter = Rc::clone(&counter);
                console.subscribe(move |_, _| counter.set(counter.get() + 1));
            }
        });

        console.info(&[Value::string("first")]).expect("log");
        assert_eq!(late_calls.get(), 0);
        assert_eq!(console.observer_count(), 2);
    }

    #[test]
    fn payload_items_are_space_separated() {
        let payload = [Value::string("count"), Value::int(3)];
        assert_eq!(format_payload(&payload), "count 3");
    }
}
