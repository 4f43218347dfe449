use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use chrono::{SecondsFormat, Utc};

use crate::{
    console::{LogObserver, SinkError},
    geojson,
    value::Value,
};

/// The log display: an observer that turns every console event into a
/// timestamped line.
#[derive(Debug, Default)]
pub struct ConsolePanel {
    lines: RefCell<Vec<String>>,
    counter: Cell<usize>,
}

impl ConsolePanel {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Lines recorded since the panel was created, including cleared ones.
    pub fn line_count(&self) -> usize {
        self.counter.get()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }

    pub fn record(&self, level: &str, payload: &[Value]) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let content = payload
            .iter()
            .map(render_item)
            .collect::<Vec<_>>()
            .join(" ");
        self.lines
            .borrow_mut()
            .push(format!("[{timestamp}] [{level}] {content}"));
        self.counter.set(self.counter.get() + 1);
    }
}

/// Arrays and maps print as pretty JSON; anything else, or anything JSON
/// cannot hold, prints in its display form.
fn render_item(value: &Value) -> String {
    if value.is_composite() {
        if let Ok(json) = geojson::to_json(value) {
            if let Ok(text) = serde_json::to_string_pretty(&json) {
                return text;
            }
        }
    }
    value.to_string()
}

impl LogObserver for ConsolePanel {
    fn observe(&self, level: &str, payload: &[Value]) -> Result<(), SinkError> {
        self.record(level, payload);
        Ok(())
    }
}
