use std::{fmt, fs, path::Path};

use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    console::{ConsoleRef, Level, LogSink},
    diagnostics::ScriptError,
    executor::{Bindings, ExecutionError, Executor},
    geojson,
    value::Value,
};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub scratch_name: String,
    pub all_layers_name: String,
    pub layer_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scratch_name: "scratch".into(),
            all_layers_name: "inputLayers".into(),
            layer_prefix: "layer".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Done,
    Error,
    Cleared,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Idle => "Idle.",
            Status::Running => "Running...",
            Status::Done => "Done.",
            Status::Error => "Error.",
            Status::Cleared => "Cleared.",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct InputLayer {
    pub id: String,
    pub source: Option<String>,
    pub data: Value,
}

#[derive(Debug)]
pub enum RunOutcome {
    Displayed,
    NoResult,
    NotDisplayable(Value),
    Failed(ExecutionError),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no input layer named `{0}`")]
    UnknownLayer(String),
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{path}` is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("scratch layer cannot be serialized: {0}")]
    Serialize(#[source] ScriptError),
}

pub struct Session {
    config: SessionConfig,
    console: ConsoleRef,
    executor: Executor,
    layers: IndexMap<String, InputLayer>,
    layer_count: usize,
    scratch: Option<Value>,
    status: Status,
}

impl Session {
    pub fn new(config: SessionConfig, console: ConsoleRef) -> Self {
        let executor = Executor::new(console.clone());
        Self {
            config,
            console,
            executor,
            layers: IndexMap::new(),
            layer_count: 0,
            scratch: None,
            status: Status::Idle,
        }
    }

    pub fn console(&self) -> &ConsoleRef {
        &self.console
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn scratch(&self) -> Option<&Value> {
        self.scratch.as_ref()
    }

    pub fn layers(&self) -> impl Iterator<Item = &InputLayer> {
        self.layers.values()
    }

    pub fn layer(&self, id: &str) -> Option<&InputLayer> {
        self.layers.get(id)
    }

    /// Adds `data` under the next free id. Ids are never reused, even after
    /// the layer they named is removed.
    pub fn add_input_layer(&mut self, data: Value, source: Option<String>) -> String {
        self.layer_count += 1;
        let id = format!("{}{}", self.config.layer_prefix, self.layer_count);
        tracing::debug!(layer = %id, source = ?source, "adding input layer");
        self.layers.insert(
            id.clone(),
            InputLayer {
                id: id.clone(),
                source,
                data,
            },
        );
        id
    }

    pub fn load_geojson_file(&mut self, path: impl AsRef<Path>) -> Result<String, SessionError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let loaded = fs::read_to_string(path)
            .map_err(|source| SessionError::Read {
                path: display.clone(),
                source,
            })
            .and_then(|text| {
                serde_json::from_str::<serde_json::Value>(&text).map_err(|source| {
                    SessionError::Parse {
                        path: display.clone(),
                        source,
                    }
                })
            });

        match loaded {
            Ok(json) => Ok(self.add_input_layer(geojson::from_json(&json), Some(display))),
            Err(err) => {
                self.report(Level::Error, &[Value::string(err.to_string())]);
                Err(err)
            }
        }
    }

    pub fn remove_input_layer(&mut self, id: &str) -> Result<InputLayer, SessionError> {
        let removed = self
            .layers
            .shift_remove(id)
            .ok_or_else(|| SessionError::UnknownLayer(id.to_string()))?;
        tracing::debug!(layer = %id, "removed input layer");
        Ok(removed)
    }

    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        let mut all_layers = Vec::with_capacity(self.layers.len());
        for layer in self.layers.values() {
            if layer.data.is_truthy() {
                bindings.insert(layer.id.clone(), layer.data.clone());
                all_layers.push(layer.data.clone());
            }
        }
        bindings.insert(self.config.all_layers_name.clone(), Value::array(all_layers));
        bindings.insert(
            self.config.scratch_name.clone(),
            self.scratch.clone().unwrap_or_else(Value::unit),
        );
        bindings
    }

    /// Runs a script against the current layers. A present, displayable
    /// result becomes the new scratch layer; anything else leaves it alone.
    pub fn run_script(&mut self, source: &str) -> RunOutcome {
        self.status = Status::Running;
        let bindings = self.bindings();

        match self.executor.execute(source, &bindings) {
            Ok(result) if !result.is_truthy() => {
                self.status = Status::Done;
                RunOutcome::NoResult
            }
            Ok(result) if geojson::is_displayable(&result) => {
                self.scratch = Some(result);
                self.status = Status::Done;
                RunOutcome::Displayed
            }
            Ok(result) => {
                self.report(
                    Level::Warn,
                    &[Value::string(format!(
                        "script returned a {} that is not GeoJSON; scratch layer unchanged",
                        result.type_name()
                    ))],
                );
                self.status = Status::Done;
                RunOutcome::NotDisplayable(result)
            }
            Err(err) => {
                self.report(Level::Error, &[Value::string(err.stack_trace())]);
                self.status = Status::Error;
                RunOutcome::Failed(err)
            }
        }
    }

    pub fn clear_scratch_layer(&mut self) {
        self.scratch = None;
        self.status = Status::Cleared;
    }

    pub fn scratch_json(&self) -> Result<Option<String>, SessionError> {
        let Some(scratch) = &self.scratch else {
            return Ok(None);
        };
        let json = geojson::to_json(scratch).map_err(SessionError::Serialize)?;
        serde_json::to_string_pretty(&json)
            .map(Some)
            .map_err(|err| SessionError::Serialize(ScriptError::from(err)))
    }

    fn report(&self, level: Level, payload: &[Value]) {
        if let Err(err) = self.console.write(level, payload) {
            tracing::warn!(error = %err, "console observer failed while reporting");
        }
    }
}
