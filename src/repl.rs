use std::rc::Rc;

use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    diagnostics::{Result, ScriptError},
    panel::ConsolePanel,
    session::{RunOutcome, Session},
};

const HELP: &str = "\
:layers          list input layers
:load <file>     add a GeoJSON file as an input layer
:remove <id>     remove an input layer
:scratch         print the scratch layer
:clear           clear the scratch layer
:console         print the captured console lines
:quit | :exit    leave
anything else runs as a script";

/// Result of handling one line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct Repl {
    session: Session,
    panel: Rc<ConsolePanel>,
}

impl Repl {
    pub fn new(session: Session, panel: Rc<ConsolePanel>) -> Self {
        Self { session, panel }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| {
            ScriptError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
        })?;
        loop {
            match editor.readline("geo> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.handle_line(trimmed) {
                        Reply::Quit => break,
                        Reply::Text(text) => println!("{text}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    return Err(ScriptError::from(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        err,
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> Reply {
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            ":quit" | ":exit" => Reply::Quit,
            ":help" => Reply::Text(HELP.to_string()),
            ":layers" => Reply::Text(self.describe_layers()),
            ":load" if !argument.is_empty() => match self.session.load_geojson_file(argument) {
                Ok(id) => Reply::Text(format!("loaded `{argument}` as {id}")),
                Err(err) => Reply::Text(err.to_string()),
            },
            ":remove" if !argument.is_empty() => match self.session.remove_input_layer(argument) {
                Ok(layer) => Reply::Text(format!("removed {}", layer.id)),
                Err(err) => Reply::Text(err.to_string()),
            },
            ":load" | ":remove" => Reply::Text(format!("usage: {command} <argument>")),
            ":scratch" => Reply::Text(match self.session.scratch_json() {
                Ok(Some(json)) => json,
                Ok(None) => "(scratch layer is empty)".to_string(),
                Err(err) => err.to_string(),
            }),
            ":clear" => {
                self.session.clear_scratch_layer();
                Reply::Text(self.session.status().to_string())
            }
            ":console" => Reply::Text(self.panel.lines().join("\n")),
            _ if command.starts_with(':') => {
                Reply::Text(format!("unknown command `{command}`, try :help"))
            }
            _ => {
                let outcome = self.session.run_script(line);
                let status = self.session.status();
                Reply::Text(match outcome {
                    RunOutcome::Displayed => format!("{status} scratch layer updated"),
                    RunOutcome::NotDisplayable(value) => format!("{status} result: {value}"),
                    RunOutcome::NoResult | RunOutcome::Failed(_) => status.to_string(),
                })
            }
        }
    }

    fn describe_layers(&self) -> String {
        let rows: Vec<String> = self
            .session
            .layers()
            .map(|layer| {
                format!(
                    "{}\t({})",
                    layer.id,
                    layer.source.as_deref().unwrap_or("source not available")
                )
            })
            .collect();
        if rows.is_empty() {
            "(no input layers)".to_string()
        } else {
            rows.join("\n")
        }
    }
}
