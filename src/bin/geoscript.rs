use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    rc::Rc,
};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use geoscript::{
    console::{StdStreamSink, TracingSink}, Console, ConsolePanel, Repl, ScriptError, Session, SessionConfig,
    session::SessionError,
};

#[derive(Parser)]
#[command(author, version, about = "Run scripts against GeoJSON layers")]
struct Args {
    /// Print debug diagnostics from the host
    #[arg(long, global = true)]
    verbose: bool,
    /// Send script console output to the tracing log instead of stdout/stderr
    #[arg(long, global = true)]
    console_tracing: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file; a returned GeoJSON value is printed
    Run {
        script: PathBuf,
        /// GeoJSON file to load as an input layer (repeatable)
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,
        /// Write the scratch layer here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the captured console lines here
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Run a script given on the command line
    Eval {
        source: String,
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Start an interactive session
    Repl {
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read `{path}`: {source}")]
    ReadScript {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write `{path}`: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("script failed")]
    ScriptFailed,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.console_tracing);
    let console_tracing = args.console_tracing;

    let result = match args.command.unwrap_or(Command::Repl { layers: Vec::new() }) {
        Command::Run {
            script,
            layers,
            output,
            log_file,
        } => fs::read_to_string(&script)
            .map_err(|source| CliError::ReadScript {
                path: script.display().to_string(),
                source,
            })
            .and_then(|source| run_once(&source, &layers, output, log_file, console_tracing)),
        Command::Eval {
            source,
            layers,
            output,
        } => run_once(&source, &layers, output, None, console_tracing),
        Command::Repl { layers } => start_repl(&layers, console_tracing),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, console_tracing: bool) {
    let mut directives = String::from(if verbose { "debug" } else { "warn" });
    if console_tracing {
        directives.push_str(",geoscript::console=info");
    }
    let filter = EnvFilter::try_from_env("GEOSCRIPT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(directives));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn open_session(
    layers: &[PathBuf],
    console_tracing: bool,
) -> Result<(Session, Rc<ConsolePanel>), CliError> {
    let console = if console_tracing {
        Console::intercept(TracingSink)
    } else {
        Console::intercept(StdStreamSink)
    };
    let panel = ConsolePanel::new();
    console.register_shared(panel.clone());

    let mut session = Session::new(SessionConfig::default(), console);
    for path in layers {
        session.load_geojson_file(path)?;
    }
    Ok((session, panel))
}

fn run_once(
    source: &str,
    layers: &[PathBuf],
    output: Option<PathBuf>,
    log_file: Option<PathBuf>,
    console_tracing: bool,
) -> Result<(), CliError> {
    let (mut session, panel) = open_session(layers, console_tracing)?;
    let outcome = session.run_script(source);

    if let Some(path) = log_file {
        let mut text = panel.lines().join("\n");
        text.push('\n');
        write_file(&path, &text)?;
    }
    if outcome.is_failure() {
        return Err(CliError::ScriptFailed);
    }

    if let Some(json) = session.scratch_json()? {
        match output {
            Some(path) => write_file(&path, &json)?,
            None => println!("{json}"),
        }
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn start_repl(layers: &[PathBuf], console_tracing: bool) -> Result<(), CliError> {
    let (session, panel) = open_session(layers, console_tracing)?;
    let mut repl = Repl::new(session, panel);
    repl.run()?;
    Ok(())
}
