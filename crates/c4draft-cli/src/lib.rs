//! CLI logic for c4draft.
//!
//! [`run`] dispatches one parsed command line. Everything reads from a
//! caller-supplied input and writes to a caller-supplied output so the
//! commands can be driven without a terminal.

pub mod interactive;

mod args;

pub use args::{Args, Command};

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use schemars::schema_for;

use c4draft_core::api::{
    GenerateRequest, GenerateResponse, RefineRequest, RefineResponse, Rejection, SuggestRequest,
    SuggestResponse,
};
use c4draft_core::validate::ValidationPayload;
use c4draft_core::{
    ai_configured, compute_layout, read_settings, read_settings_from, settings_path, validate,
    write_settings_to, AiSettings, DiagramVersion, LayoutConfig, StoreError,
};
use c4draft_suggest::{service_from_settings, DiagramService, DiagramSession, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(
        "no diagram backend configured; run `c4draft configure` or set C4DRAFT_BACKEND_URL"
    )]
    NotConfigured,

    #[error("description is not ready for diagram generation")]
    NotReady,
}

/// Run one command against the process's stdin and stdout.
pub fn run(args: &Args) -> Result<(), CliError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with(args, &mut stdin.lock(), &mut stdout.lock())
}

/// Run one command against the given input and output.
pub fn run_with(
    args: &Args,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    debug!(command:? = args.command; "dispatching");
    match &args.command {
        Command::Validate { input: path, json } => {
            let text = read_description(path.as_deref(), input)?;
            validate_description(&text, *json, out)
        }
        Command::Layout { input: path } => print_layout(&read_file(path)?, out),
        Command::Generate {
            input: path,
            output,
        } => {
            let text = read_description(path.as_deref(), input)?;
            let mut session = open_session(args.config.as_deref())?;
            block_on(interactive::generate(
                &mut session,
                &text,
                output.as_deref(),
                out,
            ))?
        }
        Command::Edit {
            input: path,
            output,
        } => {
            let text = match path {
                Some(path) => read_file(path)?,
                None => interactive::read_command(input)?.unwrap_or_default(),
            };
            let mut session = open_session(args.config.as_deref())?;
            block_on(interactive::edit(
                &mut session,
                &text,
                output.as_deref(),
                input,
                out,
            ))?
        }
        Command::Configure {
            provider,
            model,
            api_key,
            backend_url,
        } => {
            let path = args.config.clone().unwrap_or_else(settings_path);
            let update = SettingsUpdate {
                provider: provider.as_deref(),
                model: model.as_deref(),
                api_key: api_key.as_deref(),
                backend_url: backend_url.as_deref(),
            };
            configure(&path, update, out)
        }
        Command::Schema => print_schemas(out),
    }
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// File contents, or all of `input` when no path (or `-`) is given.
fn read_description(path: Option<&Path>, input: &mut dyn BufRead) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => read_file(path),
        _ => {
            let mut text = String::new();
            input.read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn load_settings(config: Option<&Path>) -> AiSettings {
    match config {
        Some(path) => read_settings_from(path).with_env(|k| std::env::var(k).ok()),
        None => read_settings(),
    }
}

fn open_session(
    config: Option<&Path>,
) -> Result<DiagramSession<Box<dyn DiagramService>>, CliError> {
    let settings = load_settings(config);
    let service = service_from_settings(&settings).ok_or(CliError::NotConfigured)?;
    Ok(DiagramSession::new(service))
}

fn validate_description(text: &str, json: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let report = validate(text);
    if json {
        serde_json::to_writer_pretty(&mut *out, &report.to_payload())?;
        writeln!(out)?;
    } else {
        write!(out, "{report}")?;
    }
    if report.is_valid() {
        Ok(())
    } else {
        Err(CliError::NotReady)
    }
}

fn print_layout(diagram_text: &str, out: &mut dyn Write) -> Result<(), CliError> {
    let layout = compute_layout(diagram_text);
    debug!(kind:? = layout.kind; "computed layout");
    serde_json::to_writer_pretty(&mut *out, &layout.to_renderer_config())?;
    writeln!(out)?;
    Ok(())
}

/// Fields given on the `configure` command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsUpdate<'a> {
    pub provider: Option<&'a str>,
    pub model: Option<&'a str>,
    /// An empty key keeps the stored one.
    pub api_key: Option<&'a str>,
    /// An empty URL removes the stored one.
    pub backend_url: Option<&'a str>,
}

impl SettingsUpdate<'_> {
    fn apply(self, mut settings: AiSettings) -> AiSettings {
        if let Some(provider) = self.provider {
            settings.provider = provider.trim().to_string();
        }
        if let Some(model) = self.model {
            settings.model = model.trim().to_string();
        }
        if let Some(key) = self.api_key.filter(|k| !k.is_empty()) {
            settings.api_key = key.to_string();
        }
        if let Some(url) = self.backend_url {
            settings.backend_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        }
        settings
    }
}

fn configure(path: &Path, update: SettingsUpdate<'_>, out: &mut dyn Write) -> Result<(), CliError> {
    let settings = update.apply(read_settings_from(path));
    write_settings_to(path, &settings)?;
    info!(path = path.display().to_string(); "saved settings");

    writeln!(out, "Saved settings to {}", path.display())?;
    match &settings.backend_url {
        Some(url) => writeln!(out, "Diagrams will be generated by {url}")?,
        None if ai_configured(&settings) => writeln!(
            out,
            "Diagrams will be generated with {} ({})",
            settings.provider, settings.model
        )?,
        None => writeln!(out, "No diagram backend is configured yet")?,
    }
    Ok(())
}

fn print_schemas(out: &mut dyn Write) -> Result<(), CliError> {
    let schemas = [
        ("GenerateRequest", schema_for!(GenerateRequest)),
        ("GenerateResponse", schema_for!(GenerateResponse)),
        ("SuggestRequest", schema_for!(SuggestRequest)),
        ("SuggestResponse", schema_for!(SuggestResponse)),
        ("RefineRequest", schema_for!(RefineRequest)),
        ("RefineResponse", schema_for!(RefineResponse)),
        ("Rejection", schema_for!(Rejection)),
        ("ValidationReport", schema_for!(ValidationPayload)),
        ("LayoutConfig", schema_for!(LayoutConfig)),
        ("DiagramVersion", schema_for!(DiagramVersion)),
    ];
    let mut map = serde_json::Map::new();
    for (name, schema) in schemas {
        map.insert(name.to_string(), serde_json::to_value(schema)?);
    }
    serde_json::to_writer_pretty(&mut *out, &map)?;
    writeln!(out)?;
    Ok(())
}
