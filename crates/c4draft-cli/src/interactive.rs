//! `generate` and the `edit` refinement loop.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use c4draft_suggest::{DiagramService, DiagramSession, FollowUp, SessionError};

use crate::CliError;

/// Next line of `input` with surrounding whitespace removed; `None` at EOF.
pub fn read_command(input: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Generate once and print (or write) the diagram.
///
/// When the description is on topic but too thin, reworded alternatives are
/// printed before the rejection is returned.
pub async fn generate<S: DiagramService>(
    session: &mut DiagramSession<S>,
    text: &str,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let draft = session.generate(text).await.map(|v| v.diagram_text.clone());
    let diagram = match draft {
        Ok(diagram) => diagram,
        Err(err) => {
            if needs_suggestions(&err) {
                offer_suggestions(session, out).await?;
            }
            return Err(err.into());
        }
    };
    log_warnings(session);

    match output {
        Some(path) => {
            let written = session.export(Some(path))?;
            info!(path = written.display().to_string(); "diagram written");
        }
        None => writeln!(out, "{diagram}")?,
    }
    Ok(())
}

/// Generate, then apply one refinement per input line until `quit` or EOF.
///
/// `undo`, `redo`, `show`, `history`, `layout` and `export [PATH]` are
/// commands; every other line is a refinement instruction.
pub async fn edit<S: DiagramService>(
    session: &mut DiagramSession<S>,
    text: &str,
    output: Option<&Path>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let generated = session.generate(text).await.map(|_| ());
    if let Err(err) = generated {
        if !needs_suggestions(&err) {
            return Err(err.into());
        }
        writeln!(out, "{err}\n")?;
        offer_suggestions(session, out).await?;
        let Some(improved) = pick_suggestion(session, input, out)? else {
            return Err(err.into());
        };
        session.use_suggestion(&improved).await?;
    }
    log_warnings(session);
    show_current(session, out)?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = read_command(input)? else {
            break;
        };
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line.as_str(), ""),
        };

        match (command, rest) {
            ("", _) => continue,
            ("quit" | "exit", "") => break,
            ("undo", "") => {
                let undone = session.current().map(|v| v.description.clone());
                match (session.undo().is_some(), undone) {
                    (true, Some(description)) => {
                        writeln!(out, "Undid: {description}")?;
                        show_position(session, out)?;
                    }
                    _ => writeln!(out, "Nothing to undo")?,
                }
            }
            ("redo", "") => match session.redo().map(|v| v.description.clone()) {
                Some(description) => {
                    writeln!(out, "Redid: {description}")?;
                    show_position(session, out)?;
                }
                None => writeln!(out, "Nothing to redo")?,
            },
            ("show", "") => show_current(session, out)?,
            ("history", "") => list_history(session, out)?,
            ("layout", "") => {
                serde_json::to_writer_pretty(&mut *out, &session.layout().to_renderer_config())?;
                writeln!(out)?;
            }
            ("export", path) => {
                let path = match path {
                    "" => output.map(Path::to_path_buf),
                    path => Some(PathBuf::from(path)),
                };
                match session.export(path.as_deref()) {
                    Ok(written) => writeln!(out, "Exported to {}", written.display())?,
                    Err(e) => writeln!(out, "Error: {e}")?,
                }
            }
            _ => match session.refine(&line).await {
                Ok(response) => {
                    if !response.explanation.is_empty() {
                        writeln!(out, "{}", response.explanation)?;
                    }
                    if !response.changes_made.is_empty() {
                        writeln!(out, "\nChanges:")?;
                        for change in &response.changes_made {
                            writeln!(out, "• {change}")?;
                        }
                    }
                    show_position(session, out)?;
                }
                Err(e) => writeln!(out, "Error: {e}")?,
            },
        }
    }
    Ok(())
}

fn needs_suggestions(err: &SessionError) -> bool {
    matches!(
        err,
        SessionError::Rejected {
            follow_up: FollowUp::FetchSuggestions,
            ..
        }
    )
}

async fn offer_suggestions<S: DiagramService>(
    session: &mut DiagramSession<S>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let suggestions = match session.suggest().await {
        Ok(suggestions) => suggestions,
        Err(e) => {
            warn!("could not fetch suggestions: {e}");
            return Ok(());
        }
    };
    writeln!(out, "Suggested descriptions:")?;
    for (i, suggestion) in suggestions.iter().enumerate() {
        writeln!(out, "\nOption {}: {}", i + 1, suggestion.title)?;
        if !suggestion.description.is_empty() {
            writeln!(out, "  {}", suggestion.description)?;
        }
        writeln!(out, "  {}", suggestion.improved_text)?;
    }
    Ok(())
}

fn pick_suggestion<S: DiagramService>(
    session: &DiagramSession<S>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<Option<String>, CliError> {
    if session.suggestions().is_empty() {
        return Ok(None);
    }
    write!(out, "\nPick an option number (anything else quits): ")?;
    out.flush()?;
    let choice = read_command(input)?;
    Ok(choice
        .and_then(|c| c.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| session.suggestions().get(i))
        .map(|s| s.improved_text.clone()))
}

fn log_warnings<S: DiagramService>(session: &DiagramSession<S>) {
    if let Some(report) = session.report() {
        for finding in report.warnings() {
            warn!(category = finding.category.as_str(); "{}", finding.message);
        }
    }
}

fn show_position<S: DiagramService>(
    session: &DiagramSession<S>,
    out: &mut dyn Write,
) -> io::Result<()> {
    if let Some(label) = session.history().position_label() {
        writeln!(out, "{label}")?;
    }
    Ok(())
}

fn show_current<S: DiagramService>(
    session: &DiagramSession<S>,
    out: &mut dyn Write,
) -> io::Result<()> {
    show_position(session, out)?;
    if let Some(version) = session.current() {
        writeln!(out, "{}", version.diagram_text)?;
    }
    Ok(())
}

fn list_history<S: DiagramService>(
    session: &DiagramSession<S>,
    out: &mut dyn Write,
) -> io::Result<()> {
    let history = session.history();
    for version in history.versions() {
        let marker = if history.cursor() == Some(version.index) {
            '*'
        } else {
            ' '
        };
        writeln!(
            out,
            "{marker} {}. {} ({})",
            version.index + 1,
            version.description,
            version.created_at.format("%H:%M:%S")
        )?;
    }
    Ok(())
}
