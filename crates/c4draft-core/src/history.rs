//! Linear undo/redo over the diagram versions of one editing session.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// One immutable snapshot of diagram text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramVersion {
    pub index: usize,
    pub diagram_text: String,
    /// The description the diagram was generated from.
    pub source_context: String,
    /// "Initial generation" or the refinement instruction that produced it.
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Versions ordered by index, with a cursor on the one being displayed.
///
/// Recording after an undo drops every version past the cursor first, so
/// there is never more than one line of history.
#[derive(Debug, Clone, Default)]
pub struct RevisionHistory {
    versions: Vec<DiagramVersion>,
    cursor: Option<usize>,
}

impl RevisionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every version.
    pub fn reset(&mut self) {
        self.versions.clear();
        self.cursor = None;
    }

    /// Append a version after the cursor and move the cursor onto it.
    pub fn record(
        &mut self,
        diagram_text: impl Into<String>,
        source_context: impl Into<String>,
        description: impl Into<String>,
    ) -> &DiagramVersion {
        let index = self.cursor.map_or(0, |c| c + 1);
        if index < self.versions.len() {
            debug!(dropped = self.versions.len() - index; "discarding redo history");
            self.versions.truncate(index);
        }
        self.versions.push(DiagramVersion {
            index,
            diagram_text: diagram_text.into(),
            source_context: source_context.into(),
            description: description.into(),
            created_at: Utc::now(),
        });
        self.cursor = Some(index);
        &self.versions[index]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.versions.len()
    }

    /// Step back one version. `None` (and no change) at the first version.
    pub fn undo(&mut self) -> Option<&DiagramVersion> {
        if !self.can_undo() {
            return None;
        }
        let cursor = self.cursor? - 1;
        self.cursor = Some(cursor);
        self.versions.get(cursor)
    }

    /// Step forward one version. `None` (and no change) at the newest version.
    pub fn redo(&mut self) -> Option<&DiagramVersion> {
        if !self.can_redo() {
            return None;
        }
        let cursor = self.cursor.map_or(0, |c| c + 1);
        self.cursor = Some(cursor);
        self.versions.get(cursor)
    }

    pub fn current(&self) -> Option<&DiagramVersion> {
        self.versions.get(self.cursor?)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn versions(&self) -> &[DiagramVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// "Version 2 of 3 (add a cache)", or `None` when empty.
    pub fn position_label(&self) -> Option<String> {
        let current = self.current()?;
        Some(format!(
            "Version {} of {} ({})",
            current.index + 1,
            self.versions.len(),
            current.description
        ))
    }
}
