//! Writing the edited grid back to the sheet.
//!
//! The grid is saved as a whole: every row is either deleted or rewritten,
//! one request after another. A failure stops the loop where it happened.
//! Rows already written stay written, nothing is rolled back or retried, and
//! the caller gets a count of what was committed before the error.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::item::ItemFields;
use crate::store::ItemStore;

/// One grid row as submitted by "Save Changes"
#[derive(Debug, Clone, Deserialize)]
pub struct PendingEdit {
    /// `None` for rows whose id could not be read from the sheet
    pub id: Option<i64>,
    #[serde(default)]
    pub delete: bool,
    #[serde(flatten)]
    pub fields: ItemFields,
}

/// What a save run has written so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub updated: usize,
    pub deleted: usize,
    /// Rows whose id was no longer in the sheet
    pub missing: usize,
    /// Rows without an id, never sent
    pub skipped: usize,
}

impl SaveReport {
    /// Number of rows that reached the sheet
    pub fn committed(&self) -> usize {
        self.updated + self.deleted
    }
}

/// A save run that stopped early
#[derive(Debug, Error)]
#[error("save stopped after {} committed rows: {source}", .report.committed())]
pub struct SaveError {
    pub report: SaveReport,
    #[source]
    pub source: Error,
}

/// Apply every pending edit in grid order
///
/// Rows are matched by id only. Two items created within the same second
/// share an id, so both of their edits land on the first matching row and
/// the second edit overwrites the first.
pub async fn save_all(store: &ItemStore, edits: &[PendingEdit]) -> Result<SaveReport, SaveError> {
    let mut report = SaveReport::default();

    for edit in edits {
        let Some(id) = edit.id else {
            report.skipped += 1;
            continue;
        };

        let outcome = if edit.delete {
            store.delete(id).await
        } else {
            store.update(id, &edit.fields).await
        };

        match outcome {
            Ok(true) if edit.delete => report.deleted += 1,
            Ok(true) => report.updated += 1,
            Ok(false) => report.missing += 1,
            Err(source) => {
                warn!(
                    "save aborted at id {} with {} rows committed: {}",
                    id,
                    report.committed(),
                    source
                );
                return Err(SaveError { report, source });
            }
        }
    }

    info!(
        "saved grid: {} updated, {} deleted, {} missing, {} skipped",
        report.updated, report.deleted, report.missing, report.skipped
    );
    Ok(report)
}
