use log::{info, warn};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::sheets::SheetBackend;

/// Dropdown lists backed by their own single-column sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCategory {
    Chips,
    Locations,
}

impl FromStr for OptionCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "chips" => Ok(OptionCategory::Chips),
            "locations" => Ok(OptionCategory::Locations),
            other => Err(format!("unknown option category: {}", other)),
        }
    }
}

/// Reads and extends the chip-code and location lists
///
/// Lookups are a linear scan of the first column. There is no locking, so
/// two sessions adding the same value at once can both succeed.
#[derive(Clone)]
pub struct OptionsStore {
    backend: Arc<dyn SheetBackend>,
    chips_sheet: String,
    locations_sheet: String,
}

impl OptionsStore {
    pub fn new(backend: Arc<dyn SheetBackend>, chips_sheet: &str, locations_sheet: &str) -> Self {
        OptionsStore {
            backend,
            chips_sheet: chips_sheet.to_string(),
            locations_sheet: locations_sheet.to_string(),
        }
    }

    pub fn from_config(backend: Arc<dyn SheetBackend>, config: &Config) -> Self {
        Self::new(backend, &config.chips_sheet, &config.locations_sheet)
    }

    fn sheet(&self, category: OptionCategory) -> &str {
        match category {
            OptionCategory::Chips => &self.chips_sheet,
            OptionCategory::Locations => &self.locations_sheet,
        }
    }

    /// Values of the list, header excluded
    ///
    /// Never fails: if the sheet cannot be read the list is empty and the
    /// error is only logged.
    pub async fn list(&self, category: OptionCategory) -> Vec<String> {
        let sheet = self.sheet(category);
        match self.backend.col_values(sheet, 1).await {
            Ok(values) => values.into_iter().skip(1).collect(),
            Err(e) => {
                warn!("could not read options from '{}': {}", sheet, e);
                Vec::new()
            }
        }
    }

    /// Append `value` unless the column already holds it
    ///
    /// Surrounding whitespace is ignored on both sides of the comparison, and
    /// the value is stored trimmed.
    ///
    /// # Returns
    /// * `Ok(true)` - the value was appended
    /// * `Ok(false)` - the value was already present, nothing written
    pub async fn add(&self, category: OptionCategory, value: &str) -> Result<bool> {
        let sheet = self.sheet(category);
        let value = value.trim();
        let existing = self.backend.col_values(sheet, 1).await?;
        if existing.iter().any(|v| v.trim() == value) {
            return Ok(false);
        }
        self.backend.append_row(sheet, vec![value.to_string()]).await?;
        info!("added '{}' to '{}'", value, sheet);
        Ok(true)
    }
}
