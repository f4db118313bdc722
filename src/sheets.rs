//! Row-level access to a spreadsheet.
//!
//! The stores never talk HTTP themselves; they go through [`SheetBackend`],
//! which mirrors the handful of calls the remote service offers. Rows and
//! columns are 1-based throughout, matching A1 notation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::item::ITEM_COLUMNS;

#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Every row of `sheet`, header included. Trailing empty cells may be
    /// missing from a row.
    async fn get_values(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Append one row after the last non-empty row
    async fn append_row(&self, sheet: &str, values: Vec<String>) -> Result<()>;

    /// Overwrite `values.len()` cells of `row` starting at `first_col`
    async fn update_row(
        &self,
        sheet: &str,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<()>;

    /// Remove `row`; rows below shift up
    async fn delete_row(&self, sheet: &str, row: usize) -> Result<()>;

    /// Cells of column `col`, header included
    async fn col_values(&self, sheet: &str, col: usize) -> Result<Vec<String>> {
        if col == 0 {
            return Err(Error::Malformed("column numbers start at 1".to_string()));
        }
        let rows = self.get_values(sheet).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().nth(col - 1).unwrap_or_default())
            .collect())
    }

    /// First row whose cell in `col` equals `value` exactly
    async fn find_in_column(&self, sheet: &str, col: usize, value: &str) -> Result<Option<usize>> {
        let column = self.col_values(sheet, col).await?;
        Ok(column.iter().position(|cell| cell == value).map(|idx| idx + 1))
    }
}

/// Spreadsheet kept in process memory
///
/// Behaves like the remote service for the calls above, including failing on
/// unknown sheet names. Backs the offline mode and the test suite.
#[derive(Debug, Default)]
pub struct MemorySheets {
    sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items, chips and locations sheets with their header rows
    pub fn with_inventory_headers(items: &str, chips: &str, locations: &str) -> Self {
        let sheets = Self::new();
        sheets.insert_sheet(items, vec![ITEM_COLUMNS.iter().map(|c| c.to_string()).collect()]);
        sheets.insert_sheet(chips, vec![vec!["chip_code".to_string()]]);
        sheets.insert_sheet(locations, vec![vec!["location".to_string()]]);
        sheets
    }

    /// Create or replace a sheet
    pub fn insert_sheet(&self, name: &str, rows: Vec<Vec<String>>) {
        self.lock().insert(name.to_string(), rows);
    }

    /// Raw rows of a sheet, for inspection
    pub fn snapshot(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Vec<String>>>> {
        // a panic while holding the lock cannot leave the map half-written
        self.sheets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_sheet<T>(&self, sheet: &str, f: impl FnOnce(&mut Vec<Vec<String>>) -> Result<T>) -> Result<T> {
        let mut sheets = self.lock();
        let rows = sheets
            .get_mut(sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?;
        f(rows)
    }
}

#[async_trait]
impl SheetBackend for MemorySheets {
    async fn get_values(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.with_sheet(sheet, |rows| Ok(rows.clone()))
    }

    async fn append_row(&self, sheet: &str, values: Vec<String>) -> Result<()> {
        self.with_sheet(sheet, |rows| {
            rows.push(values);
            Ok(())
        })
    }

    async fn update_row(
        &self,
        sheet: &str,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<()> {
        if row == 0 || first_col == 0 {
            return Err(Error::Api {
                status: 400,
                message: format!("invalid range {}", a1_range(sheet, row, first_col, values.len())),
            });
        }
        self.with_sheet(sheet, |rows| {
            if rows.len() < row {
                rows.resize_with(row, Vec::new);
            }
            let target = &mut rows[row - 1];
            let end = first_col - 1 + values.len();
            if target.len() < end {
                target.resize(end, String::new());
            }
            for (offset, value) in values.into_iter().enumerate() {
                target[first_col - 1 + offset] = value;
            }
            Ok(())
        })
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> Result<()> {
        self.with_sheet(sheet, |rows| {
            if row == 0 || row > rows.len() {
                return Err(Error::Api {
                    status: 400,
                    message: format!("row {} is out of range", row),
                });
            }
            rows.remove(row - 1);
            Ok(())
        })
    }
}

/// Convert column number to letters (1 = A, 27 = AA)
pub fn column_letter(col: usize) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

/// Sheet name quoted for A1 notation (`'it''s'`)
pub fn quote_sheet_name(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// A1 range covering `width` cells of one row, e.g. `'items'!B5:H5`
pub fn a1_range(sheet: &str, row: usize, first_col: usize, width: usize) -> String {
    let last_col = first_col + width.saturating_sub(1);
    format!(
        "{}!{}{}:{}{}",
        quote_sheet_name(sheet),
        column_letter(first_col),
        row,
        column_letter(last_col),
        row
    )
}

/// A1 range covering a whole column, e.g. `'chips'!A:A`
pub fn a1_column(sheet: &str, col: usize) -> String {
    let letter = column_letter(col);
    format!("{}!{}:{}", quote_sheet_name(sheet), letter, letter)
}
