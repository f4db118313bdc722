use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column names of the items sheet, in the order rows are written
pub const ITEM_COLUMNS: [&str; 8] = [
    "id",
    "date",
    "item_name",
    "item_id",
    "keeper",
    "chip_code",
    "location",
    "note",
];

/// Format used when a date is written to the sheet
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One tracked device, as read back from the items sheet
///
/// `id` and `date` are optional because cells that fail to parse are kept
/// as invalid rows instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: ItemFields,
}

/// Every column of an item except its id
///
/// This is what the add form submits and what the grid sends back for each
/// edited row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFields {
    #[serde(with = "lenient_date", default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub keeper: String,
    #[serde(default)]
    pub chip_code: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub note: String,
}

impl ItemFields {
    /// Cells for columns `date..note`, in sheet order
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            format_date(self.date),
            self.item_name.clone(),
            self.item_id.clone(),
            self.keeper.clone(),
            self.chip_code.clone(),
            self.location.clone(),
            self.note.clone(),
        ]
    }
}

impl Item {
    /// Build an item from a sheet row, locating columns through the header
    ///
    /// Columns missing from the header, or cells missing from a short row,
    /// read as empty strings. Unparseable ids and dates become `None`.
    pub fn from_row(header: &[String], row: &[String]) -> Self {
        let cell = |name: &str| -> String {
            header
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|idx| row.get(idx))
                .cloned()
                .unwrap_or_default()
        };

        Item {
            id: parse_id(&cell("id")),
            fields: ItemFields {
                date: parse_date(&cell("date")),
                item_name: cell("item_name"),
                item_id: cell("item_id"),
                keeper: cell("keeper"),
                chip_code: cell("chip_code"),
                location: cell("location"),
                note: cell("note"),
            },
        }
    }

    /// Full sheet row: id followed by [`ItemFields::to_cells`]
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(ITEM_COLUMNS.len());
        row.push(self.id.map(|id| id.to_string()).unwrap_or_default());
        row.extend(self.fields.to_cells());
        row
    }

    /// Case-insensitive substring match against every column
    ///
    /// A blank term matches all items.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.to_row()
            .iter()
            .any(|value| value.to_lowercase().contains(&term))
    }
}

/// Join the configured prefix and the number typed by the user
///
/// # Examples
/// ```
/// use inventory::item::format_asset_id;
///
/// assert_eq!(format_asset_id("VDEV-", "1001"), "VDEV-1001");
/// ```
pub fn format_asset_id(prefix: &str, number: &str) -> String {
    format!("{}{}", prefix, number.trim())
}

/// Coerce an id cell; integers and whole floats are accepted
pub fn parse_id(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(id) = value.parse::<i64>() {
        return Some(id);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

/// Coerce a date cell, dropping any time component
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in [DATE_FORMAT, "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(datetime.date());
        }
    }
    None
}

/// Text form of a date as stored in the sheet; empty when absent
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Serde adapter: dates travel as `YYYY-MM-DD`, blanks and junk become `None`
pub(crate) mod lenient_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(_) => s.serialize_str(&super::format_date(*date)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(super::parse_date))
    }
}
