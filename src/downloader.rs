use crate::item::{Item, format_date};

/// Header labels of an export, in column order
///
/// The internal id and the grid's delete flag are never exported.
pub const EXPORT_HEADERS: [&str; 7] = [
    "Date",
    "Item Name",
    "Asset ID",
    "Keeper",
    "Chip Code",
    "Location",
    "Note",
];

/// UTF-8 byte-order mark, so spreadsheet programs pick the right encoding
const BOM: &str = "\u{feff}";

fn export_cells(item: &Item) -> [String; 7] {
    let f = &item.fields;
    [
        format_date(f.date),
        f.item_name.clone(),
        f.item_id.clone(),
        f.keeper.clone(),
        f.chip_code.clone(),
        f.location.clone(),
        f.note.clone(),
    ]
}

/// Convert items to CSV
///
/// The output starts with a byte-order mark, uses the renamed headers from
/// [`EXPORT_HEADERS`], and quotes any field containing a comma, quote or
/// line break (embedded quotes are doubled).
///
/// # Arguments
/// * `items` - Rows to export, usually the currently filtered grid
///
/// # Returns
/// * `Vec<u8>` - UTF-8 bytes ready to be served as `text/csv`
pub fn to_csv(items: &[Item]) -> Vec<u8> {
    let mut csv_content = String::from(BOM);

    push_record(&mut csv_content, EXPORT_HEADERS.iter().copied());
    for item in items {
        push_record(&mut csv_content, export_cells(item).iter().map(String::as_str));
    }

    csv_content.into_bytes()
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, value) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
        {
            let escaped = value.replace('"', "\"\"");
            out.push_str(&format!("\"{}\"", escaped));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert items to an XLSX workbook with a bold header row
///
/// Same columns as [`to_csv`].
#[cfg(feature = "web")]
pub fn to_xlsx(items: &[Item]) -> crate::error::Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let bold = Format::new().set_bold();

    for (c, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *header, &bold)?;
    }

    for (r, item) in items.iter().enumerate() {
        for (c, value) in export_cells(item).iter().enumerate() {
            worksheet.write_string((r + 1) as u32, c as u16, value.as_str())?;
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
