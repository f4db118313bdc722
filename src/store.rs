use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

use crate::error::Result;
use crate::item::{Item, ItemFields};
use crate::sheets::SheetBackend;

/// Column holding the item id (A)
const ID_COLUMN: usize = 1;

/// Items sheet, one row per device, keyed by a timestamp id
///
/// Every call goes straight to the backend. Finding a row and then writing
/// it are separate requests, so another session editing the sheet in between
/// can make an update land on the wrong row; nothing here guards against it.
#[derive(Clone)]
pub struct ItemStore {
    backend: Arc<dyn SheetBackend>,
    sheet: String,
}

impl ItemStore {
    pub fn new(backend: Arc<dyn SheetBackend>, sheet: &str) -> Self {
        ItemStore {
            backend,
            sheet: sheet.to_string(),
        }
    }

    /// Read every item in sheet order
    ///
    /// Rows whose id or date cannot be parsed are returned with `None` in
    /// that field rather than dropped.
    pub async fn list_all(&self) -> Result<Vec<Item>> {
        let mut rows = self.backend.get_values(&self.sheet).await?.into_iter();
        let header = match rows.next() {
            Some(header) => header,
            None => return Ok(Vec::new()),
        };
        Ok(rows.map(|row| Item::from_row(&header, &row)).collect())
    }

    /// Append a new row, using the current time in seconds as its id
    ///
    /// Two creations within the same second get the same id.
    pub async fn create(&self, fields: &ItemFields) -> Result<i64> {
        let id = Utc::now().timestamp();
        self.create_with_id(id, fields).await?;
        Ok(id)
    }

    pub async fn create_with_id(&self, id: i64, fields: &ItemFields) -> Result<()> {
        let item = Item {
            id: Some(id),
            fields: fields.clone(),
        };
        self.backend.append_row(&self.sheet, item.to_row()).await?;
        info!("created item {} ({})", id, fields.item_id);
        Ok(())
    }

    /// Overwrite every column but the id of the row holding `id`
    ///
    /// # Returns
    /// * `Ok(false)` when no row carries that id; nothing is written
    pub async fn update(&self, id: i64, fields: &ItemFields) -> Result<bool> {
        let Some(row) = self.find(id).await? else {
            debug!("update skipped, no row with id {}", id);
            return Ok(false);
        };
        self.backend
            .update_row(&self.sheet, row, ID_COLUMN + 1, fields.to_cells())
            .await?;
        debug!("updated item {} at row {}", id, row);
        Ok(true)
    }

    /// Remove the row holding `id`; `Ok(false)` if there is none
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let Some(row) = self.find(id).await? else {
            debug!("delete skipped, no row with id {}", id);
            return Ok(false);
        };
        self.backend.delete_row(&self.sheet, row).await?;
        info!("deleted item {} (row {})", id, row);
        Ok(true)
    }

    async fn find(&self, id: i64) -> Result<Option<usize>> {
        let row = self
            .backend
            .find_in_column(&self.sheet, ID_COLUMN, &id.to_string())
            .await?;
        // never treat the header as a match
        Ok(row.filter(|&r| r > 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::format_asset_id;
    use crate::sheets::MemorySheets;
    use chrono::NaiveDate;

    fn fields(name: &str, number: &str) -> ItemFields {
        ItemFields {
            date: NaiveDate::from_ymd_opt(2024, 5, 20),
            item_name: name.to_string(),
            item_id: format_asset_id("VDEV-", number),
            keeper: "Alice".to_string(),
            chip_code: "BCM7271".to_string(),
            location: "Lab A".to_string(),
            note: String::new(),
        }
    }

    fn setup() -> (Arc<MemorySheets>, ItemStore) {
        let sheets = Arc::new(MemorySheets::with_inventory_headers("items", "chips", "locations"));
        let store = ItemStore::new(sheets.clone(), "items");
        (sheets, store)
    }

    async fn seeded() -> (Arc<MemorySheets>, ItemStore) {
        let (sheets, store) = setup();
        store.create_with_id(101, &fields("Stream 4K", "1001")).await.unwrap();
        store.create_with_id(102, &fields("Edge Box", "1002")).await.unwrap();
        store.create_with_id(103, &fields("Mini", "1003")).await.unwrap();
        (sheets, store)
    }

    #[tokio::test]
    async fn create_appends_one_matching_row() {
        let (sheets, store) = setup();
        let before = store.list_all().await.unwrap().len();

        let id = store.create(&fields("Stream 4K", "1001")).await.unwrap();

        let items = store.list_all().await.unwrap();
        assert_eq!(items.len(), before + 1);
        let created = items.last().unwrap();
        assert_eq!(created.id, Some(id));
        assert_eq!(created.fields, fields("Stream 4K", "1001"));
        assert_eq!(created.fields.item_id, "VDEV-1001");

        let rows = sheets.snapshot("items").unwrap();
        assert_eq!(rows[1][1], "2024-05-20");
        assert_eq!(rows[1][3], "VDEV-1001");
    }

    #[tokio::test]
    async fn update_touches_only_the_target_row() {
        let (sheets, store) = seeded().await;
        let before = sheets.snapshot("items").unwrap();

        let mut changed = fields("Edge Box v2", "2002");
        changed.note = "returned".to_string();
        assert!(store.update(102, &changed).await.unwrap());

        let after = sheets.snapshot("items").unwrap();
        assert_eq!(after.len(), before.len());
        for (idx, (old, new)) in before.iter().zip(after.iter()).enumerate() {
            if idx == 2 {
                assert_eq!(new[0], "102");
                assert_eq!(new[2], "Edge Box v2");
                assert_eq!(new[3], "VDEV-2002");
                assert_eq!(new[7], "returned");
            } else {
                assert_eq!(old, new, "row {} changed", idx + 1);
            }
        }
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_a_no_op() {
        let (sheets, store) = seeded().await;
        let before = sheets.snapshot("items").unwrap();

        assert!(!store.update(999, &fields("Ghost", "0")).await.unwrap());

        assert_eq!(sheets.snapshot("items").unwrap(), before);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_row() {
        let (_, store) = seeded().await;
        let count = store.list_all().await.unwrap().len();

        assert!(store.delete(101).await.unwrap());
        let items = store.list_all().await.unwrap();
        assert_eq!(items.len(), count - 1);
        assert!(items.iter().all(|item| item.id != Some(101)));

        assert!(!store.delete(101).await.unwrap());
        assert_eq!(store.list_all().await.unwrap().len(), count - 1);
    }

    #[tokio::test]
    async fn id_match_is_exact() {
        let (_, store) = setup();
        store.create_with_id(10, &fields("Ten", "10")).await.unwrap();
        store.create_with_id(100, &fields("Hundred", "100")).await.unwrap();

        store.delete(100).await.unwrap();

        let items = store.list_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, Some(10));
    }

    #[tokio::test]
    async fn invalid_rows_are_retained() {
        let (sheets, store) = setup();
        let mut rows = sheets.snapshot("items").unwrap();
        rows.push(vec!["n/a".into(), "someday".into(), "Loose cable".into()]);
        sheets.insert_sheet("items", rows);

        let items = store.list_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, None);
        assert_eq!(items[0].fields.date, None);
        assert_eq!(items[0].fields.item_name, "Loose cable");
    }

    #[tokio::test]
    async fn header_only_sheet_is_empty() {
        let (_, store) = setup();
        assert!(store.list_all().await.unwrap().is_empty());

        let bare = ItemStore::new(Arc::new(MemorySheets::new()), "items");
        assert!(bare.list_all().await.is_err());
    }
}
