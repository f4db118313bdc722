/*!
# Development Kit Inventory

A small web form for tracking physical devices, with all state kept in a
Google Sheets spreadsheet.

## Overview

Users add, edit, search and delete rows describing devices (date, name,
asset ID, keeper, chip code, location, note). Nothing is stored locally: every
action is a direct read, append, update or delete against the spreadsheet
service, and the only logic of our own is formatting (asset-id prefixing,
dates) and a substring search over rows already fetched.

## Architecture

### Presentation Layer
- **Technologies**: HTML, vanilla JavaScript, axum
- One page with an "Add New Asset" form, option management, a search box,
  an editable grid with delete checkboxes and export links

### Stores
- **Items store**: rows of the `items` sheet keyed by a timestamp id
- **Options store**: single-column `chips` and `locations` sheets that feed
  the dropdowns
- **Sync**: "Save Changes" rewrites or deletes every grid row in order,
  stopping at the first failure without rolling back

### Sheet Backends
- Google Sheets v4 over HTTPS (`reqwest`)
- In-memory sheets for offline demos and tests

## Sheet Layout

- `items`: `id, date, item_name, item_id, keeper, chip_code, location, note`
- `chips`, `locations`: header row, then one value per row

## Modules

- **item**: item types, coercion of sheet cells, search matching
- **sheets**: backend trait, in-memory backend, A1 notation helpers
- **google**: Google Sheets backend
- **options**: option lists
- **store**: items store
- **sync**: save-all loop for grid edits
- **downloader**: CSV and XLSX export
- **config**: TOML/environment configuration
- **error**: error type
- **app**: routing and handlers

## REST API Endpoints

- `GET /api/items?q=` - Items matching a search term
- `POST /api/items` - Add an item from the form
- `POST /api/items/save` - Apply grid edits and deletions
- `GET|POST /api/options/{chips|locations}` - Read or extend a dropdown list
- `GET /api/export.csv`, `GET /api/export.xlsx` - Download the filtered table
*/

#[cfg(feature = "web")]
pub mod app;
pub mod config;
pub mod downloader;
pub mod error;
#[cfg(feature = "web")]
pub mod google;
pub mod item;
pub mod options;
pub mod sheets;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use item::{Item, ItemFields};
pub use options::{OptionCategory, OptionsStore};
pub use sheets::{MemorySheets, SheetBackend};
pub use store::ItemStore;
