#![cfg(feature = "web")]
//! Google Sheets v4 backend.
//!
//! Only the value-range endpoints and `batchUpdate` are used. The caller
//! provides a ready bearer token; minting one from a service account is
//! left to whatever deploys the server.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sheets::{SheetBackend, a1_range, quote_sheet_name};

/// Client for one spreadsheet document
pub struct GoogleSheets {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct ValueRangeBody<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'a str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GoogleSheets {
    pub fn new(
        api_base: &str,
        spreadsheet_id: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(GoogleSheets {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Build a client from the `spreadsheet_id`, `access_token`, `api_base`
    /// and `timeout_secs` settings
    pub fn from_config(config: &Config) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id
            .as_deref()
            .ok_or_else(|| Error::Config("spreadsheet_id is not set".to_string()))?;
        let access_token = config
            .access_token
            .as_deref()
            .ok_or_else(|| Error::Config("access_token is not set".to_string()))?;
        Self::new(
            &config.api_base,
            spreadsheet_id,
            access_token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn document_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.api_base, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        values_url(&self.api_base, &self.spreadsheet_id, range)
    }

    /// Numeric id of a tab, needed by structural requests such as row deletion
    async fn sheet_id(&self, sheet: &str) -> Result<i64> {
        let url = format!("{}?fields=sheets.properties(sheetId,title)", self.document_url());
        let response = self.client.get(url).bearer_auth(&self.access_token).send().await?;
        let meta: SpreadsheetMeta = check(response).await?.json().await?;
        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == sheet)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))
    }
}

/// URL of the values endpoint for an A1 range
pub(crate) fn values_url(api_base: &str, spreadsheet_id: &str, range: &str) -> String {
    format!(
        "{}/spreadsheets/{}/values/{}",
        api_base.trim_end_matches('/'),
        spreadsheet_id,
        urlencoding::encode(range)
    )
}

/// Turn non-2xx responses into [`Error::Api`]
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn get_values(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&quote_sheet_name(sheet));
        debug!("GET {}", url);
        let response = self.client.get(url).bearer_auth(&self.access_token).send().await?;
        let range: ValueRange = check(response).await?.json().await?;
        Ok(range.values)
    }

    async fn append_row(&self, sheet: &str, values: Vec<String>) -> Result<()> {
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(&quote_sheet_name(sheet))
        );
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [values] }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn update_row(
        &self,
        sheet: &str,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<()> {
        let range = a1_range(sheet, row, first_col, values.len());
        let url = format!("{}?valueInputOption=RAW", self.values_url(&range));
        debug!("PUT {}", url);
        let body = ValueRangeBody {
            range: &range,
            major_dimension: "ROWS",
            values: vec![values],
        };
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> Result<()> {
        if row == 0 {
            return Err(Error::Malformed("row numbers start at 1".to_string()));
        }
        let sheet_id = self.sheet_id(sheet).await?;
        let url = format!("{}:batchUpdate", self.document_url());
        debug!("POST {} (delete row {} of {})", url, row, sheet);
        let request = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row,
                    }
                }
            }]
        });
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn col_values(&self, sheet: &str, col: usize) -> Result<Vec<String>> {
        if col == 0 {
            return Err(Error::Malformed("column numbers start at 1".to_string()));
        }
        let url = format!(
            "{}?majorDimension=COLUMNS",
            self.values_url(&crate::sheets::a1_column(sheet, col))
        );
        debug!("GET {}", url);
        let response = self.client.get(url).bearer_auth(&self.access_token).send().await?;
        let range: ValueRange = check(response).await?.json().await?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::to_bytes;
    use axum::extract::Request;
    use axum::http::{StatusCode, header};
    use axum::response::Json;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// A request as seen by the local stand-in for the Sheets API
    #[derive(Debug, Clone)]
    struct Seen {
        method: String,
        path: String,
        query: String,
        auth: String,
        body: Value,
    }

    type Reply = fn(&str, &str) -> (StatusCode, Value);

    /// Serve `reply` on a free local port and return a client pointed at it
    /// plus the log of requests it received
    async fn stub(reply: Reply) -> (GoogleSheets, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let app = Router::new().fallback(move |request: Request| {
            let log = log.clone();
            async move {
                let method = request.method().to_string();
                let path = urlencoding::decode(request.uri().path()).unwrap().into_owned();
                let query = urlencoding::decode(request.uri().query().unwrap_or(""))
                    .unwrap()
                    .into_owned();
                let auth = request
                    .headers()
                    .get(header::AUTHORIZATION)
                    .map(|v| v.to_str().unwrap().to_string())
                    .unwrap_or_default();
                let bytes = to_bytes(request.into_body(), usize::MAX).await.unwrap();
                let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
                let (status, response) = reply(&method, &path);
                log.lock().unwrap().push(Seen {
                    method,
                    path,
                    query,
                    auth,
                    body,
                });
                (status, Json(response))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GoogleSheets::new(
            &format!("http://{}/", addr),
            "doc1",
            "secret-token",
            Duration::from_secs(5),
        )
        .unwrap();
        (client, seen)
    }

    fn ok_empty(_: &str, _: &str) -> (StatusCode, Value) {
        (StatusCode::OK, json!({}))
    }

    fn two_tabs(method: &str, _: &str) -> (StatusCode, Value) {
        if method == "GET" {
            (
                StatusCode::OK,
                json!({ "sheets": [
                    { "properties": { "sheetId": 0, "title": "items" } },
                    { "properties": { "sheetId": 912, "title": "chips" } },
                ]}),
            )
        } else {
            (StatusCode::OK, json!({ "replies": [{}] }))
        }
    }

    fn forbidden(_: &str, _: &str) -> (StatusCode, Value) {
        (
            StatusCode::FORBIDDEN,
            json!({ "error": {
                "code": 403,
                "message": "The caller does not have permission",
                "status": "PERMISSION_DENIED",
            }}),
        )
    }

    #[tokio::test]
    async fn reads_rows_with_bearer_token() {
        fn rows(_: &str, _: &str) -> (StatusCode, Value) {
            (
                StatusCode::OK,
                json!({ "range": "'items'!A1:H3", "values": [["id", "date"], ["1", "2024-01-01"]] }),
            )
        }
        let (client, seen) = stub(rows).await;

        let values = client.get_values("items").await.unwrap();

        assert_eq!(values, vec![vec!["id", "date"], vec!["1", "2024-01-01"]]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].path, "/spreadsheets/doc1/values/'items'");
        assert_eq!(seen[0].auth, "Bearer secret-token");
    }

    #[tokio::test]
    async fn append_inserts_raw_rows() {
        let (client, seen) = stub(ok_empty).await;

        client
            .append_row("items", vec!["1718000000".into(), "2024-05-20".into(), "Stream 4K".into()])
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/spreadsheets/doc1/values/'items':append");
        assert_eq!(seen[0].query, "valueInputOption=RAW&insertDataOption=INSERT_ROWS");
        assert_eq!(seen[0].body, json!({ "values": [["1718000000", "2024-05-20", "Stream 4K"]] }));
    }

    #[tokio::test]
    async fn update_puts_one_row_range() {
        let (client, seen) = stub(ok_empty).await;
        let cells: Vec<String> = ["2024-05-20", "Box", "VEWD-1", "Ann", "S905X4", "Lab A", ""]
            .iter()
            .map(|c| c.to_string())
            .collect();

        client.update_row("items", 5, 2, cells.clone()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, "PUT");
        assert_eq!(seen[0].path, "/spreadsheets/doc1/values/'items'!B5:H5");
        assert_eq!(seen[0].query, "valueInputOption=RAW");
        assert_eq!(
            seen[0].body,
            json!({ "range": "'items'!B5:H5", "majorDimension": "ROWS", "values": [cells] })
        );
    }

    #[tokio::test]
    async fn delete_resolves_tab_id_then_drops_one_row() {
        let (client, seen) = stub(two_tabs).await;

        client.delete_row("chips", 3).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].path, "/spreadsheets/doc1");
        assert_eq!(seen[0].query, "fields=sheets.properties(sheetId,title)");
        assert_eq!(seen[1].method, "POST");
        assert_eq!(seen[1].path, "/spreadsheets/doc1:batchUpdate");
        assert_eq!(
            seen[1].body,
            json!({ "requests": [{ "deleteDimension": { "range": {
                "sheetId": 912,
                "dimension": "ROWS",
                "startIndex": 2,
                "endIndex": 3,
            }}}]})
        );
    }

    #[tokio::test]
    async fn delete_on_unknown_tab_sends_nothing() {
        let (client, seen) = stub(two_tabs).await;

        let err = client.delete_row("locations", 2).await.unwrap_err();

        assert!(matches!(err, Error::SheetNotFound(name) if name == "locations"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_body_becomes_api_error() {
        let (client, _) = stub(forbidden).await;

        let err = client.get_values("items").await.unwrap_err();

        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "The caller does not have permission");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            client.append_row("items", vec!["1".into()]).await,
            Err(Error::Api { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn column_read_uses_column_major_range() {
        fn column(_: &str, _: &str) -> (StatusCode, Value) {
            (
                StatusCode::OK,
                json!({ "majorDimension": "COLUMNS", "values": [["chip_code", "BCM7271"]] }),
            )
        }
        let (client, seen) = stub(column).await;

        assert_eq!(client.col_values("chips", 1).await.unwrap(), vec!["chip_code", "BCM7271"]);
        assert!(matches!(client.col_values("chips", 0).await, Err(Error::Malformed(_))));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/spreadsheets/doc1/values/'chips'!A:A");
        assert_eq!(seen[0].query, "majorDimension=COLUMNS");
    }

    #[test]
    fn values_url_encodes_range() {
        assert_eq!(
            values_url("https://sheets.googleapis.com/v4/", "abc123", "'items'!B5:H5"),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/%27items%27%21B5%3AH5"
        );
    }

    #[test]
    fn value_range_without_values_is_empty() {
        let range: ValueRange =
            serde_json::from_str(r#"{"range": "'chips'!A1:Z1000", "majorDimension": "ROWS"}"#)
                .unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn sheet_metadata_parses() {
        let meta: SpreadsheetMeta = serde_json::from_str(
            r#"{"sheets": [{"properties": {"sheetId": 0, "title": "items"}},
                           {"properties": {"sheetId": 912, "title": "chips"}}]}"#,
        )
        .unwrap();
        assert_eq!(meta.sheets[1].properties.sheet_id, 912);
        assert_eq!(meta.sheets[1].properties.title, "chips");
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = Config::default();
        assert!(matches!(GoogleSheets::from_config(&config), Err(Error::Config(_))));
    }
}
