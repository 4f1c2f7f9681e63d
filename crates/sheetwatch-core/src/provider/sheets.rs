//! Google Sheets v4 REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};

use super::{a1_notation, CellGrid, SourceHandle, TabularProvider};

/// Reads and appends worksheet cells through the Sheets REST API.
///
/// Every request carries a pre-issued OAuth bearer token; obtaining and
/// refreshing that token is left to whatever invokes the monitor.
pub struct GoogleSheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheetsClient {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id
            .as_deref()
            .ok_or_else(|| Error::config("missing required setting 'provider.spreadsheet_id'"))?;
        let access_token = config
            .access_token
            .as_deref()
            .ok_or_else(|| Error::config("missing required setting 'provider.access_token'"))?;

        Self::with_settings(&config.base_url, spreadsheet_id, access_token, config.timeout)
    }

    /// Create a client against an explicit API base URL
    pub fn with_settings(
        base_url: &str,
        spreadsheet_id: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid provider.base_url '{base_url}': {e}")))?;

        let client = Client::builder().timeout(timeout).build()?;

        info!(spreadsheet_id = %spreadsheet_id, "Created Sheets client");

        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("spreadsheets")
                .push(&self.spreadsheet_id)
                .extend(segments);
        }
        url
    }

    async fn sheet_properties(&self) -> Result<Vec<SheetProperties>> {
        let mut url = self.endpoint(&[]);
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");

        debug!(url = %url, "Fetching spreadsheet metadata");

        let metadata: SpreadsheetMetadata = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(metadata.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn get_values(&self, a1: &str) -> std::result::Result<CellGrid, String> {
        let url = self.endpoint(&["values", a1]);

        debug!(url = %url, "Fetching range");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let body: ValueRange = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

#[async_trait]
impl TabularProvider for GoogleSheetsClient {
    async fn open_source(&self, name: &str) -> Result<SourceHandle> {
        let properties = self.sheet_properties().await?;

        properties
            .into_iter()
            .find(|p| p.title == name)
            .map(|p| SourceHandle {
                title: p.title,
                sheet_id: Some(p.sheet_id),
            })
            .ok_or_else(|| Error::SourceNotFound(name.to_string()))
    }

    async fn fetch_range(&self, handle: &SourceHandle, range: &str) -> Result<CellGrid> {
        let a1 = a1_notation(&handle.title, Some(range));
        self.get_values(&a1)
            .await
            .map_err(|reason| Error::range_fetch(&handle.title, range, reason))
    }

    async fn fetch_all(&self, handle: &SourceHandle) -> Result<CellGrid> {
        let a1 = a1_notation(&handle.title, None);
        self.get_values(&a1)
            .await
            .map_err(|reason| Error::range_fetch(&handle.title, &a1, reason))
    }

    async fn append_row(&self, handle: &SourceHandle, row: Vec<String>) -> Result<()> {
        let a1 = a1_notation(&handle.title, None);
        let mut url = self.endpoint(&["values", &format!("{a1}:append")]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let payload = serde_json::json!({
            "majorDimension": "ROWS",
            "values": [row],
        });

        self.client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        debug!(sheet = %handle.title, "Appended row");
        Ok(())
    }

    async fn list_source_names(&self) -> Result<Vec<String>> {
        let properties = self.sheet_properties().await?;
        Ok(properties.into_iter().map(|p| p.title).collect())
    }
}

async fn check_status(response: Response) -> std::result::Result<Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(format!("Sheets API returned {status}: {body}"))
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}
