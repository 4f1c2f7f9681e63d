//! Sheets REST client against a mock API server

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use sheetwatch::config::LedgerConfig;
use sheetwatch::ledger::{NotificationLedger, SheetLedger};
use sheetwatch::models::AlertRecord;
use sheetwatch::provider::{GoogleSheetsClient, SourceHandle, TabularProvider};
use sheetwatch::Error;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SPREADSHEET: &str = "sheet-123";
const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> GoogleSheetsClient {
    GoogleSheetsClient::with_settings(
        &format!("{}/v4", server.uri()),
        SPREADSHEET,
        TOKEN,
        Duration::from_secs(5),
    )
    .unwrap()
}

async fn mount_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}")))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [
                { "properties": { "sheetId": 0, "title": "LINE" } },
                { "properties": { "sheetId": 7, "title": "Smartnews" } },
                { "properties": { "sheetId": 9, "title": "通知履歴" } },
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_open_source_resolves_sheet_id() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    let handle = client(&server).open_source("Smartnews").await.unwrap();

    assert_eq!(handle.title, "Smartnews");
    assert_eq!(handle.sheet_id, Some(7));
}

#[tokio::test]
async fn test_open_unknown_source_is_not_found() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    let result = client(&server).open_source("Yahoo").await;

    assert!(matches!(result, Err(Error::SourceNotFound(name)) if name == "Yahoo"));
}

#[tokio::test]
async fn test_list_source_names() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    let names = client(&server).list_source_names().await.unwrap();

    assert_eq!(names, vec!["LINE", "Smartnews", "通知履歴"]);
}

#[tokio::test]
async fn test_fetch_range_stringifies_cells() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/values/.*LINE.*B2:D10$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "LINE!B2:D10",
            "majorDimension": "ROWS",
            "values": [["450", "Story X"], [120, "Story Y"], []]
        })))
        .mount(&server)
        .await;

    let grid = client(&server)
        .fetch_range(&SourceHandle::new("LINE"), "B2:D10")
        .await
        .unwrap();

    assert_eq!(
        grid,
        vec![
            vec!["450".to_string(), "Story X".to_string()],
            vec!["120".to_string(), "Story Y".to_string()],
            vec![],
        ]
    );
}

#[tokio::test]
async fn test_fetch_range_without_values_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/values/.*A2:A10$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "LINE!A2:A10",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    let grid = client(&server)
        .fetch_range(&SourceHandle::new("LINE"), "A2:A10")
        .await
        .unwrap();

    assert!(grid.is_empty());
}

#[tokio::test]
async fn test_fetch_range_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/values/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_range(&SourceHandle::new("LINE"), "B2:D10")
        .await;

    match result {
        Err(Error::RangeFetch {
            source_name,
            range,
            reason,
        }) => {
            assert_eq!(source_name, "LINE");
            assert_eq!(range, "B2:D10");
            assert!(reason.contains("403"), "unexpected reason: {reason}");
        }
        other => panic!("expected RangeFetch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_append_row_posts_raw_values() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":append$"))
        .and(query_param("valueInputOption", "RAW"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_json(json!({
            "majorDimension": "ROWS",
            "values": [["r1", "LINE", "2024-05-01T09:00:00+00:00"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .append_row(
            &SourceHandle::new("通知履歴"),
            vec![
                "r1".to_string(),
                "LINE".to_string(),
                "2024-05-01T09:00:00+00:00".to_string(),
            ],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_append_row_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":append$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client(&server)
        .append_row(&SourceHandle::new("通知履歴"), vec!["r1".to_string()])
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_fetch_all_requests_title_without_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/values/[^/!]*LINE[^/!]*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["ID", "PV"], ["r1", "450"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grid = client(&server)
        .fetch_all(&SourceHandle::new("LINE"))
        .await
        .unwrap();

    assert_eq!(grid.len(), 2);
    assert_eq!(grid[1], vec!["r1", "450"]);
}

#[tokio::test]
async fn test_sheet_ledger_reads_narrow_history_worksheet() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    // A three-column worksheet rejects any range reaching past column C
    Mock::given(method("GET"))
        .and(path_regex(r"/values/[^!]*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [
                ["ID", "シート名", "通知日時"],
                ["r1", "LINE", "2024-05-01T09:00:00+00:00"]
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/values/.*!"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("Range exceeds grid limits"),
        )
        .mount(&server)
        .await;

    let ledger = SheetLedger::new(Arc::new(client(&server)), &LedgerConfig::default());
    let records = ledger.load_all().await.unwrap();

    assert_eq!(
        records,
        vec![AlertRecord::new(
            "LINE",
            "r1",
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        )]
    );
}
