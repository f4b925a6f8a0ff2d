//! キャプチャログ参照APIの統合テスト

use httplog::config::CaptureConfig;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::support::app::spawn_test_app;

async fn get_json(client: &Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn paginates_captured_exchanges_newest_first() {
    let app = spawn_test_app(CaptureConfig::default()).await;
    let client = Client::new();

    for id in 1..=25 {
        let res = client
            .get(app.server.url(&format!("/orders/{}", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    app.flush().await;

    let (status, page) = get_json(
        &client,
        app.server.url("/api/capture-logs?page=2&size=10"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 10);
    assert_eq!(page["pagination"]["currentPage"], 2);
    assert_eq!(page["pagination"]["totalItems"], 25);
    assert_eq!(page["pagination"]["totalPages"], 3);
    assert_eq!(page["pagination"]["hasPreviousPage"], true);
    assert_eq!(page["pagination"]["hasNextPage"], true);

    let (_, last) = get_json(
        &client,
        app.server.url("/api/capture-logs?page=3&size=10"),
    )
    .await;
    let data = last["data"].as_array().unwrap();
    assert_eq!(data.len(), 5);
    assert_eq!(last["pagination"]["hasNextPage"], false);
    // 最初のリクエストが最後のページの末尾に来る
    assert_eq!(data[4]["requestPath"], "/orders/1");

    app.server.stop().await;
}

#[tokio::test]
async fn rejects_invalid_pagination() {
    let app = spawn_test_app(CaptureConfig::default()).await;
    let client = Client::new();

    let (status, body) = get_json(&client, app.server.url("/api/capture-logs?page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");

    let (status, _) = get_json(&client, app.server.url("/api/capture-logs?size=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // OFFSETがi64に収まらない組み合わせも400で拒否される
    let (status, body) = get_json(
        &client,
        app.server.url("/api/capture-logs?page=4294967295&size=4294967295"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");

    app.server.stop().await;
}

#[tokio::test]
async fn date_filter_limits_results() {
    let app = spawn_test_app(CaptureConfig::default()).await;
    let client = Client::new();

    client.get(app.server.url("/orders/1")).send().await.unwrap();
    app.flush().await;

    let today = chrono::Utc::now().date_naive();
    let (status, page) = get_json(
        &client,
        app.server.url(&format!(
            "/api/capture-logs?from_date={}&to_date={}",
            today, today
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["totalItems"], 1);

    let (_, page) = get_json(
        &client,
        app.server.url("/api/capture-logs?to_date=2000-01-01"),
    )
    .await;
    assert_eq!(page["pagination"]["totalItems"], 0);
    assert_eq!(page["pagination"]["totalPages"], 0);

    app.server.stop().await;
}

#[tokio::test]
async fn get_and_delete_by_id() {
    let app = spawn_test_app(CaptureConfig::default()).await;
    let client = Client::new();

    client.get(app.server.url("/orders/1")).send().await.unwrap();
    client.get(app.server.url("/orders/2")).send().await.unwrap();
    app.flush().await;

    let (_, page) = get_json(&client, app.server.url("/api/capture-logs")).await;
    let id = page["data"][0]["id"].as_i64().unwrap();

    let (status, record) =
        get_json(&client, app.server.url(&format!("/api/capture-logs/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["requestPath"], "/orders/2");

    let res = client
        .delete(app.server.url("/api/capture-logs/999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Not found");

    let res = client
        .delete(app.server.url(&format!("/api/capture-logs/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) =
        get_json(&client, app.server.url(&format!("/api/capture-logs/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = get_json(&client, app.server.url("/api/capture-logs")).await;
    assert_eq!(page["pagination"]["totalItems"], 1);
    assert_eq!(page["data"][0]["requestPath"], "/orders/1");

    app.server.stop().await;
}
