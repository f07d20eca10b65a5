// Integration tests for the HTTP control API
//
// Requests go straight into the router with `oneshot`, no socket needed.

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::MockApiClient;
use listing_capture::api::MachineListing;
use listing_capture::device::{SyntheticDevices, SyntheticEncoderFactory};
use listing_capture::{
    create_router, spawn_session_reaper, AppState, CaptureOptions, UploadPaths,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(devices: Arc<SyntheticDevices>, api: MockApiClient) -> (Router, AppState) {
    let state = AppState::new(
        devices,
        Arc::new(SyntheticEncoderFactory::scripted(vec![
            vec![1; 10],
            vec![2; 20],
            vec![3; 15],
        ])),
        Arc::new(api),
        CaptureOptions::default(),
        UploadPaths::default(),
    );
    (create_router(state.clone()), state)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Ok((status, value))
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (router, _) = app(Arc::new(SyntheticDevices::front_and_back()), MockApiClient::signed_in());

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_record_accept_and_submit_flow() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    let (router, state) = app(devices.clone(), MockApiClient::signed_in());

    let (status, opened) = call(&router, "POST", "/capture/open", Some(json!({}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(opened["facing_mode"], "environment");
    assert_eq!(opened["preview"]["kind"], "live");
    let id = opened["session_id"].as_str().unwrap().to_string();

    let (status, started) = call(&router, "POST", &format!("/capture/{}/record/start", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["recorder"]["phase"], "recording");

    let (status, stopped) = call(&router, "POST", &format!("/capture/{}/record/stop", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["recorder"]["phase"], "stopped");
    assert_eq!(stopped["recorder"]["bytes"], 45);
    assert_eq!(stopped["preview"]["kind"], "playback");

    let (status, accepted) = call(&router, "POST", &format!("/capture/{}/accept", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["attachment"]["size_bytes"], 45);
    assert_eq!(accepted["attachment"]["mime_type"], "video/webm");
    assert_eq!(accepted["videos_attached"], 1);

    // The modal is gone and the camera released
    assert_eq!(devices.stats().live_tracks(), 0);
    assert!(state.sessions.read().await.is_empty());
    let (status, _) = call(&router, "GET", &format!("/capture/{}/status", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, videos) = call(&router, "GET", "/form/videos", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(videos.as_array().map(|v| v.len()), Some(1));

    let (status, submitted) = call(
        &router,
        "POST",
        "/form/submit",
        Some(json!({
            "machine_name": "Wire Drawing Line",
            "machine_type_id": "wire_drawing",
            "whatsapp_number": "+910000000000"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "created");
    assert_eq!(submitted["listing"]["video_urls"].as_array().map(|v| v.len()), Some(1));

    let (_, videos) = call(&router, "GET", "/form/videos", None).await?;
    assert_eq!(videos.as_array().map(|v| v.len()), Some(0));

    Ok(())
}

#[tokio::test]
async fn test_open_without_camera_returns_service_unavailable() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    devices.deny_permission(true);
    let (router, state) = app(devices, MockApiClient::signed_in());

    let (status, body) = call(&router, "POST", "/capture/open", None).await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("could not access camera"));
    assert!(state.sessions.read().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_accept_before_stop_keeps_session_open() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    let (router, _) = app(devices.clone(), MockApiClient::signed_in());

    let (_, opened) = call(&router, "POST", "/capture/open", None).await?;
    let id = opened["session_id"].as_str().unwrap().to_string();

    let (status, _) = call(&router, "POST", &format!("/capture/{}/accept", id), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, current) = call(&router, "GET", &format!("/capture/{}/status", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["recorder"]["phase"], "idle");
    assert!(devices.stats().live_tracks() > 0);

    Ok(())
}

#[tokio::test]
async fn test_switch_and_close_release_camera() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    let (router, _) = app(devices.clone(), MockApiClient::signed_in());

    let (_, opened) = call(&router, "POST", "/capture/open", Some(json!({ "facing_mode": "user" }))).await?;
    assert_eq!(opened["camera"], "user");
    let id = opened["session_id"].as_str().unwrap().to_string();

    let (status, switched) = call(&router, "POST", &format!("/capture/{}/switch", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(switched["facing_mode"], "environment");
    assert_eq!(devices.stats().peak_streams(), 1);

    call(&router, "POST", &format!("/capture/{}/record/start", id), None).await?;
    let (status, closed) = call(&router, "POST", &format!("/capture/{}/close", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");
    assert_eq!(devices.stats().live_tracks(), 0);

    let (status, _) = call(&router, "POST", &format!("/capture/{}/close", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_submit_upload_failure_returns_bad_gateway_and_keeps_videos() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    let (router, state) = app(devices, MockApiClient::failing_uploads_to("machines/videos"));

    {
        let mut form = state.sell_form.lock().await;
        form.videos.push(listing_capture::Attachment::new(
            "recorded-1.webm",
            "video/webm",
            vec![0; 45],
        ));
    }

    let (status, body) = call(
        &router,
        "POST",
        "/form/submit",
        Some(json!({ "machine_name": "Extruder", "machine_type_id": "extruder" })),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("recorded-1.webm"));

    let (_, videos) = call(&router, "GET", "/form/videos", None).await?;
    assert_eq!(videos.as_array().map(|v| v.len()), Some(1));

    Ok(())
}

#[tokio::test]
async fn test_machines_are_filtered_by_query() -> Result<()> {
    let api = MockApiClient {
        listings: vec![
            MachineListing {
                id: "1".to_string(),
                machine_name: Some("Extruder 90mm".to_string()),
                machine_type_id: Some("extruder".to_string()),
                ..Default::default()
            },
            MachineListing {
                id: "2".to_string(),
                machine_name: Some("Spark Tester".to_string()),
                machine_type_id: Some("testing".to_string()),
                ..Default::default()
            },
        ],
        ..MockApiClient::signed_in()
    };
    let (router, _) = app(Arc::new(SyntheticDevices::front_and_back()), api);

    let (status, all) = call(&router, "GET", "/machines/sell", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(|v| v.len()), Some(2));

    let (_, found) = call(&router, "GET", "/machines/buy?search=spark&category=all", None).await?;
    assert_eq!(found.as_array().map(|v| v.len()), Some(1));
    assert_eq!(found[0]["id"], "2");

    let (_, none) = call(&router, "GET", "/machines/sell?category=packaging", None).await?;
    assert_eq!(none.as_array().map(|v| v.len()), Some(0));

    Ok(())
}

#[tokio::test]
async fn test_status_collects_chunks_mid_recording() -> Result<()> {
    let (router, _) = app(Arc::new(SyntheticDevices::front_and_back()), MockApiClient::signed_in());

    let (_, opened) = call(&router, "POST", "/capture/open", None).await?;
    let id = opened["session_id"].as_str().unwrap().to_string();
    call(&router, "POST", &format!("/capture/{}/record/start", id), None).await?;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let (status, current) = call(&router, "GET", &format!("/capture/{}/status", id), None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["recorder"]["phase"], "recording");
    assert_eq!(current["recorder"]["chunks"], 3);
    assert_eq!(current["recorder"]["bytes"], 45);
    assert_eq!(current["preview"]["kind"], "live");

    Ok(())
}

#[tokio::test]
async fn test_abandoned_sessions_are_closed_when_idle() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    let (router, state) = app(devices.clone(), MockApiClient::signed_in());

    // Two pages open the modal and go away; both cameras are now held
    for _ in 0..2 {
        let (status, _) = call(&router, "POST", "/capture/open", None).await?;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = call(&router, "POST", "/capture/open", None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(state.close_idle_sessions(Duration::from_secs(60)).await, 0);
    assert_eq!(state.sessions.read().await.len(), 2);

    assert_eq!(state.close_idle_sessions(Duration::ZERO).await, 2);
    assert!(state.sessions.read().await.is_empty());
    assert_eq!(devices.stats().live_tracks(), 0);

    let (status, _) = call(&router, "POST", "/capture/open", None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_session_reaper_releases_camera() -> Result<()> {
    let devices = Arc::new(SyntheticDevices::front_and_back());
    let (router, state) = app(devices.clone(), MockApiClient::signed_in());

    let (_, opened) = call(&router, "POST", "/capture/open", None).await?;
    let id = opened["session_id"].as_str().unwrap().to_string();

    let reaper = spawn_session_reaper(state.clone(), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(300)).await;
    reaper.abort();

    assert!(state.sessions.read().await.is_empty());
    assert_eq!(devices.stats().live_tracks(), 0);

    let (status, _) = call(&router, "GET", &format!("/capture/{}/status", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
