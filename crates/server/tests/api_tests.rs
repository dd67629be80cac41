//! HTTP surface tests against the in-process router.

mod common;

use axum::http::StatusCode;
use tokio_test::assert_ok;

use common::{fixtures, TestFixture};

// =============================================================================
// Basic endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_hides_paths() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["server"]["port"], 9090);
    assert_eq!(response.body["bid_store"]["backend"], "memory");
    assert_eq!(response.body["stream"]["source"], "stdin");
    assert_eq!(response.body["orchestrator"]["tick_interval_ms"], 30_000);
    assert!(response.body.get("database").is_none());
    assert!(response.body.get("pricing").is_none());
    assert!(!response.text.contains("bidpipe.db"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn test_status_before_any_tick() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/status").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["orchestrator"]["running"], false);
    assert_eq!(response.body["orchestrator"]["ticks_completed"], 0);
    assert!(response.body["orchestrator"]["last_tick"].is_null());
    assert_eq!(response.body["ingestion"]["state"], "running");
    assert_eq!(response.body["ingestion"]["stats"]["received"], 0);
}

#[tokio::test]
async fn test_status_reports_last_tick_and_ingestion_counts() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_campaigns(vec![
            fixtures::campaign("campaign-1", "google", 5.0),
            fixtures::campaign("campaign-2", "meta", 5.0),
        ])
        .await;

    let bid = fixtures::bid_at("campaign-1", "google", 3.0, 0.05, 0);
    fixture.ingest(&serde_json::to_vec(&bid).unwrap()).await;
    fixture.ingest(b"{not json").await;

    fixture.orchestrator.run_tick().await.unwrap();

    let response = fixture.get("/api/v1/status").await;
    let orchestrator = &response.body["orchestrator"];
    assert_eq!(orchestrator["ticks_completed"], 1);
    assert_eq!(orchestrator["last_tick"]["tick"], 1);
    assert_eq!(orchestrator["last_tick"]["campaigns"], 2);
    assert_eq!(orchestrator["last_tick"]["decisions_saved"], 2);
    assert!(orchestrator["last_tick_at"].is_string());

    let stats = &response.body["ingestion"]["stats"];
    assert_eq!(stats["received"], 2);
    assert_eq!(stats["processed"], 1);
    assert_eq!(stats["decode_errors"], 1);
}

#[tokio::test]
async fn test_status_after_ingestion_shutdown() {
    let fixture = TestFixture::new().await;
    fixture.shutdown();

    let mut state = String::new();
    for _ in 0..200 {
        let response = fixture.get("/api/v1/status").await;
        state = response.body["ingestion"]["state"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if state == "stopped" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(state, "stopped");
}

// =============================================================================
// Campaign bid window
// =============================================================================

#[tokio::test]
async fn test_bids_newest_first() {
    let fixture = TestFixture::new().await;
    for minute in 0..3 {
        fixture
            .put_bid(&fixtures::bid_at("campaign-1", "google", 1.0 + minute as f64, 0.05, minute))
            .await;
    }
    fixture
        .put_bid(&fixtures::bid_at("campaign-2", "google", 9.0, 0.05, 5))
        .await;

    let response = fixture.get("/api/v1/campaigns/campaign-1/bids").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["campaign_id"], "campaign-1");
    assert_eq!(response.body["count"], 3);

    let bids = response.body["bids"].as_array().unwrap();
    assert_eq!(bids[0]["current_cpc"], 3.0);
    assert_eq!(bids[2]["current_cpc"], 1.0);
    assert!(bids.iter().all(|b| b["campaign_id"] == "campaign-1"));
    assert!(bids[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_bids_limit() {
    let fixture = TestFixture::new().await;
    for minute in 0..5 {
        fixture
            .put_bid(&fixtures::bid_at("campaign-1", "meta", 1.0, 0.05, minute))
            .await;
    }

    let response = fixture
        .get("/api/v1/campaigns/campaign-1/bids?limit=2")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);
}

#[tokio::test]
async fn test_bids_unknown_campaign_is_empty() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/campaigns/ghost/bids").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 0);
    assert_eq!(response.body["bids"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_bids_invalid_limit_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .get("/api/v1/campaigns/campaign-1/bids?limit=lots")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Campaign decisions
// =============================================================================

#[tokio::test]
async fn test_decisions_after_tick() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_campaigns(vec![fixtures::campaign("campaign-1", "google", 5.0)])
        .await;
    fixture
        .put_bid(&fixtures::bid_at("campaign-1", "google", 3.0, 0.05, 0))
        .await;

    let report = assert_ok!(fixture.orchestrator.run_tick().await);
    assert!(report.is_clean());
    assert_eq!(report.bids_placed, 1);

    let response = fixture.get("/api/v1/campaigns/campaign-1/decisions").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);

    let decision = &response.body["decisions"][0];
    assert_eq!(decision["campaign_id"], "campaign-1");
    assert_eq!(decision["platform"], "google");
    assert!((decision["bid_amount"].as_f64().unwrap() - 3.6).abs() < 1e-9);
    assert_eq!(decision["should_bid"], true);
}

#[tokio::test]
async fn test_decisions_newest_first_with_limit() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_campaigns(vec![fixtures::campaign("campaign-1", "google", 1.0)])
        .await;

    // No bids: baseline 2.0 * 1.2, above max_cpc
    fixture.orchestrator.run_tick().await.unwrap();

    fixture
        .put_bid(&fixtures::bid_at("campaign-1", "google", 0.5, 0.05, 0))
        .await;
    fixture.orchestrator.run_tick().await.unwrap();

    let response = fixture
        .get("/api/v1/campaigns/campaign-1/decisions?limit=1")
        .await;
    assert_eq!(response.body["count"], 1);
    let newest = &response.body["decisions"][0];
    assert!((newest["bid_amount"].as_f64().unwrap() - 0.6).abs() < 1e-9);
    assert_eq!(newest["should_bid"], true);

    let response = fixture.get("/api/v1/campaigns/campaign-1/decisions").await;
    assert_eq!(response.body["count"], 2);
    let oldest = &response.body["decisions"][1];
    assert!((oldest["bid_amount"].as_f64().unwrap() - 2.4).abs() < 1e-9);
    assert_eq!(oldest["should_bid"], false);
}

#[tokio::test]
async fn test_decisions_unknown_campaign_is_empty() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/campaigns/ghost/decisions").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 0);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_exposition() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_campaigns(vec![fixtures::campaign("campaign-1", "google", 5.0)])
        .await;
    let bid = fixtures::bid_at("campaign-1", "google", 3.0, 0.05, 0);
    fixture.ingest(&serde_json::to_vec(&bid).unwrap()).await;
    fixture.orchestrator.run_tick().await.unwrap();

    // Generate a request so HTTP metrics have samples
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);

    let text = &response.text;
    assert!(text.contains("bidpipe_bids_processed_total 1"));
    assert!(text.contains("bidpipe_ticks_completed_total 1"));
    assert!(text.contains("bidpipe_active_campaigns 1"));
    assert!(text.contains("bidpipe_orchestrator_running 0"));
    assert!(text.contains("bidpipe_ingest_state 0"));
    assert!(text.contains("bidpipe_http_requests_total"));
    assert!(text.contains("path=\"/api/v1/health\""));
}

#[tokio::test]
async fn test_metrics_collapse_campaign_ids() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/campaigns/campaign-1/bids").await;
    fixture.get("/api/v1/campaigns/campaign-2/bids").await;

    let response = fixture.get("/metrics").await;
    assert!(response.text.contains("path=\"/api/v1/campaigns/:id/bids\""));
    assert!(!response.text.contains("campaign-1"));
}

#[tokio::test]
async fn test_orchestrator_running_gauge_follows_lifecycle() {
    let fixture = TestFixture::new().await;
    fixture.orchestrator.start().await;

    let response = fixture.get("/metrics").await;
    assert!(response.text.contains("bidpipe_orchestrator_running 1"));

    fixture.orchestrator.stop().await;
    let response = fixture.get("/metrics").await;
    assert!(response.text.contains("bidpipe_orchestrator_running 0"));
    assert_eq!(fixture.metrics.pipeline().ticks_completed(), 0);
}
