//! Integration tests for the probe and metrics endpoints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use relay_test_utils::TestRelayServer;
use serde_json::Value;

#[tokio::test]
async fn test_health_returns_ok() -> Result<()> {
    let server = TestRelayServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_ready_reports_instance_and_depth() -> Result<()> {
    let server = TestRelayServer::spawn().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["relay_id"], "relay-test");
    assert_eq!(body["mailbox_depth"], 0);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_renders() -> Result<()> {
    let server = TestRelayServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_multiple_servers_bind_different_ports() -> Result<()> {
    let server1 = TestRelayServer::spawn().await?;
    let server2 = TestRelayServer::spawn().await?;

    assert_ne!(server1.addr(), server2.addr());

    let response1 = reqwest::get(format!("{}/health", server1.url())).await?;
    assert_eq!(response1.status(), 200);

    let response2 = reqwest::get(format!("{}/health", server2.url())).await?;
    assert_eq!(response2.status(), 200);

    Ok(())
}
