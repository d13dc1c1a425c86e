use std::sync::Arc;
use std::time::Duration;

use erp_relay::RelayError;
use erp_relay::bridge::{BridgeState, create_router};
use erp_relay::config::Secret;
use erp_relay::connector::run_on_fresh_connection;
use erp_relay::test_utils::{MockBehavior, MockConnector, make_rows};
use erp_relay::types::ScalarValue;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn one_row() -> Vec<erp_relay::ErpRow> {
    make_rows(&["N"], vec![vec![ScalarValue::Int(1)]])
}

#[tokio::test]
async fn success_opens_and_closes_once() -> Result<(), RelayError> {
    let connector = MockConnector::returning(one_row());
    let rows = run_on_fresh_connection(&connector, "SELECT 1 AS N FROM RDB$DATABASE", &[]).await?;
    assert_eq!(rows.len(), 1);

    let counters = connector.counters();
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.closed(), 1);
    assert_eq!(counters.dropped_unclosed(), 0);
    Ok(())
}

#[tokio::test]
async fn query_failure_still_closes() {
    let connector = MockConnector::new(MockBehavior::QueryFails("syntax error".into()));
    let err = run_on_fresh_connection(&connector, "SELEC 1", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Driver(ref m) if m == "syntax error"));

    let counters = connector.counters();
    assert_eq!((counters.opened(), counters.closed()), (1, 1));
}

#[tokio::test]
async fn close_failure_does_not_mask_rows() -> Result<(), RelayError> {
    let connector = MockConnector::new(MockBehavior::CloseFails(one_row()));
    let rows = run_on_fresh_connection(&connector, "SELECT 1", &[]).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(connector.counters().closed(), 1);
    Ok(())
}

#[tokio::test]
async fn connect_failure_opens_nothing() {
    let connector = MockConnector::new(MockBehavior::ConnectFails("login failed".into()));
    assert!(run_on_fresh_connection(&connector, "SELECT 1", &[]).await.is_err());
    let counters = connector.counters();
    assert_eq!((counters.opened(), counters.closed()), (0, 0));
}

#[tokio::test]
async fn cancelled_query_releases_through_drop() {
    let connector = MockConnector::returning(one_row()).with_delay(Duration::from_secs(5));
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        run_on_fresh_connection(&connector, "SELECT 1", &[]),
    )
    .await;
    assert!(outcome.is_err());

    let counters = connector.counters();
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.closed(), 0);
    assert_eq!(counters.dropped_unclosed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_their_own_connections() {
    let connector = MockConnector::returning(one_row()).with_delay(Duration::from_millis(20));
    let router = create_router(Arc::new(BridgeState::new(
        Secret::new("abc123"),
        Arc::new(connector.clone()),
    )));

    let mut handles = Vec::new();
    for i in 0..16 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let body = serde_json::json!({"sqlQuery": "SELECT ? AS N", "params": [i]});
            let request = Request::builder()
                .method("POST")
                .uri("/query-erp")
                .header("content-type", "application/json")
                .header("x-bridge-secret", "abc123")
                .body(Body::from(body.to_string()))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let counters = connector.counters();
    assert_eq!(counters.opened(), 16);
    assert_eq!(counters.closed(), 16);
    assert_eq!(counters.queries(), 16);

    let mut seen: Vec<i64> = connector
        .seen_queries()
        .into_iter()
        .filter_map(|(_, params)| params[0].as_int())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..16).collect::<Vec<_>>());
}
