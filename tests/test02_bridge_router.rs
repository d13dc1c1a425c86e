use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use erp_relay::bridge::{BridgeState, ErrorBody, create_router};
use erp_relay::config::Secret;
use erp_relay::results::ErpRow;
use erp_relay::test_utils::{MockBehavior, MockConnector, make_rows};
use erp_relay::types::ScalarValue;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "abc123";

fn router_with(connector: &MockConnector) -> Router {
    create_router(Arc::new(BridgeState::new(
        Secret::new(SECRET),
        Arc::new(connector.clone()),
    )))
}

fn post(secret: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/query-erp")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-bridge-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn email_rows() -> Vec<ErpRow> {
    make_rows(
        &["EMAIL"],
        vec![
            vec!["ana@example.com".into()],
            vec!["compras@example.com".into()],
        ],
    )
}

#[tokio::test]
async fn wrong_secret_is_forbidden_and_never_connects() {
    let connector = MockConnector::returning(email_rows());
    let (status, body) = send(
        router_with(&connector),
        post(Some("wrong-secret"), json!({"sqlQuery": "SELECT 1", "params": []})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"message": "Unauthorized access."}));
    assert_eq!(connector.counters().opened(), 0);
}

#[tokio::test]
async fn missing_secret_is_forbidden_even_with_a_broken_body() {
    let connector = MockConnector::returning(email_rows());
    let request = Request::builder()
        .method("POST")
        .uri("/query-erp")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(router_with(&connector), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(connector.counters().opened(), 0);
}

#[tokio::test]
async fn empty_query_is_a_bad_request() {
    let connector = MockConnector::returning(email_rows());
    let (status, body) = send(
        router_with(&connector),
        post(Some(SECRET), json!({"sqlQuery": "", "params": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "sqlQuery is required.");
    assert_eq!(connector.counters().opened(), 0);
}

#[tokio::test]
async fn malformed_envelope_is_a_bad_request() {
    let connector = MockConnector::returning(email_rows());
    for body in [
        json!({"params": []}),
        json!({"sqlQuery": "SELECT ?", "params": [[1, 2]]}),
        json!({"sqlQuery": "SELECT ?", "params": [{"a": 1}]}),
    ] {
        let (status, _) = send(router_with(&connector), post(Some(SECRET), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(connector.counters().opened(), 0);
}

#[tokio::test]
async fn parameter_count_mismatch_is_a_bad_request() {
    let connector = MockConnector::returning(email_rows());
    for params in [json!([]), json!([1, 2])] {
        let (status, body) = send(
            router_with(&connector),
            post(
                Some(SECRET),
                json!({"sqlQuery": "SELECT EMAIL FROM CLIENTES_EMAIL WHERE CLI_CODIGO = ?", "params": params}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("placeholder"));
    }
    assert_eq!(connector.counters().opened(), 0);
}

#[tokio::test]
async fn rows_come_back_in_column_order() {
    let rows = make_rows(
        &["CLI_CODIGO", "CLI_NOME", "ATIVO"],
        vec![vec![
            ScalarValue::Int(42),
            "ANA".into(),
            ScalarValue::Bool(true),
        ]],
    );
    let connector = MockConnector::returning(rows);
    let response = router_with(&connector)
        .oneshot(post(
            Some(SECRET),
            json!({"sqlQuery": "SELECT * FROM CLIENTES WHERE CLI_CODIGO = ?", "params": [42]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        r#"[{"CLI_CODIGO":42,"CLI_NOME":"ANA","ATIVO":true}]"#
    );

    let seen = connector.seen_queries();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, vec![ScalarValue::Int(42)]);
    let counters = connector.counters();
    assert_eq!((counters.opened(), counters.closed()), (1, 1));
}

#[tokio::test]
async fn empty_result_is_an_empty_array() {
    let connector = MockConnector::returning(Vec::new());
    let (status, body) = send(
        router_with(&connector),
        post(Some(SECRET), json!({"sqlQuery": "SELECT 1 FROM RDB$DATABASE WHERE 1 = 0"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn driver_failure_is_a_server_error_with_details() {
    let connector = MockConnector::new(MockBehavior::QueryFails(
        "Table unknown CLIENTES_EMAILX".to_string(),
    ));
    let (status, body) = send(
        router_with(&connector),
        post(Some(SECRET), json!({"sqlQuery": "SELECT * FROM CLIENTES_EMAILX", "params": []})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = serde_json::from_value(body).unwrap();
    assert_eq!(body.message, "ERP bridge query failed.");
    assert_eq!(body.details.as_deref(), Some("Table unknown CLIENTES_EMAILX"));
    let counters = connector.counters();
    assert_eq!((counters.opened(), counters.closed()), (1, 1));
}

#[tokio::test]
async fn connect_failure_is_a_server_error() {
    let connector = MockConnector::new(MockBehavior::ConnectFails("host unreachable".into()));
    let (status, body) = send(
        router_with(&connector),
        post(Some(SECRET), json!({"sqlQuery": "SELECT 1", "params": []})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], "host unreachable");
}

#[tokio::test]
async fn health_needs_no_secret() {
    let connector = MockConnector::returning(Vec::new());
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router_with(&connector), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "mock");
}

#[tokio::test]
async fn slow_erp_is_cut_off_at_the_query_timeout() {
    let connector = MockConnector::returning(email_rows()).with_delay(Duration::from_secs(3));
    let router = create_router(Arc::new(
        BridgeState::new(Secret::new(SECRET), Arc::new(connector.clone()))
            .with_query_timeout(Duration::from_millis(200)),
    ));

    let started = Instant::now();
    let (status, body) = send(
        router,
        post(Some(SECRET), json!({"sqlQuery": "SELECT EMAIL FROM CLIENTES_EMAIL", "params": []})),
    )
    .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "ERP bridge query failed.");
    assert!(body["details"].as_str().unwrap().contains("Timed out"));
    let counters = connector.counters();
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.dropped_unclosed(), 1);
}

#[tokio::test]
async fn repeated_column_names_stay_distinct_on_the_wire() {
    let rows = make_rows(
        &["CLI_CODIGO", "NOME", "NOME"],
        vec![vec![ScalarValue::Int(42), "ANA".into(), "LOJA CENTRO".into()]],
    );
    let connector = MockConnector::returning(rows);
    let (status, body) = send(
        router_with(&connector),
        post(
            Some(SECRET),
            json!({"sqlQuery": "SELECT c.CLI_CODIGO, c.NOME, l.NOME FROM CLIENTES c JOIN LOJAS l ON 1 = 1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"CLI_CODIGO": 42, "NOME": "ANA", "NOME_2": "LOJA CENTRO"}])
    );
}
