use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;
use vinti4_gateway::config::GatewayConfig;
use vinti4_gateway::services::InMemoryOutcomeRecorder;
use vinti4_gateway::vinti4::fingerprint::success_fingerprint;
use vinti4_gateway::vinti4::{TransactionResponse, Vinti4Gateway};
use vinti4_gateway::{create_app, AppState};

const POS_AUTH_CODE: &str = "123456789A";

fn gateway_config() -> GatewayConfig {
    GatewayConfig::new(
        "90051",
        POS_AUTH_CODE,
        "https://mc.vinti4net.cv/BizMPIOnUs/CardPayment",
        "https://tickets.example.cv/payments/callback",
    )
    .unwrap()
}

fn app_with(config: GatewayConfig) -> axum::Router {
    create_app(AppState {
        gateway: Vinti4Gateway::new(config),
        recorder: Arc::new(InMemoryOutcomeRecorder::new()),
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signed_callback_form() -> String {
    let mut response = TransactionResponse {
        message_type: Some("8".into()),
        clearing_period: Some("2031".into()),
        transaction_id: Some("987654".into()),
        merchant_ref: Some("R20250101100000".into()),
        merchant_session: Some("S20250101100000".into()),
        amount: Some("1000.00".into()),
        message_id: Some("4521".into()),
        pan: Some("4*********1234".into()),
        merchant_resp: Some("C".into()),
        timestamp: Some("2025-01-01 10:01:10".into()),
        ..Default::default()
    };
    let fingerprint = success_fingerprint(POS_AUTH_CODE, &response);
    response.result_fingerprint = Some(fingerprint);

    let value = serde_json::to_value(&response).unwrap();
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in value.as_object().unwrap() {
        if let Some(text) = value.as_str() {
            form.append_pair(key, text);
        }
    }
    form.finish()
}

fn callback_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/payments/callback")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_status_api_not_configured() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["status_api"], "not_configured");
}

#[tokio::test]
async fn test_checkout_returns_auto_submit_form() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(json_request(
            "/payments/checkout",
            serde_json::json!({ "amount": "1500.00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("https://mc.vinti4net.cv/BizMPIOnUs/CardPayment"));
    assert!(html.contains("name=\"transactionCode\" value=\"1\""));
    assert!(html.contains("name=\"amount\" value=\"1500.00\""));
    assert!(html.contains("name=\"fingerprint\""));
}

#[tokio::test]
async fn test_checkout_rejects_invalid_amount() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(json_request(
            "/payments/checkout",
            serde_json::json!({ "amount": "0" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_checkout_service_payment_requires_entity() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(json_request(
            "/payments/checkout",
            serde_json::json!({ "amount": "250", "operation": "service" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_records_once_and_flags_redelivery() {
    let app = app_with(gateway_config());

    let first = app
        .clone()
        .oneshot(callback_request(signed_callback_form()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(first).await).unwrap();
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["operation"], "payment");
    assert_eq!(json["record"], "recorded");
    assert_eq!(json["merchant_ref"], "R20250101100000");

    let second = app
        .oneshot(callback_request(signed_callback_form()))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(second).await).unwrap();
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["record"], "duplicate");
}

#[tokio::test]
async fn test_callback_with_tampered_amount_is_not_recorded() {
    let app = app_with(gateway_config());
    let tampered = signed_callback_form().replace("1000.00", "1.00");

    let response = app.oneshot(callback_request(tampered)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["outcome"], "fingerprint_invalid");
    assert_eq!(json["record"], "ignored");
}

#[tokio::test]
async fn test_signed_callback_without_references_is_rejected() {
    let app = app_with(gateway_config());
    let mut bare = TransactionResponse {
        message_type: Some("8".into()),
        merchant_resp: Some("C".into()),
        ..Default::default()
    };
    bare.result_fingerprint = Some(success_fingerprint(POS_AUTH_CODE, &bare));
    let body = format!(
        "messageType=8&merchantResp=C&resultFingerPrint={}",
        url::form_urlencoded::byte_serialize(bare.result_fingerprint.unwrap().as_bytes())
            .collect::<String>()
    );

    let response = app.oneshot(callback_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["outcome"], "fingerprint_invalid");
    assert_eq!(json["record"], "ignored");
}

#[tokio::test]
async fn test_callback_user_cancelled() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(callback_request(
            "UserCancelled=true&merchantRespMerchantRef=R20250101100000".to_string(),
        ))
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["outcome"], "user_cancelled");
    assert_eq!(json["record"], "ignored");
}

#[tokio::test]
async fn test_status_without_endpoint_is_unavailable() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(json_request(
            "/payments/status",
            serde_json::json!({ "merchant_ref": "R20250101100000" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_status_rejects_blank_reference() {
    let app = app_with(gateway_config());

    let response = app
        .oneshot(json_request(
            "/payments/status",
            serde_json::json!({ "merchant_ref": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_proxies_gateway_answer() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"result":true,"msg":"ok","transactionSuccess":false,"transactionStatusDescription":"Pendente"}"#,
        )
        .create_async()
        .await;

    let config = gateway_config()
        .with_status_endpoint(&format!("{}/status", server.url()), "portal", "secret")
        .unwrap();
    let app = app_with(config);

    let response = app
        .oneshot(json_request(
            "/payments/status",
            serde_json::json!({ "merchant_ref": "R20250101100000" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["transactionSuccess"], false);
    assert_eq!(json["transactionStatusDescription"], "Pendente");
}

#[tokio::test]
async fn test_status_upstream_failure_is_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/status")
        .with_status(500)
        .create_async()
        .await;

    let config = gateway_config()
        .with_status_endpoint(&format!("{}/status", server.url()), "portal", "secret")
        .unwrap();
    let app = app_with(config);

    let response = app
        .oneshot(json_request(
            "/payments/status",
            serde_json::json!({ "merchant_ref": "R20250101100000" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
