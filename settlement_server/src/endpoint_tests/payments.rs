use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::{json, Value};
use settlement_engine::{
    db_types::{OrderStatusType, PaymentStatus},
    events::EventProducers,
    PaymentFlowApi,
    SettlementError,
};
use sps_common::Vnd;

use super::{
    helpers::{gateway, send, signed_callback_query},
    mocks::{order, payment, stored_payment, MockBackend},
};
use crate::{
    config::ServerOptions,
    routes::{CreatePaymentRoute, PaymentsForOrderRoute, VnpayIpnRoute, VnpayReturnRoute},
};

const TXN_REF: &str = "VNP1T1717200000000000";

fn configure(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentFlowApi::new(backend, gateway(), EventProducers::default());
        cfg.service(CreatePaymentRoute::<MockBackend>::new())
            .service(VnpayReturnRoute::<MockBackend>::new())
            .service(VnpayIpnRoute::<MockBackend>::new())
            .service(PaymentsForOrderRoute::<MockBackend>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(ServerOptions { use_x_forwarded_for: true, use_forwarded: false }));
    }
}

#[actix_web::test]
async fn create_payment() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatusType::Pending))));
    backend
        .expect_insert_payment()
        .withf(|p| p.order_id == 1 && p.amount == Vnd::from(200_000) && p.user_id == Some(7) && p.txn_ref.starts_with("VNP1T"))
        .times(1)
        .returning(|p| Ok(stored_payment(p)));
    let req = TestRequest::post()
        .uri("/payments/create")
        .insert_header(("X-Forwarded-For", "203.0.113.7"))
        .set_json(json!({ "orderId": 1, "amount": 200000, "bankCode": "NCB" }));
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["orderId"], 1);
    let url = json["paymentUrl"].as_str().unwrap();
    assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
    assert!(url.contains("vnp_IpAddr=203.0.113.7"));
    assert!(url.contains("vnp_Amount=20000000"));
    assert!(url.contains("vnp_BankCode=NCB"));
}

#[actix_web::test]
async fn create_payment_for_missing_order() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(None));
    backend.expect_insert_payment().never();
    let req = TestRequest::post().uri("/payments/create").set_json(json!({ "orderId": 9, "amount": 1000 }));
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 9 does not exist"}"#);
}

#[actix_web::test]
async fn ipn_with_invalid_signature() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_for_callback().never();
    backend.expect_settle_payment().never();
    let uri = format!("/payments/vnpay-ipn?vnp_TxnRef={TXN_REF}&vnp_Amount=20000000&vnp_SecureHash=deadbeef");
    let (status, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"RspCode":"97","Message":"Invalid signature"}"#);
}

#[actix_web::test]
async fn ipn_settles_payment() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_payment_for_callback()
        .withf(|order_id, txn_ref| *order_id == 1 && txn_ref.as_deref() == Some(TXN_REF))
        .returning(|order_id, _| Ok(Some(payment(order_id, TXN_REF, PaymentStatus::Pending))));
    backend
        .expect_settle_payment()
        .withf(|id, status, patch| *id == 21 && *status == PaymentStatus::Success && patch["ipn"]["vnp_TxnRef"] == TXN_REF)
        .times(1)
        .returning(|_, status, _| Ok(Some(payment(1, TXN_REF, status))));
    let uri = format!("/payments/vnpay-ipn?{}", signed_callback_query(TXN_REF, Vnd::from(200_000), "00"));
    let (status, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"RspCode":"00","Message":"Confirmed"}"#);
}

#[actix_web::test]
async fn ipn_for_settled_payment() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_payment_for_callback()
        .returning(|order_id, _| Ok(Some(payment(order_id, TXN_REF, PaymentStatus::Success))));
    backend.expect_settle_payment().never();
    let uri = format!("/payments/vnpay-ipn?{}", signed_callback_query(TXN_REF, Vnd::from(200_000), "00"));
    let (_, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(body, r#"{"RspCode":"02","Message":"Order already confirmed"}"#);
}

#[actix_web::test]
async fn ipn_with_wrong_amount() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_payment_for_callback()
        .returning(|order_id, _| Ok(Some(payment(order_id, TXN_REF, PaymentStatus::Pending))));
    backend.expect_settle_payment().never();
    let uri = format!("/payments/vnpay-ipn?{}", signed_callback_query(TXN_REF, Vnd::from(1_000), "00"));
    let (_, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(body, r#"{"RspCode":"04","Message":"Invalid amount"}"#);
}

#[actix_web::test]
async fn ipn_when_store_fails() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_payment_for_callback()
        .returning(|_, _| Err(SettlementError::TransientError("database is locked".into())));
    let uri = format!("/payments/vnpay-ipn?{}", signed_callback_query(TXN_REF, Vnd::from(200_000), "00"));
    let (status, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"RspCode":"99","Message":"Unknown error"}"#);
}

#[actix_web::test]
async fn return_url_reports_outcome() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_payment_for_callback()
        .returning(|order_id, _| Ok(Some(payment(order_id, TXN_REF, PaymentStatus::Pending))));
    backend
        .expect_settle_payment()
        .withf(|_, status, patch| *status == PaymentStatus::Failed && patch.get("returnUrl").is_some())
        .returning(|_, status, _| Ok(Some(payment(1, TXN_REF, status))));
    let uri = format!("/payments/vnpay-return?{}", signed_callback_query(TXN_REF, Vnd::from(200_000), "24"));
    let (status, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["orderId"], 1);
    assert_eq!(json["outcome"], "settled");
    assert_eq!(json["status"], "failed");
}

#[actix_web::test]
async fn return_url_with_unknown_payment() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_for_callback().returning(|_, _| Ok(None));
    let uri = format!("/payments/vnpay-return?{}", signed_callback_query(TXN_REF, Vnd::from(200_000), "00"));
    let (status, body) = send(TestRequest::get().uri(&uri), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["outcome"], "paymentNotFound");
}

#[actix_web::test]
async fn payments_for_order() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatusType::Pending))));
    backend
        .expect_fetch_payments_for_order()
        .returning(|order_id| Ok(vec![payment(order_id, TXN_REF, PaymentStatus::Pending)]));
    let (status, body) = send(TestRequest::get().uri("/payments/order/1"), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[0]["txn_ref"], TXN_REF);
    assert_eq!(json[0]["status"], "pending");
}
