use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use settlement_engine::{
    db_types::{OrderStatusChange, OrderStatusType},
    events::EventProducers,
    order_objects::{OrderPage, SortOrder},
    OrderFlowApi,
    SettlementError,
};

use super::{
    helpers::send,
    mocks::{order, order_with_items, MockBackend},
};
use crate::routes::{AvailableVouchersRoute, CreateOrderRoute, OrderByIdRoute, SearchOrdersRoute, UpdateOrderStatusRoute};

fn configure(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(backend, EventProducers::default());
        cfg.service(CreateOrderRoute::<MockBackend>::new())
            .service(SearchOrdersRoute::<MockBackend>::new())
            .service(OrderByIdRoute::<MockBackend>::new())
            .service(UpdateOrderStatusRoute::<MockBackend>::new())
            .service(AvailableVouchersRoute::<MockBackend>::new())
            .app_data(web::Data::new(api));
    }
}

fn new_order_body() -> serde_json::Value {
    json!({
        "user_id": 7,
        "name": "Lan",
        "phone": "0901234567",
        "total": 200000,
        "items": [{ "product_id": 3, "color_id": 4, "size_id": 5, "quantity": 2 }]
    })
}

#[actix_web::test]
async fn create_order() {
    let mut backend = MockBackend::new();
    backend
        .expect_insert_order()
        .withf(|o| o.total.value() == 200_000 && o.items.len() == 1 && o.user_id == Some(7))
        .times(1)
        .returning(|_| Ok(order_with_items(1)));
    let req = TestRequest::post().uri("/orders").set_json(new_order_body());
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["items"][0]["price"], 100_000);
}

#[actix_web::test]
async fn create_order_without_items() {
    let mut backend = MockBackend::new();
    backend.expect_insert_order().never();
    let mut body = new_order_body();
    body["items"] = json!([]);
    let (status, body) = send(TestRequest::post().uri("/orders").set_json(body), configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. An order must contain at least one item"}"#);
}

#[actix_web::test]
async fn create_order_with_malformed_body() {
    let mut backend = MockBackend::new();
    backend.expect_insert_order().never();
    let req = TestRequest::post().uri("/orders").insert_header(("content-type", "application/json")).set_payload("{");
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"#), "was: {body}");
}

#[actix_web::test]
async fn create_order_with_exhausted_voucher() {
    let mut backend = MockBackend::new();
    backend.expect_insert_order().returning(|_| Err(SettlementError::VoucherInvalid(3)));
    let (status, body) = send(TestRequest::post().uri("/orders").set_json(new_order_body()), configure(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Voucher is invalid or exhausted"}"#);
}

#[actix_web::test]
async fn busy_store_is_reported_without_details() {
    let mut backend = MockBackend::new();
    backend.expect_insert_order().returning(|_| Err(SettlementError::TransientError("database is locked".into())));
    let (status, body) = send(TestRequest::post().uri("/orders").set_json(new_order_body()), configure(backend)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.contains("locked"), "was: {body}");
}

#[actix_web::test]
async fn create_order_for_unknown_user() {
    let mut backend = MockBackend::new();
    backend.expect_insert_order().returning(|_| Err(SettlementError::UserNotFound(9999)));
    let (status, body) = send(TestRequest::post().uri("/orders").set_json(new_order_body()), configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("User 9999 does not exist"), "was: {body}");
}

#[actix_web::test]
async fn constraint_failures_are_reported_without_details() {
    let mut backend = MockBackend::new();
    backend
        .expect_insert_order()
        .returning(|_| Err(SettlementError::IntegrityError("FOREIGN KEY constraint failed".into())));
    let (status, body) = send(TestRequest::post().uri("/orders").set_json(new_order_body()), configure(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!body.contains("FOREIGN KEY"), "was: {body}");
}

#[actix_web::test]
async fn fetch_order() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().withf(|id| *id == 1).returning(|id| Ok(Some(order(id, OrderStatusType::Pending))));
    backend.expect_fetch_order_items().returning(|id| Ok(order_with_items(id).items));
    let (status, body) = send(TestRequest::get().uri("/orders/1"), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(None));
    backend.expect_fetch_order_items().never();
    let (status, body) = send(TestRequest::get().uri("/orders/9"), configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 9 does not exist"}"#);
}

#[actix_web::test]
async fn fetch_order_with_bad_id() {
    let backend = MockBackend::new();
    let (status, _) = send(TestRequest::get().uri("/orders/abc"), configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn update_status() {
    let mut backend = MockBackend::new();
    backend
        .expect_update_order_status()
        .withf(|id, status| *id == 1 && *status == OrderStatusType::Processing)
        .returning(|id, status| Ok(OrderStatusChange { old_status: OrderStatusType::Pending, order: order(id, status) }));
    let req = TestRequest::patch().uri("/orders/1/status").set_json(json!({ "status": "processing" }));
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["old_status"], "pending");
    assert_eq!(json["order"]["status"], "processing");
}

#[actix_web::test]
async fn illegal_status_change() {
    let mut backend = MockBackend::new();
    backend.expect_update_order_status().returning(|id, to| {
        Err(SettlementError::OrderModificationForbidden { id, from: OrderStatusType::Completed, to })
    });
    let req = TestRequest::patch().uri("/orders/1/status").set_json(json!({ "status": "pending" }));
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order 1 cannot move from 'completed' to 'pending'"}"#);
}

#[actix_web::test]
async fn unknown_status_is_rejected() {
    let mut backend = MockBackend::new();
    backend.expect_update_order_status().never();
    let req = TestRequest::patch().uri("/orders/1/status").set_json(json!({ "status": "shipped" }));
    let (status, _) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn search_orders() {
    let mut backend = MockBackend::new();
    backend
        .expect_search_orders()
        .withf(|filter, pagination| {
            filter.status == Some(OrderStatusType::Pending) &&
                filter.search.as_deref() == Some("Lan") &&
                pagination.page == 2 &&
                pagination.limit == 5 &&
                pagination.sort == SortOrder::Asc
        })
        .returning(|_, _| {
            Ok(OrderPage {
                total_items: 6,
                total_pages: 2,
                current_page: 2,
                items_per_page: 5,
                orders: vec![order(6, OrderStatusType::Pending)],
            })
        });
    let req = TestRequest::get().uri("/orders?status=pending&search=Lan&page=2&limit=5&sort=ASC");
    let (status, body) = send(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total_items"], 6);
    assert_eq!(json["orders"][0]["id"], 6);
}

#[actix_web::test]
async fn search_orders_with_bad_page() {
    let mut backend = MockBackend::new();
    backend.expect_search_orders().never();
    let (status, body) = send(TestRequest::get().uri("/orders?page=0"), configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. Pages are numbered from 1"}"#);
}

#[actix_web::test]
async fn available_vouchers() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_available_vouchers().times(1).returning(|_| Ok(vec![]));
    let (status, body) = send(TestRequest::get().uri("/vouchers/available"), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}
