use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use settlement_engine::{
    side_effects::{PushNotifier, PushTokenStore},
    SettlementError,
};

use super::helpers::send;
use crate::{
    push_transport::LoggingPushTransport,
    routes::{RegisterPushTokenRoute, RemovePushTokenRoute},
};

/// Users 1 and 2 exist. Nobody is an admin.
#[derive(Clone, Default)]
struct TokenTable {
    tokens: Arc<Mutex<HashMap<i64, Option<String>>>>,
}

impl TokenTable {
    fn new() -> Self {
        let tokens = HashMap::from([(1, None), (2, Some("old-device".to_string()))]);
        Self { tokens: Arc::new(Mutex::new(tokens)) }
    }

    fn token(&self, user_id: i64) -> Option<String> {
        self.tokens.lock().unwrap().get(&user_id).cloned().flatten()
    }
}

impl PushTokenStore for TokenTable {
    async fn push_token_for_user(&self, user_id: i64) -> Result<Option<String>, SettlementError> {
        Ok(self.token(user_id))
    }

    async fn admin_push_tokens(&self) -> Result<Vec<(i64, String)>, SettlementError> {
        Ok(vec![])
    }

    async fn set_push_token(&self, user_id: i64, token: Option<String>) -> Result<bool, SettlementError> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(&user_id) {
            Some(entry) => {
                *entry = token;
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

fn configure(table: TokenTable) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let notifier = PushNotifier::new(table, LoggingPushTransport, Duration::from_secs(60));
        cfg.service(RegisterPushTokenRoute::<TokenTable, LoggingPushTransport>::new())
            .service(RemovePushTokenRoute::<TokenTable, LoggingPushTransport>::new())
            .app_data(web::Data::new(notifier));
    }
}

#[actix_web::test]
async fn register_token() {
    let table = TokenTable::new();
    let req = TestRequest::put().uri("/users/1/push-token").set_json(json!({ "token": " new-device " }));
    let (status, body) = send(req, configure(table.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Push token saved"}"#);
    assert_eq!(table.token(1).as_deref(), Some("new-device"));
}

#[actix_web::test]
async fn register_token_for_unknown_user() {
    let req = TestRequest::put().uri("/users/9/push-token").set_json(json!({ "token": "new-device" }));
    let (status, body) = send(req, configure(TokenTable::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. User 9 does not exist"}"#);
}

#[actix_web::test]
async fn register_blank_token() {
    let table = TokenTable::new();
    let req = TestRequest::put().uri("/users/2/push-token").set_json(json!({ "token": "  " }));
    let (status, _) = send(req, configure(table.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(table.token(2).as_deref(), Some("old-device"));
}

#[actix_web::test]
async fn remove_token() {
    let table = TokenTable::new();
    let (status, body) = send(TestRequest::delete().uri("/users/2/push-token"), configure(table.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Push token removed"}"#);
    assert_eq!(table.token(2), None);
}
