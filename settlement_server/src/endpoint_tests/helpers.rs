use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use settlement_engine::gateway::{
    canonical_query,
    GatewayEnvironment,
    GatewayParams,
    SignatureCodec,
    VnPayConfig,
    VnPayGateway,
    SECURE_HASH,
};
use sps_common::{Secret, Vnd};

use crate::server::{json_config, path_config, query_config};

pub const HASH_SECRET: &str = "ENDPOINTSECRET0123456789";

/// Sends the request to an app built by `configure` and returns the status and body.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init();
    let app = App::new()
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::call_service(&service, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub fn gateway() -> VnPayGateway {
    VnPayGateway::new(VnPayConfig {
        tmn_code: "TESTCODE".into(),
        hash_secret: Secret::new(HASH_SECRET.to_string()),
        return_url: "https://shop.example/payment/return".into(),
        environment: GatewayEnvironment::Production,
        ..Default::default()
    })
}

/// The query string of a gateway callback for `txn_ref`, signed with the test secret.
pub fn signed_callback_query(txn_ref: &str, amount: Vnd, response_code: &str) -> String {
    let mut params = GatewayParams::new();
    params.insert("vnp_TmnCode".into(), "TESTCODE".into());
    params.insert("vnp_TxnRef".into(), txn_ref.into());
    params.insert("vnp_Amount".into(), amount.gateway_amount().unwrap().to_string());
    params.insert("vnp_OrderInfo".into(), "Thanh toan don hang #1".into());
    params.insert("vnp_ResponseCode".into(), response_code.into());
    params.insert("vnp_TransactionNo".into(), "14422574".into());
    let hash = SignatureCodec::new(Secret::new(HASH_SECRET.to_string())).sign(&params).unwrap();
    format!("{}&{SECURE_HASH}={hash}", canonical_query(&params))
}
