#![allow(dead_code)]
use log::*;
use settlement_engine::{
    gateway::{GatewayEnvironment, GatewayParams, SignatureCodec, VnPayConfig, VnPayGateway, SECURE_HASH},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::seed_simple_product,
    },
    SqliteDatabase,
};
use sps_common::{Secret, Vnd};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const HASH_SECRET: &str = "TESTSECRET0123456789";

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await
}

pub async fn tear_down(db: SqliteDatabase) {
    db.close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Could not drop test database {}: {e}", db.url());
    }
}

/// One sellable product: (product_id, color_id, size_id).
pub async fn product(db: &SqliteDatabase, name: &str, price: i64) -> (i64, i64, i64) {
    seed_simple_product(db, name, Vnd::from(price)).await
}

pub fn gateway_config() -> VnPayConfig {
    VnPayConfig {
        tmn_code: "TESTCODE".into(),
        hash_secret: Secret::new(HASH_SECRET.to_string()),
        return_url: "https://shop.example/payment/return".into(),
        environment: GatewayEnvironment::Production,
        ..Default::default()
    }
}

pub fn gateway() -> VnPayGateway {
    VnPayGateway::new(gateway_config())
}

/// A callback as the gateway would send it for `txn_ref`, signed with the shared secret.
pub fn signed_callback(txn_ref: &str, amount: Vnd, response_code: &str) -> GatewayParams {
    let mut params = GatewayParams::new();
    params.insert("vnp_TmnCode".into(), "TESTCODE".into());
    params.insert("vnp_TxnRef".into(), txn_ref.into());
    params.insert("vnp_Amount".into(), amount.gateway_amount().unwrap().to_string());
    params.insert("vnp_OrderInfo".into(), "Thanh toan don hang".into());
    params.insert("vnp_ResponseCode".into(), response_code.into());
    params.insert("vnp_TransactionNo".into(), "14422574".into());
    params.insert("vnp_BankCode".into(), "NCB".into());
    params.insert("vnp_PayDate".into(), "20240601093500".into());
    sign(&mut params);
    params
}

/// Replaces the signature of `params` with a fresh, valid one.
pub fn sign(params: &mut GatewayParams) {
    let codec = SignatureCodec::new(Secret::new(HASH_SECRET.to_string()));
    let hash = codec.sign(params).expect("Error signing callback");
    params.insert(SECURE_HASH.into(), hash);
}
