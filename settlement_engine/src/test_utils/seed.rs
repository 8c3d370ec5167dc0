//! Catalog, user and voucher fixtures for tests.
use chrono::{DateTime, Utc};
use sps_common::Vnd;

use crate::SqliteDatabase;

pub async fn seed_user(db: &SqliteDatabase, name: &str, is_admin: bool, push_token: Option<&str>) -> i64 {
    let role = if is_admin { "admin" } else { "customer" };
    sqlx::query_scalar::<_, i64>("INSERT INTO users (name, role, push_token) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(role)
        .bind(push_token)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding user")
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price: Vnd) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO products (name, price) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(price)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding product")
}

pub async fn set_product_price(db: &SqliteDatabase, product_id: i64, price: Vnd) {
    sqlx::query("UPDATE products SET price = $1 WHERE id = $2")
        .bind(price)
        .bind(product_id)
        .execute(db.pool())
        .await
        .expect("Error updating product price");
}

pub async fn seed_color(db: &SqliteDatabase, product_id: i64, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO product_colors (product_id, color_name) VALUES ($1, $2) RETURNING id")
        .bind(product_id)
        .bind(name)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding color")
}

pub async fn seed_size(db: &SqliteDatabase, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO sizes (size_name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding size")
}

pub async fn seed_voucher(
    db: &SqliteDatabase,
    code: &str,
    usage_limit: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO vouchers (code, usage_limit, start_date, end_date) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(code)
    .bind(usage_limit)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding voucher")
}

pub async fn voucher_used_count(db: &SqliteDatabase, voucher_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT used_count FROM vouchers WHERE id = $1")
        .bind(voucher_id)
        .fetch_one(db.pool())
        .await
        .expect("Error reading voucher")
}

pub async fn seed_cart_item(db: &SqliteDatabase, user_id: i64, product_id: i64, quantity: i64) {
    sqlx::query("INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(db.pool())
        .await
        .expect("Error seeding cart item");
}

pub async fn count_rows(db: &SqliteDatabase, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("Error counting rows")
}

/// A product with one color and one size. Returns `(product_id, color_id, size_id)`.
pub async fn seed_simple_product(db: &SqliteDatabase, name: &str, price: Vnd) -> (i64, i64, i64) {
    let product_id = seed_product(db, name, price).await;
    let color_id = seed_color(db, product_id, "Black").await;
    let size_id = seed_size(db, &format!("{name}-M")).await;
    (product_id, color_id, size_id)
}
