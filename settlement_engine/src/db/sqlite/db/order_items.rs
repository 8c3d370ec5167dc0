use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{OrderItem, VariantRef},
    errors::SettlementError,
};

/// A resolved line, ready to be stored. The unit price is the snapshot taken during variant resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedLine {
    pub variant: VariantRef,
    pub quantity: i64,
}

pub async fn insert_items(
    order_id: i64,
    lines: &[ResolvedLine],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, SettlementError> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("INSERT INTO order_items (order_id, product_id, variant_id, quantity, price) ");
    builder.push_values(lines, |mut row, line| {
        row.push_bind(order_id)
            .push_bind(line.variant.product_id)
            .push_bind(line.variant.variant_id)
            .push_bind(line.quantity)
            .push_bind(line.variant.unit_price);
    });
    builder.push(" RETURNING id, order_id, product_id, variant_id, quantity, price");
    let mut items = builder.build_query_as::<OrderItem>().fetch_all(conn).await?;
    items.sort_by_key(|item| item.id);
    Ok(items)
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, SettlementError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, variant_id, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}
