use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Product, SizeVariant, VariantRef},
    errors::SettlementError,
};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, SettlementError> {
    let product = sqlx::query_as::<_, Product>("SELECT id, name, price FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

pub async fn fetch_variant(
    product_id: i64,
    color_id: i64,
    size_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<SizeVariant>, SettlementError> {
    let variant = sqlx::query_as::<_, SizeVariant>(
        r#"
            SELECT id, product_id, product_color_id, size_id, created_at
            FROM product_variants
            WHERE product_id = $1 AND product_color_id = $2 AND size_id = $3
        "#,
    )
    .bind(product_id)
    .bind(color_id)
    .bind(size_id)
    .fetch_optional(conn)
    .await?;
    Ok(variant)
}

async fn color_belongs_to_product(
    product_id: i64,
    color_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SettlementError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM product_colors WHERE id = $1 AND product_id = $2")
        .bind(color_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

async fn size_exists(size_id: i64, conn: &mut SqliteConnection) -> Result<bool, SettlementError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM sizes WHERE id = $1")
        .bind(size_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Resolves a (product, color, size) selection to its size variant, creating the variant the first time the
/// combination is ordered, and returns it with the product's current unit price.
///
/// Two callers racing to create the same variant both end up with the same row: the insert is a no-op on conflict and
/// the loser reads the winner's row back.
pub async fn resolve_variant(
    product_id: i64,
    color_id: i64,
    size_id: i64,
    conn: &mut SqliteConnection,
) -> Result<VariantRef, SettlementError> {
    let product = fetch_product(product_id, conn).await?.ok_or(SettlementError::ProductNotFound(product_id))?;
    let to_ref = |variant: SizeVariant| VariantRef {
        variant_id: variant.id,
        product_id: variant.product_id,
        unit_price: product.price,
    };
    if let Some(variant) = fetch_variant(product_id, color_id, size_id, conn).await? {
        trace!("🗃️ Variant #{} found for product {product_id}, color {color_id}, size {size_id}", variant.id);
        return Ok(to_ref(variant));
    }
    if !color_belongs_to_product(product_id, color_id, conn).await? {
        return Err(SettlementError::InvalidColorForProduct { product_id, color_id });
    }
    if !size_exists(size_id, conn).await? {
        return Err(SettlementError::InvalidSize(size_id));
    }
    let inserted = sqlx::query_as::<_, SizeVariant>(
        r#"
            INSERT INTO product_variants (product_id, product_color_id, size_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, product_color_id, size_id) DO NOTHING
            RETURNING id, product_id, product_color_id, size_id, created_at;
        "#,
    )
    .bind(product_id)
    .bind(color_id)
    .bind(size_id)
    .fetch_optional(&mut *conn)
    .await;
    let variant = match inserted {
        Ok(Some(variant)) => {
            debug!("🗃️ Created variant #{} for product {product_id}, color {color_id}, size {size_id}", variant.id);
            variant
        },
        Ok(None) => refetch_variant(product_id, color_id, size_id, conn).await?,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            refetch_variant(product_id, color_id, size_id, conn).await?
        },
        Err(e) => return Err(e.into()),
    };
    Ok(to_ref(variant))
}

async fn refetch_variant(
    product_id: i64,
    color_id: i64,
    size_id: i64,
    conn: &mut SqliteConnection,
) -> Result<SizeVariant, SettlementError> {
    trace!("🗃️ Variant for product {product_id}, color {color_id}, size {size_id} was created concurrently");
    fetch_variant(product_id, color_id, size_id, conn).await?.ok_or_else(|| {
        SettlementError::IntegrityError(format!(
            "Variant for product {product_id}, color {color_id}, size {size_id} vanished after a conflicting insert"
        ))
    })
}
