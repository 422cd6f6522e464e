use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::debug;

use tally_core::order::partner_scoped_order_id;
use tally_core::source::OrderSource;
use tally_core::{BoxError, Order, OrderItem, PartnerGroup, VendorMapping};

/// Order source backed by the operational Postgres database.
pub struct PgOrderSource {
    pool: PgPool,
    /// Partner codes kept out of the vendor mapping (in-house partners
    /// that are never invoiced through accounting).
    excluded_codes: Vec<String>,
}

impl PgOrderSource {
    pub fn new(pool: PgPool, excluded_codes: Vec<String>) -> Self {
        Self {
            pool,
            excluded_codes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    purchase_order_number: String,
    remote_order_id: String,
    shipping_cost: Decimal,
    tracking_number: String,
    tracking_date: NaiveDate,
    city: String,
    zip: String,
    address: String,
    state: String,
    country: String,
    code: String,
    name: String,
    export_folder: String,
    format_name: String,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    sku: String,
    quantity: i32,
}

#[async_trait]
impl OrderSource for PgOrderSource {
    async fn fetch_invoiceable_orders(&self) -> Result<Vec<PartnerGroup>, BoxError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT
                po.id,
                po.purchase_order_number,
                po.remote_order_id,
                po.shipping_cost,
                po.tracking_number,
                po.tracking_date,
                po.city,
                po.zip,
                po.address,
                s.code AS state,
                c.two_letter_code AS country,
                p.code,
                p.name,
                p.export_folder,
                ff.name AS format_name
            FROM purchase_orders po
            JOIN partners p ON po.partner_id = p.id
            JOIN states s ON po.state_id = s.id
            JOIN countries c ON po.country_id = c.id
            JOIN partner_file_formats pff ON pff.partner_id = p.id
            JOIN file_formats ff ON ff.id = pff.format_id
            WHERE po.tracking_number IS NOT NULL
              AND ff.format_type = 'invoice'
              AND po.is_invoiced = FALSE
            ORDER BY po.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Fetched invoiceable orders");

        // Groups keep first-seen order; orders keep source order within
        // their group.
        let mut groups: Vec<PartnerGroup> = Vec::new();
        for row in rows {
            let items = self.fetch_order_items(row.id).await?;

            let order = Order {
                order_id: partner_scoped_order_id(&row.code, &row.purchase_order_number),
                purchase_order_number: row.purchase_order_number,
                remote_order_id: row.remote_order_id,
                items,
                subtotal: None,
                tax: None,
                shipping: row.shipping_cost.round_dp(2),
                partner_code: row.code.clone(),
                partner_name: row.name,
                tracking_number: row.tracking_number,
                ship_date: row.tracking_date,
                address: row.address,
                city: row.city,
                state: row.state,
                country: row.country,
                postal_code: row.zip,
            };

            match groups
                .iter()
                .position(|g| g.key() == (row.code.as_str(), row.export_folder.as_str()))
            {
                Some(idx) => groups[idx].orders.push(order),
                None => groups.push(PartnerGroup {
                    partner_code: row.code,
                    export_folder: row.export_folder,
                    format_name: row.format_name,
                    orders: vec![order],
                }),
            }
        }

        Ok(groups)
    }

    async fn fetch_csv_headers(&self) -> Result<HashMap<String, Vec<String>>, BoxError> {
        let rows = sqlx::query(
            r#"
            SELECT
                f.name AS format_name,
                STRING_AGG(fd.header_name, ', ' ORDER BY fd.position) AS header_names
            FROM file_formats f
            JOIN file_format_details fd ON fd.format_id = f.id
            WHERE f.format_type = 'invoice'
            GROUP BY f.name
            ORDER BY f.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut headers = HashMap::new();
        for row in rows {
            let format_name: String = row.try_get("format_name")?;
            let header_names: String = row.try_get("header_names")?;
            headers.insert(
                format_name,
                header_names.split(", ").map(str::to_string).collect(),
            );
        }

        Ok(headers)
    }

    async fn fetch_vendor_mapping(&self) -> Result<HashMap<String, VendorMapping>, BoxError> {
        let rows = sqlx::query(
            r#"
            SELECT name, ship_method, invoice_email, accounting_customer_id
            FROM partners
            WHERE code <> ALL($1)
            "#,
        )
        .bind(&self.excluded_codes)
        .fetch_all(&self.pool)
        .await?;

        let mut mapping = HashMap::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            mapping.insert(
                name,
                VendorMapping {
                    ship_method: row.try_get("ship_method")?,
                    email: row.try_get("invoice_email")?,
                    customer_id: row.try_get("accounting_customer_id")?,
                },
            );
        }

        Ok(mapping)
    }

    async fn persist_invoice_status(&self, invoiced: &[Order]) -> Result<(), BoxError> {
        let mut tx = self.pool.begin().await?;
        let invoiced_at = Utc::now();

        for order in invoiced {
            // Per-order subtotal is the sum of resolved line prices; the
            // remote grand total goes to the total column.
            let line_sum = order.lines_total().unwrap_or_default();

            sqlx::query(
                r#"
                UPDATE purchase_orders
                SET subtotal = $1,
                    shipping_cost = $2,
                    tax = $3,
                    total = $4,
                    is_invoiced = TRUE,
                    invoiced_date = $5
                WHERE purchase_order_number = $6
                "#,
            )
            .bind(line_sum)
            .bind(order.shipping)
            .bind(order.tax)
            .bind(order.subtotal)
            .bind(invoiced_at)
            .bind(&order.purchase_order_number)
            .execute(&mut *tx)
            .await?;

            for item in &order.items {
                sqlx::query(
                    r#"
                    UPDATE purchase_order_items
                    SET price = $1
                    WHERE purchase_order_id = (
                        SELECT id FROM purchase_orders WHERE purchase_order_number = $2
                    )
                    AND sku = $3
                    "#,
                )
                .bind(item.line_price())
                .bind(&order.purchase_order_number)
                .bind(&item.sku)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

impl PgOrderSource {
    async fn fetch_order_items(&self, order_pk: i64) -> Result<Vec<OrderItem>, BoxError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT poi.sku, poi.quantity
            FROM purchase_order_items poi
            WHERE poi.purchase_order_id = $1
            ORDER BY poi.id
            "#,
        )
        .bind(order_pk)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrderItem::new(r.sku, r.quantity))
            .collect())
    }
}
