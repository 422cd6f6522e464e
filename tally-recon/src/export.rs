//! Export assembly: shapes classified orders into the partner's tabular
//! layout.
//!
//! Rows are append-only; a table is assembled over the run and serialized
//! once. A population failure leaves the table untouched so the
//! orchestrator can compensate without emitting a partial order.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tally_core::{CoreError, CoreResult, Order};

const DATE_FORMAT: &str = "%Y/%m/%d";

/// One partner's export rows, columns fixed by the registered format.
#[derive(Debug, Clone)]
pub struct ExportTable {
    format_name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn new(format_name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            format_name: format_name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Projects named fields onto the header order. Every field must have
    /// a column; columns without a field stay blank.
    fn project(&self, fields: &[(&str, String)]) -> CoreResult<Vec<String>> {
        let mut row = vec![String::new(); self.headers.len()];
        for (name, value) in fields {
            let idx = self
                .headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| {
                    CoreError::SchemaMismatch(format!(
                        "format '{}' has no column '{name}'",
                        self.format_name
                    ))
                })?;
            row[idx] = value.clone();
        }
        Ok(row)
    }
}

/// Shared labels for the line-item-expanded layout.
#[derive(Debug, Clone)]
pub struct LineItemLabels {
    pub customer: String,
    pub carrier: String,
}

pub struct ExportAssembler {
    labels: LineItemLabels,
}

impl ExportAssembler {
    pub fn new(labels: LineItemLabels) -> Self {
        Self { labels }
    }

    /// Appends this order's rows to the partner table. All-or-nothing: on
    /// error no row is added and the caller must compensate the invoice.
    pub fn populate(&self, table: &mut ExportTable, order: &Order) -> CoreResult<()> {
        let rows = match table.format_name() {
            "default" => self.generic_rows(table, order)?,
            "aag" => self.line_item_rows(table, order)?,
            other => return Err(CoreError::UnknownFormat(other.to_string())),
        };
        table.rows.extend(rows);
        Ok(())
    }

    /// Generic layout: one row per order with aggregate invoice fields.
    /// The line-item columns carry the last item processed, a
    /// compatibility quirk partner importers rely on today.
    fn generic_rows(&self, table: &ExportTable, order: &Order) -> CoreResult<Vec<Vec<String>>> {
        let not_enriched = || CoreError::NotEnriched(order.order_id.clone());
        let subtotal = order.subtotal.ok_or_else(not_enriched)?;
        let tax = order.tax.ok_or_else(not_enriched)?;
        let last_item = order.items.last().ok_or_else(not_enriched)?;
        let unit_cost = last_item.unit_cost.ok_or_else(not_enriched)?;

        let row = table.project(&[
            ("po_number", order.purchase_order_number.clone()),
            ("invoice_number", order.order_id.clone()),
            ("invoice_date", fmt_date(order.ship_date)),
            ("invoice_total_amount", subtotal.to_string()),
            ("invoice_subtotal_amount", (subtotal - tax).round_dp(2).to_string()),
            ("invoice_tax_amount", tax.to_string()),
            ("line_item_sku", last_item.sku.clone()),
            ("line_item_quantity", last_item.quantity.to_string()),
            ("line_item_unit_cost", unit_cost.to_string()),
        ])?;
        Ok(vec![row])
    }

    /// Line-item-expanded layout: one row per item plus synthetic tax and
    /// shipping rows, each carrying the shared order-level fields.
    fn line_item_rows(&self, table: &ExportTable, order: &Order) -> CoreResult<Vec<Vec<String>>> {
        let not_enriched = || CoreError::NotEnriched(order.order_id.clone());
        let tax = order.tax.ok_or_else(not_enriched)?;

        let shared = |item: &str, qty: i32, price: Decimal| {
            vec![
                ("Invoice Number", order.order_id.clone()),
                ("SONumber", order.purchase_order_number.clone()),
                ("Date", fmt_date(order.ship_date)),
                ("Customer", self.labels.customer.clone()),
                ("CarrierName", self.labels.carrier.clone()),
                ("TrackingNumber", order.tracking_number.clone()),
                ("item", item.to_string()),
                ("qty", qty.to_string()),
                ("price", price.to_string()),
            ]
        };

        let mut rows = Vec::with_capacity(order.items.len() + 2);
        for item in &order.items {
            let price = item.line_price().ok_or_else(not_enriched)?;
            rows.push(table.project(&shared(&item.sku, item.quantity, price))?);
        }
        rows.push(table.project(&shared("Taxes", 1, tax))?);
        rows.push(table.project(&shared("SHIPPING", 1, order.shipping))?);
        Ok(rows)
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
