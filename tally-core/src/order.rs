use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single purchased line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub quantity: i32,
    /// Resolved by the enrichment stage from the order-management system;
    /// `None` until then.
    pub unit_cost: Option<Decimal>,
}

impl OrderItem {
    pub fn new(sku: impl Into<String>, quantity: i32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            unit_cost: None,
        }
    }

    /// Extended price for this line, once the unit cost is known.
    pub fn line_price(&self) -> Option<Decimal> {
        self.unit_cost.map(|c| c * Decimal::from(self.quantity))
    }
}

/// The unit of work: one shipped purchase order awaiting invoicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Partner-prefixed business key; doubles as the invoice doc number.
    pub order_id: String,
    pub purchase_order_number: String,
    /// Key into the order-management system.
    pub remote_order_id: String,
    pub items: Vec<OrderItem>,
    /// Unknown until enrichment assigns the remote grand total.
    pub subtotal: Option<Decimal>,
    /// Unknown until enrichment assigns the remote tax total.
    pub tax: Option<Decimal>,
    /// Known from the order source.
    pub shipping: Decimal,
    pub partner_code: String,
    pub partner_name: String,
    pub tracking_number: String,
    pub ship_date: NaiveDate,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

impl Order {
    /// An order is invoiceable only when every financial field is known.
    /// Partial enrichment is not a valid terminal state.
    pub fn is_enriched(&self) -> bool {
        self.subtotal.is_some()
            && self.tax.is_some()
            && !self.items.is_empty()
            && self.items.iter().all(|i| i.unit_cost.is_some())
    }

    /// Sum of resolved line prices; `None` until fully enriched.
    pub fn lines_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .map(OrderItem::line_price)
            .sum::<Option<Decimal>>()
    }
}

/// Builds the partner-prefixed invoice key. PO numbers that already carry
/// the partner code are used as-is.
pub fn partner_scoped_order_id(partner_code: &str, po_number: &str) -> String {
    if po_number.starts_with(partner_code) {
        po_number.to_string()
    } else {
        format!("{partner_code}{po_number}")
    }
}

/// Orders sharing a trading partner and export destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerGroup {
    pub partner_code: String,
    /// Destination folder on the transfer channel.
    pub export_folder: String,
    /// Selects the export schema for this partner.
    pub format_name: String,
    pub orders: Vec<Order>,
}

impl PartnerGroup {
    pub fn key(&self) -> (&str, &str) {
        (&self.partner_code, &self.export_folder)
    }
}

/// Per-partner accounting references and defaults, looked up by partner
/// display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorMapping {
    pub ship_method: String,
    pub email: String,
    pub customer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_order() -> Order {
        Order {
            order_id: "ACME1001".to_string(),
            purchase_order_number: "1001".to_string(),
            remote_order_id: "900001".to_string(),
            items: vec![OrderItem::new("SKU1", 2)],
            subtotal: None,
            tax: None,
            shipping: dec!(4.99),
            partner_code: "ACME".to_string(),
            partner_name: "Acme Outfitters".to_string(),
            tracking_number: "1Z999".to_string(),
            ship_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            country: "US".to_string(),
            postal_code: "62701".to_string(),
        }
    }

    #[test]
    fn order_without_financials_is_not_enriched() {
        let order = test_order();
        assert!(!order.is_enriched());
        assert_eq!(order.lines_total(), None);
    }

    #[test]
    fn order_with_all_fields_resolved_is_enriched() {
        let mut order = test_order();
        order.subtotal = Some(dec!(25.00));
        order.tax = Some(dec!(5.00));
        order.items[0].unit_cost = Some(dec!(10.00));
        assert!(order.is_enriched());
        assert_eq!(order.lines_total(), Some(dec!(20.00)));
    }

    #[test]
    fn one_unresolved_item_keeps_order_unenriched() {
        let mut order = test_order();
        order.subtotal = Some(dec!(25.00));
        order.tax = Some(dec!(5.00));
        order.items.push(OrderItem::new("SKU2", 1));
        order.items[0].unit_cost = Some(dec!(10.00));
        assert!(!order.is_enriched());
    }

    #[test]
    fn order_id_gets_partner_prefix_once() {
        assert_eq!(partner_scoped_order_id("ACME", "1001"), "ACME1001");
        assert_eq!(partner_scoped_order_id("ACME", "ACME1001"), "ACME1001");
    }
}
