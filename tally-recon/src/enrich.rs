//! Enrichment stage: resolves authoritative pricing for every order from
//! the order-management system.
//!
//! The stage is all-or-nothing per order: one unmatched SKU drops the
//! whole order, never a single line. Failures are non-fatal to the run;
//! each dropped order produces one notification and processing continues.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use tally_core::notify::Notifier;
use tally_core::ordermgmt::OrderManagementClient;
use tally_core::{Order, OrderItem, PartnerGroup};

pub struct EnrichmentStage {
    client: Arc<dyn OrderManagementClient>,
    notifier: Arc<dyn Notifier>,
}

impl EnrichmentStage {
    pub fn new(client: Arc<dyn OrderManagementClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// Produces a new grouped structure with financials populated, fully
    /// unresolvable orders removed, and emptied partner groups pruned.
    pub async fn enrich(&self, groups: Vec<PartnerGroup>) -> Vec<PartnerGroup> {
        let mut enriched = Vec::with_capacity(groups.len());

        for group in groups {
            let PartnerGroup {
                partner_code,
                export_folder,
                format_name,
                orders,
            } = group;

            let mut kept = Vec::with_capacity(orders.len());
            for order in orders {
                if let Some(order) = self.enrich_order(order).await {
                    kept.push(order);
                }
            }

            if kept.is_empty() {
                info!(partner = %partner_code, "No orders left after enrichment; pruning group");
            } else {
                enriched.push(PartnerGroup {
                    partner_code,
                    export_folder,
                    format_name,
                    orders: kept,
                });
            }
        }

        enriched
    }

    /// `None` means the order was excluded; a notification has already
    /// been sent.
    async fn enrich_order(&self, mut order: Order) -> Option<Order> {
        let remote = match self.client.get_order(&order.remote_order_id).await {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                warn!(po = %order.purchase_order_number, "Order not found in order-management system");
                self.notifier
                    .notify(
                        &format!(
                            "Order {} not found in the order-management system",
                            order.purchase_order_number
                        ),
                        &format!(
                            "The API was not able to retrieve {} using remote order id {}. \
                             No invoice was created.",
                            order.purchase_order_number, order.remote_order_id
                        ),
                    )
                    .await;
                return None;
            }
            Err(err) => {
                warn!(po = %order.purchase_order_number, %err, "Order lookup failed");
                self.notifier
                    .notify(
                        &format!(
                            "Unable to get price data for order {}",
                            order.purchase_order_number
                        ),
                        &format!("No invoice was created.\nError: {err}"),
                    )
                    .await;
                return None;
            }
        };

        order.tax = Some(remote.totals.tax);
        order.subtotal = Some(remote.totals.grand_total);

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let unit_cost = remote.find_line(&item.sku).and_then(|line| {
                line.line_total.checked_div(Decimal::from(item.quantity))
            });

            match unit_cost {
                Some(cost) => items.push(OrderItem {
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                    unit_cost: Some(cost),
                }),
                None => {
                    warn!(sku = %item.sku, po = %order.purchase_order_number, "SKU not priceable");
                    self.notifier
                        .notify(
                            &format!(
                                "Item {} on order {} was not found in the order-management system",
                                item.sku, order.purchase_order_number
                            ),
                            "There is a mismatch between the SKUs the order has in the \
                             database and the ones the order-management system reports. \
                             No invoice was created.",
                        )
                        .await;
                    return None;
                }
            }
        }

        order.items = items;
        Some(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockOrderApi, RecordingNotifier};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_core::ordermgmt::{RemoteLine, RemoteOrder, RemoteTotals};

    fn order(po: &str, remote_id: &str, items: Vec<OrderItem>) -> Order {
        Order {
            order_id: format!("ACME{po}"),
            purchase_order_number: po.to_string(),
            remote_order_id: remote_id.to_string(),
            items,
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

    fn group(orders: Vec<Order>) -> PartnerGroup {
        PartnerGroup {
            partner_code: "ACME".to_string(),
            export_folder: "acme_drop".to_string(),
            format_name: "default".to_string(),
            orders,
        }
    }

    fn remote(tax: Decimal, grand_total: Decimal, lines: Vec<(&str, Decimal)>) -> RemoteOrder {
        RemoteOrder {
            totals: RemoteTotals { tax, grand_total },
            items: lines
                .into_iter()
                .map(|(sku, line_total)| RemoteLine {
                    sku: sku.to_string(),
                    line_total,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn resolves_unit_cost_and_order_totals() {
        let api = Arc::new(MockOrderApi::default());
        api.insert("900001", remote(dec!(5), dec!(25), vec![("SKU1", dec!(20))]));
        let notifier = Arc::new(RecordingNotifier::default());
        let stage = EnrichmentStage::new(api, notifier.clone());

        let groups = stage
            .enrich(vec![group(vec![order(
                "A1001",
                "900001",
                vec![OrderItem::new("SKU1", 2)],
            )])])
            .await;

        let enriched = &groups[0].orders[0];
        assert_eq!(enriched.tax, Some(dec!(5)));
        assert_eq!(enriched.subtotal, Some(dec!(25)));
        assert_eq!(enriched.items[0].unit_cost, Some(dec!(10)));
        assert!(enriched.is_enriched());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn unmatched_sku_drops_the_whole_order() {
        let api = Arc::new(MockOrderApi::default());
        api.insert("900002", remote(dec!(2), dec!(12), vec![("OTHER", dec!(10))]));
        let notifier = Arc::new(RecordingNotifier::default());
        let stage = EnrichmentStage::new(api, notifier.clone());

        let groups = stage
            .enrich(vec![group(vec![order(
                "A1002",
                "900002",
                vec![OrderItem::new("SKU2", 1)],
            )])])
            .await;

        assert!(groups.is_empty(), "emptied group must be pruned");
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.contains("SKU2"));
        assert!(messages[0].0.contains("A1002"));
    }

    #[tokio::test]
    async fn missing_remote_order_is_excluded_not_fatal() {
        let api = Arc::new(MockOrderApi::default());
        api.insert("900001", remote(dec!(5), dec!(25), vec![("SKU1", dec!(20))]));
        let notifier = Arc::new(RecordingNotifier::default());
        let stage = EnrichmentStage::new(api, notifier.clone());

        let groups = stage
            .enrich(vec![group(vec![
                order("A1001", "900001", vec![OrderItem::new("SKU1", 2)]),
                order("A1003", "missing", vec![OrderItem::new("SKU1", 1)]),
            ])])
            .await;

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].orders.len(), 1);
        assert_eq!(groups[0].orders[0].purchase_order_number, "A1001");
        assert_eq!(notifier.messages().len(), 1);
        assert!(notifier.messages()[0].0.contains("A1003"));
    }

    #[tokio::test]
    async fn transport_error_excludes_order_and_notifies() {
        let api = Arc::new(MockOrderApi::default());
        api.fail_for("900009");
        let notifier = Arc::new(RecordingNotifier::default());
        let stage = EnrichmentStage::new(api, notifier.clone());

        let groups = stage
            .enrich(vec![group(vec![order(
                "A1009",
                "900009",
                vec![OrderItem::new("SKU1", 1)],
            )])])
            .await;

        assert!(groups.is_empty());
        assert!(notifier.messages()[0].0.contains("A1009"));
    }

    #[tokio::test]
    async fn duplicate_skus_resolve_first_match() {
        let api = Arc::new(MockOrderApi::default());
        api.insert(
            "900004",
            remote(
                dec!(0),
                dec!(30),
                vec![("SKU1", dec!(10)), ("SKU1", dec!(20))],
            ),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let stage = EnrichmentStage::new(api, notifier);

        let groups = stage
            .enrich(vec![group(vec![order(
                "A1004",
                "900004",
                vec![OrderItem::new("SKU1", 1)],
            )])])
            .await;

        assert_eq!(groups[0].orders[0].items[0].unit_cost, Some(dec!(10)));
    }
}
