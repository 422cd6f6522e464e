//! Reconciliation orchestrator: drives a batch of partner groups through
//! check-exists → create-invoice → populate-export, classifying every
//! order into one of the run's outcome buckets.
//!
//! Per-order failures are isolated and recorded; nothing below the group
//! level aborts the batch. The only transaction substitute available
//! across the external systems is the compensating delete issued when an
//! invoice was created but its export row could not be.

use std::collections::HashMap;

use tracing::{error, info, warn};

use crate::export::{ExportAssembler, ExportTable};
use crate::invoice::InvoiceBuilder;
use tally_core::{CoreError, CoreResult, Order, Outcome, PartnerGroup, RunLedger, VendorMapping};

pub struct ReconciliationOrchestrator {
    builder: InvoiceBuilder,
    assembler: ExportAssembler,
}

impl ReconciliationOrchestrator {
    pub fn new(builder: InvoiceBuilder, assembler: ExportAssembler) -> Self {
        Self { builder, assembler }
    }

    /// Processes one partner group in source order, recording outcomes in
    /// the ledger and returning the group's completed export table.
    pub async fn process_group(
        &self,
        group: &PartnerGroup,
        headers: &HashMap<String, Vec<String>>,
        mappings: &HashMap<String, VendorMapping>,
        ledger: &mut RunLedger,
    ) -> CoreResult<ExportTable> {
        let columns = headers
            .get(&group.format_name)
            .ok_or_else(|| CoreError::UnknownFormat(group.format_name.clone()))?;
        let mut table = ExportTable::new(group.format_name.clone(), columns.clone());

        info!(
            partner = %group.partner_code,
            orders = group.orders.len(),
            "Reconciling partner group"
        );

        for order in &group.orders {
            let outcome = self.process_order(order, mappings, &mut table).await;
            ledger.record(order, outcome);
        }

        Ok(table)
    }

    async fn process_order(
        &self,
        order: &Order,
        mappings: &HashMap<String, VendorMapping>,
        table: &mut ExportTable,
    ) -> Outcome {
        match self.builder.check_exists(&order.order_id).await {
            Ok(Some(invoice)) => {
                info!(order_id = %order.order_id, invoice_id = %invoice.id, "Invoice already exists");
                return Outcome::AlreadyInvoiced;
            }
            Ok(None) => {}
            // An unverifiable doc number must not be re-created: a lookup
            // outage would otherwise duplicate the invoice.
            Err(err) => {
                error!(order_id = %order.order_id, %err, "Idempotency check failed");
                return Outcome::UnableToInvoice;
            }
        }

        if !self.builder.create_invoice(order, mappings).await {
            return Outcome::UnableToInvoice;
        }

        match self.assembler.populate(table, order) {
            Ok(()) => Outcome::Invoiced,
            Err(err) => {
                warn!(order_id = %order.order_id, %err, "Export population failed; compensating");
                self.compensate(order).await;
                Outcome::UnableToInvoice
            }
        }
    }

    /// Deletes the just-created invoice so accounting and export state do
    /// not diverge. The order is reclassified by the caller.
    async fn compensate(&self, order: &Order) {
        match self.builder.check_exists(&order.order_id).await {
            Ok(Some(invoice)) => {
                if let Err(err) = self.builder.delete_invoice(&invoice).await {
                    error!(
                        order_id = %order.order_id,
                        invoice_id = %invoice.id,
                        %err,
                        "Compensating delete failed; invoice needs manual removal"
                    );
                }
            }
            Ok(None) => {
                warn!(order_id = %order.order_id, "Invoice to compensate no longer exists");
            }
            Err(err) => {
                error!(
                    order_id = %order.order_id,
                    %err,
                    "Could not re-fetch invoice for compensation; needs manual removal"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::LineItemLabels;
    use crate::invoice::CatalogConfig;
    use crate::mock::MockAccounting;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tally_core::OrderItem;

    fn catalog() -> CatalogConfig {
        CatalogConfig {
            product_item_id: "2".to_string(),
            tax_item_id: "24".to_string(),
            shipping_item_id: "23".to_string(),
            class_id: "1111".to_string(),
            term_id: "4".to_string(),
        }
    }

    fn orchestrator(accounting: Arc<MockAccounting>) -> ReconciliationOrchestrator {
        ReconciliationOrchestrator::new(
            InvoiceBuilder::new(accounting, catalog()),
            ExportAssembler::new(LineItemLabels {
                customer: "acme_retail".to_string(),
                carrier: "FEDEX_GROUND".to_string(),
            }),
        )
    }

    fn enriched_order(po: &str) -> Order {
        Order {
            order_id: format!("ACME{po}"),
            purchase_order_number: po.to_string(),
            remote_order_id: "900001".to_string(),
            items: vec![OrderItem {
                sku: "SKU1".to_string(),
                quantity: 2,
                unit_cost: Some(dec!(10.00)),
            }],
            subtotal: Some(dec!(25.00)),
            tax: Some(dec!(5.00)),
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

    fn generic_headers() -> HashMap<String, Vec<String>> {
        HashMap::from([(
            "default".to_string(),
            [
                "po_number",
                "invoice_number",
                "invoice_date",
                "invoice_total_amount",
                "invoice_subtotal_amount",
                "invoice_tax_amount",
                "line_item_sku",
                "line_item_quantity",
                "line_item_unit_cost",
            ]
            .map(str::to_string)
            .to_vec(),
        )])
    }

    fn mappings() -> HashMap<String, VendorMapping> {
        HashMap::from([(
            "Acme Outfitters".to_string(),
            VendorMapping {
                ship_method: "GROUND".to_string(),
                email: "ap@acme.example".to_string(),
                customer_id: "77".to_string(),
            },
        )])
    }

    #[tokio::test]
    async fn fresh_order_is_invoiced_and_exported() {
        let accounting = Arc::new(MockAccounting::default());
        let orch = orchestrator(accounting.clone());
        let mut ledger = RunLedger::new();

        let table = orch
            .process_group(
                &group(vec![enriched_order("1001")]),
                &generic_headers(),
                &mappings(),
                &mut ledger,
            )
            .await
            .unwrap();

        assert_eq!(ledger.invoiced_count(), 1);
        assert!(!ledger.has_exceptions());
        assert_eq!(table.rows().len(), 1);
        assert!(accounting.holds_invoice("ACME1001"));
    }

    #[tokio::test]
    async fn existing_invoice_skips_creation() {
        let accounting = Arc::new(MockAccounting::default());
        accounting.seed_invoice("ACME1001");
        let orch = orchestrator(accounting.clone());
        let mut ledger = RunLedger::new();

        let table = orch
            .process_group(
                &group(vec![enriched_order("1001")]),
                &generic_headers(),
                &mappings(),
                &mut ledger,
            )
            .await
            .unwrap();

        assert_eq!(accounting.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.already_invoiced["ACME"], vec!["1001".to_string()]);
        // Still reported for status writeback.
        assert_eq!(ledger.invoiced_count(), 1);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn rejected_create_lands_in_unable_bucket() {
        let accounting = Arc::new(MockAccounting::default());
        accounting.reject("ACME1001");
        let orch = orchestrator(accounting.clone());
        let mut ledger = RunLedger::new();

        let table = orch
            .process_group(
                &group(vec![enriched_order("1001")]),
                &generic_headers(),
                &mappings(),
                &mut ledger,
            )
            .await
            .unwrap();

        assert_eq!(ledger.unable_to_invoice["ACME"], vec!["1001".to_string()]);
        assert_eq!(ledger.invoiced_count(), 0);
        assert!(table.is_empty(), "no export row for a failed invoice");
    }

    #[tokio::test]
    async fn export_failure_triggers_exactly_one_compensating_delete() {
        let accounting = Arc::new(MockAccounting::default());
        let orch = orchestrator(accounting.clone());
        let mut ledger = RunLedger::new();

        // Header set missing most columns forces populate to fail after
        // the invoice is created.
        let bad_headers =
            HashMap::from([("default".to_string(), vec!["po_number".to_string()])]);

        let table = orch
            .process_group(
                &group(vec![enriched_order("1001")]),
                &bad_headers,
                &mappings(),
                &mut ledger,
            )
            .await
            .unwrap();

        assert_eq!(accounting.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(accounting.delete_calls.load(Ordering::SeqCst), 1);
        assert!(!accounting.holds_invoice("ACME1001"));
        assert_eq!(ledger.unable_to_invoice["ACME"], vec!["1001".to_string()]);
        assert_eq!(ledger.invoiced_count(), 0, "never lands in invoiced");
        assert!(table.is_empty(), "the export row must not be emitted");
    }

    #[tokio::test]
    async fn orders_are_processed_in_source_order() {
        let accounting = Arc::new(MockAccounting::default());
        accounting.reject("ACME1002");
        let orch = orchestrator(accounting.clone());
        let mut ledger = RunLedger::new();

        orch.process_group(
            &group(vec![
                enriched_order("1001"),
                enriched_order("1002"),
                enriched_order("1003"),
            ]),
            &generic_headers(),
            &mappings(),
            &mut ledger,
        )
        .await
        .unwrap();

        let pos: Vec<&str> = ledger
            .invoiced
            .iter()
            .map(|o| o.purchase_order_number.as_str())
            .collect();
        assert_eq!(pos, vec!["1001", "1003"]);
        assert_eq!(ledger.unable_to_invoice["ACME"], vec!["1002".to_string()]);
    }
}
