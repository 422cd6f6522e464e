//! Invoice construction and submission against the accounting system.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error};

use tally_core::accounting::{
    AccountingClient, DraftLine, InvoiceDraft, ObjectRef, ShipAddress, StoredInvoice,
};
use tally_core::{BoxError, CoreError, Order, VendorMapping};

/// Accounting catalog references, injected at startup. Catalog changes
/// never require a code change.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub product_item_id: String,
    pub tax_item_id: String,
    pub shipping_item_id: String,
    pub class_id: String,
    pub term_id: String,
}

pub struct InvoiceBuilder {
    accounting: Arc<dyn AccountingClient>,
    catalog: CatalogConfig,
}

impl InvoiceBuilder {
    pub fn new(accounting: Arc<dyn AccountingClient>, catalog: CatalogConfig) -> Self {
        Self {
            accounting,
            catalog,
        }
    }

    /// Idempotency check; must run before `create_invoice`.
    pub async fn check_exists(&self, order_id: &str) -> Result<Option<StoredInvoice>, BoxError> {
        self.accounting.find_invoice(order_id).await
    }

    /// Compensating action for a create that succeeded but whose
    /// downstream step failed.
    pub async fn delete_invoice(&self, invoice: &StoredInvoice) -> Result<(), BoxError> {
        self.accounting.delete_invoice(invoice).await
    }

    /// Builds and submits one invoice. Returns `false` on any failure
    /// after logging the cause; the orchestrator treats `false` as
    /// unable-to-invoice, never as a crash.
    pub async fn create_invoice(
        &self,
        order: &Order,
        mappings: &HashMap<String, VendorMapping>,
    ) -> bool {
        match self.try_create(order, mappings).await {
            Ok(invoice) => {
                debug!(doc_number = %invoice.doc_number, id = %invoice.id, "Invoice created");
                true
            }
            Err(err) => {
                error!(order_id = %order.order_id, %err, "Invoice creation failed");
                false
            }
        }
    }

    async fn try_create(
        &self,
        order: &Order,
        mappings: &HashMap<String, VendorMapping>,
    ) -> Result<StoredInvoice, BoxError> {
        let mapping = mappings
            .get(&order.partner_name)
            .ok_or_else(|| CoreError::MissingVendorMapping(order.partner_name.clone()))?;

        if !order.is_enriched() {
            return Err(CoreError::NotEnriched(order.order_id.clone()).into());
        }

        let draft = self.build_draft(order, mapping).await?;
        self.accounting.create_invoice(&draft).await
    }

    async fn build_draft(
        &self,
        order: &Order,
        mapping: &VendorMapping,
    ) -> Result<InvoiceDraft, BoxError> {
        let not_enriched = || CoreError::NotEnriched(order.order_id.clone());
        let tax = order.tax.ok_or_else(not_enriched)?;

        let item_ref = self.accounting.get_item_ref(&self.catalog.product_item_id).await?;
        let tax_ref = self.accounting.get_item_ref(&self.catalog.tax_item_id).await?;
        let shipping_ref = self
            .accounting
            .get_item_ref(&self.catalog.shipping_item_id)
            .await?;
        let class_ref = self.accounting.get_class_ref(&self.catalog.class_id).await?;
        let term_ref = self.accounting.get_term_ref(&self.catalog.term_id).await?;
        let customer_ref = self.accounting.get_customer_ref(&mapping.customer_id).await?;

        let mut lines = Vec::with_capacity(order.items.len() + 2);
        for item in &order.items {
            let unit_cost = item.unit_cost.ok_or_else(not_enriched)?;
            lines.push(DraftLine {
                description: item.sku.clone(),
                quantity: item.quantity,
                unit_price: unit_cost,
                amount: unit_cost * Decimal::from(item.quantity),
                item_ref: item_ref.clone(),
                class_ref: class_ref.clone(),
                service_date: order.ship_date,
            });
        }

        // Exactly one synthetic tax line and one synthetic shipping line.
        lines.push(DraftLine {
            description: "Taxes".to_string(),
            quantity: 1,
            unit_price: tax,
            amount: tax,
            item_ref: tax_ref,
            class_ref: class_ref.clone(),
            service_date: order.ship_date,
        });
        lines.push(DraftLine {
            description: "Shipping".to_string(),
            quantity: 1,
            unit_price: order.shipping,
            amount: order.shipping,
            item_ref: shipping_ref,
            class_ref,
            service_date: order.ship_date,
        });

        Ok(InvoiceDraft {
            doc_number: order.order_id.clone(),
            customer_ref,
            term_ref,
            ship_method_ref: ObjectRef::named(
                mapping.ship_method.clone(),
                mapping.ship_method.clone(),
            ),
            bill_email: mapping.email.clone(),
            ship_date: order.ship_date,
            txn_date: order.ship_date,
            tracking_number: order.tracking_number.clone(),
            ship_address: ShipAddress {
                line1: order.address.clone(),
                city: order.city.clone(),
                state: order.state.clone(),
                country: order.country.clone(),
                postal_code: order.postal_code.clone(),
            },
            lines,
        })
    }
}
