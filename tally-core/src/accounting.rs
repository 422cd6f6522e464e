use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::BoxError;

/// Reference to an accounting-side object (item, class, term, customer,
/// ship method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub value: String,
    pub name: Option<String>,
}

impl ObjectRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: None,
        }
    }

    pub fn named(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: Some(name.into()),
        }
    }
}

/// One sales line on an invoice draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftLine {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub item_ref: ObjectRef,
    pub class_ref: ObjectRef,
    pub service_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

/// A submit-ready invoice, keyed by `doc_number` for idempotency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDraft {
    pub doc_number: String,
    pub customer_ref: ObjectRef,
    pub term_ref: ObjectRef,
    pub ship_method_ref: ObjectRef,
    pub bill_email: String,
    pub ship_date: NaiveDate,
    pub txn_date: NaiveDate,
    pub tracking_number: String,
    pub ship_address: ShipAddress,
    pub lines: Vec<DraftLine>,
}

/// An invoice as the accounting system stores it. `sync_token` is the
/// provider's optimistic-concurrency handle, required for deletion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredInvoice {
    pub id: String,
    pub doc_number: String,
    pub sync_token: String,
    pub total: Option<Decimal>,
}

#[async_trait]
pub trait AccountingClient: Send + Sync {
    async fn get_item_ref(&self, id: &str) -> Result<ObjectRef, BoxError>;
    async fn get_class_ref(&self, id: &str) -> Result<ObjectRef, BoxError>;
    async fn get_term_ref(&self, id: &str) -> Result<ObjectRef, BoxError>;
    async fn get_customer_ref(&self, id: &str) -> Result<ObjectRef, BoxError>;

    /// Look up an invoice by doc number; `Ok(None)` when none exists.
    async fn find_invoice(&self, doc_number: &str) -> Result<Option<StoredInvoice>, BoxError>;

    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<StoredInvoice, BoxError>;

    /// Compensating action: remove an invoice created earlier in the run.
    async fn delete_invoice(&self, invoice: &StoredInvoice) -> Result<(), BoxError>;
}
