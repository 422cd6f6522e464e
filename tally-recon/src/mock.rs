//! In-memory collaborators for tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use tally_core::accounting::{AccountingClient, InvoiceDraft, ObjectRef, StoredInvoice};
use tally_core::notify::Notifier;
use tally_core::ordermgmt::{OrderManagementClient, RemoteOrder};
use tally_core::BoxError;

/// Order-management system with a fixed set of known orders.
#[derive(Default)]
pub struct MockOrderApi {
    orders: Mutex<HashMap<String, RemoteOrder>>,
    failing: Mutex<HashSet<String>>,
}

impl MockOrderApi {
    pub fn insert(&self, remote_order_id: &str, order: RemoteOrder) {
        self.orders
            .lock()
            .unwrap()
            .insert(remote_order_id.to_string(), order);
    }

    /// Simulate a transport failure for one order id.
    pub fn fail_for(&self, remote_order_id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(remote_order_id.to_string());
    }
}

#[async_trait]
impl OrderManagementClient for MockOrderApi {
    async fn get_order(&self, remote_order_id: &str) -> Result<Option<RemoteOrder>, BoxError> {
        if self.failing.lock().unwrap().contains(remote_order_id) {
            return Err("simulated order-management outage".into());
        }
        Ok(self.orders.lock().unwrap().get(remote_order_id).cloned())
    }
}

/// Accounting system holding invoices keyed by doc number, with call
/// counters for asserting idempotency and compensation behavior.
#[derive(Default)]
pub struct MockAccounting {
    invoices: Mutex<HashMap<String, StoredInvoice>>,
    next_id: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    reject_docs: Mutex<HashSet<String>>,
}

impl MockAccounting {
    /// Pre-seed an existing invoice, as a previous run would have left it.
    pub fn seed_invoice(&self, doc_number: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.invoices.lock().unwrap().insert(
            doc_number.to_string(),
            StoredInvoice {
                id: id.to_string(),
                doc_number: doc_number.to_string(),
                sync_token: "0".to_string(),
                total: None,
            },
        );
    }

    /// Make `create_invoice` reject this doc number.
    pub fn reject(&self, doc_number: &str) {
        self.reject_docs
            .lock()
            .unwrap()
            .insert(doc_number.to_string());
    }

    pub fn holds_invoice(&self, doc_number: &str) -> bool {
        self.invoices.lock().unwrap().contains_key(doc_number)
    }

    pub fn invoice_count(&self) -> usize {
        self.invoices.lock().unwrap().len()
    }
}

#[async_trait]
impl AccountingClient for MockAccounting {
    async fn get_item_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        Ok(ObjectRef::named(id, format!("item-{id}")))
    }

    async fn get_class_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        Ok(ObjectRef::named(id, format!("class-{id}")))
    }

    async fn get_term_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        Ok(ObjectRef::named(id, format!("term-{id}")))
    }

    async fn get_customer_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        Ok(ObjectRef::named(id, format!("customer-{id}")))
    }

    async fn find_invoice(&self, doc_number: &str) -> Result<Option<StoredInvoice>, BoxError> {
        Ok(self.invoices.lock().unwrap().get(doc_number).cloned())
    }

    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<StoredInvoice, BoxError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_docs.lock().unwrap().contains(&draft.doc_number) {
            return Err(format!("invoice {} rejected", draft.doc_number).into());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let invoice = StoredInvoice {
            id: id.to_string(),
            doc_number: draft.doc_number.clone(),
            sync_token: "0".to_string(),
            total: None,
        };
        self.invoices
            .lock()
            .unwrap()
            .insert(draft.doc_number.clone(), invoice.clone());
        Ok(invoice)
    }

    async fn delete_invoice(&self, invoice: &StoredInvoice) -> Result<(), BoxError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.invoices.lock().unwrap().remove(&invoice.doc_number);
        Ok(())
    }
}

/// Captures every notification for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
    }
}
