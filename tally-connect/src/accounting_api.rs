//! REST client for the accounting system.
//!
//! Object lookups return lightweight refs; invoices are keyed by doc
//! number for idempotent lookup and carry a sync token for deletion.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use tally_core::accounting::{AccountingClient, InvoiceDraft, ObjectRef, StoredInvoice};
use tally_core::BoxError;

#[derive(Debug, Clone)]
pub struct AccountingApiConfig {
    pub base_url: String,
    pub company_id: String,
    pub access_token: String,
}

pub struct AccountingApiClient {
    config: AccountingApiConfig,
    client: Client,
}

impl AccountingApiClient {
    pub fn new(config: AccountingApiConfig) -> Result<Self, BoxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    fn company_url(&self, path: &str) -> String {
        format!(
            "{}/v3/company/{}/{}",
            self.config.base_url, self.config.company_id, path
        )
    }

    /// Fetch one named entity and reduce it to a ref.
    async fn entity_ref(&self, entity: &str, id: &str) -> Result<ObjectRef, BoxError> {
        let response = self
            .client
            .get(self.company_url(&format!("{entity}/{id}")))
            .bearer_auth(&self.config.access_token)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        // Responses wrap the entity under its capitalized type name.
        let key = capitalize(entity);
        let obj = body
            .get(&key)
            .ok_or_else(|| format!("missing '{key}' in {entity} response"))?;

        let value = obj
            .get("Id")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("{entity} {id} has no Id"))?;
        match obj.get("Name").and_then(Value::as_str) {
            Some(name) => Ok(ObjectRef::named(value, name)),
            None => Ok(ObjectRef::new(value)),
        }
    }

    fn parse_invoice(invoice: &Value) -> Result<StoredInvoice, BoxError> {
        Ok(StoredInvoice {
            id: invoice
                .get("Id")
                .and_then(Value::as_str)
                .ok_or("invoice has no Id")?
                .to_string(),
            doc_number: invoice
                .get("DocNumber")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sync_token: invoice
                .get("SyncToken")
                .and_then(Value::as_str)
                .ok_or("invoice has no SyncToken")?
                .to_string(),
            total: invoice
                .get("TotalAmt")
                .and_then(Value::as_f64)
                .and_then(|t| rust_decimal::Decimal::try_from(t).ok()),
        })
    }
}

/// Shapes a draft into the provider's invoice payload.
pub fn draft_payload(draft: &InvoiceDraft) -> Value {
    let lines: Vec<Value> = draft
        .lines
        .iter()
        .map(|line| {
            json!({
                "Amount": line.amount,
                "DetailType": "SalesItemLineDetail",
                "Description": line.description,
                "SalesItemLineDetail": {
                    "ServiceDate": line.service_date,
                    "UnitPrice": line.unit_price,
                    "Qty": line.quantity,
                    "ItemRef": line.item_ref,
                    "ClassRef": line.class_ref,
                },
            })
        })
        .collect();

    json!({
        "DocNumber": draft.doc_number,
        "TxnDate": draft.txn_date,
        "ShipDate": draft.ship_date,
        "TrackingNum": draft.tracking_number,
        "CustomerRef": draft.customer_ref,
        "SalesTermRef": draft.term_ref,
        "ShipMethodRef": draft.ship_method_ref,
        "BillEmail": { "Address": draft.bill_email },
        "ShipAddr": {
            "Line1": draft.ship_address.line1,
            "City": draft.ship_address.city,
            "CountrySubDivisionCode": draft.ship_address.state,
            "Country": draft.ship_address.country,
            "PostalCode": draft.ship_address.postal_code,
        },
        "Line": lines,
    })
}

#[async_trait]
impl AccountingClient for AccountingApiClient {
    async fn get_item_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        self.entity_ref("item", id).await
    }

    async fn get_class_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        self.entity_ref("class", id).await
    }

    async fn get_term_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        self.entity_ref("term", id).await
    }

    async fn get_customer_ref(&self, id: &str) -> Result<ObjectRef, BoxError> {
        self.entity_ref("customer", id).await
    }

    async fn find_invoice(&self, doc_number: &str) -> Result<Option<StoredInvoice>, BoxError> {
        // Doc numbers are partner-prefixed business keys; no quoting needed
        // beyond the single-quote escape.
        let query = format!(
            "select * from Invoice where DocNumber = '{}'",
            doc_number.replace('\'', "''")
        );
        let response = self
            .client
            .get(self.company_url("query"))
            .bearer_auth(&self.config.access_token)
            .query(&[("query", query.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        match body
            .pointer("/QueryResponse/Invoice/0")
            .map(Self::parse_invoice)
        {
            Some(invoice) => Ok(Some(invoice?)),
            None => Ok(None),
        }
    }

    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<StoredInvoice, BoxError> {
        debug!(doc_number = %draft.doc_number, "Submitting invoice");
        let response = self
            .client
            .post(self.company_url("invoice"))
            .bearer_auth(&self.config.access_token)
            .json(&draft_payload(draft))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        let invoice = body.get("Invoice").ok_or("missing 'Invoice' in response")?;
        Self::parse_invoice(invoice)
    }

    async fn delete_invoice(&self, invoice: &StoredInvoice) -> Result<(), BoxError> {
        debug!(id = %invoice.id, doc_number = %invoice.doc_number, "Deleting invoice");
        self.client
            .post(self.company_url("invoice"))
            .bearer_auth(&self.config.access_token)
            .query(&[("operation", "delete")])
            .json(&json!({
                "Id": invoice.id,
                "SyncToken": invoice.sync_token,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
