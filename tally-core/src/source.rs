use std::collections::HashMap;

use async_trait::async_trait;

use crate::order::{Order, PartnerGroup, VendorMapping};
use crate::BoxError;

/// The relational order source: shipped, untracked-for-invoicing orders
/// joined to partner and export-format configuration.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Orders with tracking set and not yet invoiced, grouped by
    /// `(partner_code, export_folder)`.
    async fn fetch_invoiceable_orders(&self) -> Result<Vec<PartnerGroup>, BoxError>;

    /// Column sets per export format name.
    async fn fetch_csv_headers(&self) -> Result<HashMap<String, Vec<String>>, BoxError>;

    /// Accounting references and defaults per partner display name.
    async fn fetch_vendor_mapping(&self) -> Result<HashMap<String, VendorMapping>, BoxError>;

    /// Writes final totals and the invoiced flag back for every order in
    /// the status list, including each item's resolved price.
    async fn persist_invoice_status(&self, invoiced: &[Order]) -> Result<(), BoxError>;
}
