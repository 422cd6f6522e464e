use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::BoxError;

/// Totals section of an order as the order-management system reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTotals {
    #[serde(rename = "Tax")]
    pub tax: Decimal,
    #[serde(rename = "GrandTotal")]
    pub grand_total: Decimal,
}

/// One priced line from the order-management system's item list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteLine {
    #[serde(rename = "ProductIDOriginal")]
    pub sku: String,
    #[serde(rename = "LineTotal")]
    pub line_total: Decimal,
}

/// Authoritative pricing for one order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteOrder {
    #[serde(rename = "TotalInfo")]
    pub totals: RemoteTotals,
    #[serde(rename = "OrderItems")]
    pub items: Vec<RemoteLine>,
}

impl RemoteOrder {
    /// First line matching the SKU. Duplicate SKUs resolve first-match.
    pub fn find_line(&self, sku: &str) -> Option<&RemoteLine> {
        self.items.iter().find(|l| l.sku == sku)
    }
}

#[async_trait]
pub trait OrderManagementClient: Send + Sync {
    /// Fetch one order by its order-management id. `Ok(None)` means the
    /// system does not know the order.
    async fn get_order(&self, remote_order_id: &str) -> Result<Option<RemoteOrder>, BoxError>;
}
