//! REST client for the order-management system.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use tally_core::ordermgmt::{OrderManagementClient, RemoteOrder};
use tally_core::BoxError;

/// Connection settings for the order-management API.
#[derive(Debug, Clone)]
pub struct OrderApiConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

pub struct OrderApiClient {
    config: OrderApiConfig,
    client: Client,
    /// Bearer token, fetched on first use.
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OrderApiClient {
    pub fn new(config: OrderApiConfig) -> Result<Self, BoxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    async fn bearer_token(&self) -> Result<String, BoxError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        debug!("Requesting order-management API token");
        let response = self
            .client
            .post(format!("{}/token", self.config.base_url))
            .json(&serde_json::json!({
                "Username": self.config.username,
                "Password": self.config.password,
            }))
            .send()
            .await?
            .error_for_status()?;

        let token = response.json::<TokenResponse>().await?.access_token;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl OrderManagementClient for OrderApiClient {
    async fn get_order(&self, remote_order_id: &str) -> Result<Option<RemoteOrder>, BoxError> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .get(format!("{}/Orders/{}", self.config.base_url, remote_order_id))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<RemoteOrder>().await?)),
            status => {
                warn!(%status, remote_order_id, "Order lookup rejected");
                Err(format!("order lookup for {remote_order_id} returned {status}").into())
            }
        }
    }
}
