use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub order_api: OrderApiConfig,
    pub accounting: AccountingConfig,
    pub catalog: CatalogRefs,
    pub export: ExportConfig,
    pub transfer: TransferConfig,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// In-house partner codes that never receive accounting invoices.
    #[serde(default)]
    pub excluded_partner_codes: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrderApiConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountingConfig {
    pub base_url: String,
    pub company_id: String,
    pub access_token: String,
}

/// Fixed accounting catalog references, injected at startup so catalog
/// changes never require a code change.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogRefs {
    pub product_item_id: String,
    pub tax_item_id: String,
    pub shipping_item_id: String,
    pub class_id: String,
    pub term_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Local root for per-run export directories.
    pub root: String,
    /// Shared labels stamped on every line-item-expanded row.
    pub line_item_customer: String,
    pub line_item_carrier: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    pub archive_root: String,
    pub partner_root: String,
    /// Partners whose files are produced but never delivered.
    #[serde(default)]
    pub excluded_folders: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub webhook_url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of TALLY)
            // Eg.. `TALLY__DATABASE__URL=...` would set the database url
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
