pub mod app_config;
pub mod database;
pub mod order_source;

pub use database::DbClient;
pub use order_source::PgOrderSource;
