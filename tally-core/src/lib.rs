pub mod accounting;
pub mod order;
pub mod ordermgmt;
pub mod outcome;
pub mod notify;
pub mod source;
pub mod transfer;

pub use order::{Order, OrderItem, PartnerGroup, VendorMapping};
pub use outcome::{Outcome, RunLedger};

/// Boxed error type shared by every collaborator trait.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("order {0} is missing financial data")]
    NotEnriched(String),
    #[error("no vendor mapping for partner '{0}'")]
    MissingVendorMapping(String),
    #[error("unknown export format '{0}'")]
    UnknownFormat(String),
    #[error("export schema mismatch: {0}")]
    SchemaMismatch(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
