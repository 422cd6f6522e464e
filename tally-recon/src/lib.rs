pub mod enrich;
pub mod export;
pub mod files;
pub mod invoice;
pub mod mock;
pub mod orchestrator;

pub use enrich::EnrichmentStage;
pub use export::{ExportAssembler, ExportTable, LineItemLabels};
pub use files::ExportWriter;
pub use invoice::{CatalogConfig, InvoiceBuilder};
pub use orchestrator::ReconciliationOrchestrator;
