//! The batch run driver: one synchronous, run-to-completion pass over
//! every partner group, with all external resources acquired up front and
//! released on every exit path.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::Local;
use tracing::{error, info};
use uuid::Uuid;

use tally_connect::{
    AccountingApiClient, AccountingApiConfig, DropFolderTransfer, OrderApiClient, OrderApiConfig,
};
use tally_core::notify::Notifier;
use tally_core::source::OrderSource;
use tally_core::transfer::TransferChannel;
use tally_core::RunLedger;
use tally_recon::{
    CatalogConfig, EnrichmentStage, ExportAssembler, ExportWriter, InvoiceBuilder, LineItemLabels,
    ReconciliationOrchestrator,
};
use tally_store::app_config::Config;
use tally_store::{DbClient, PgOrderSource};

use crate::report;

pub async fn run(config: &Config, notifier: Arc<dyn Notifier>) -> anyhow::Result<()> {
    let run_id = Uuid::new_v4();
    info!(%run_id, "Starting invoicing run");

    // A database the run cannot reach is fatal before any work starts.
    let db = DbClient::new(&config.database.url)
        .await
        .context("connecting to the order database")?;

    let result = run_with_db(config, notifier, &db).await;
    db.close().await;
    result
}

async fn run_with_db(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    db: &DbClient,
) -> anyhow::Result<()> {
    let source = PgOrderSource::new(
        db.pool.clone(),
        config.source.excluded_partner_codes.clone(),
    );

    let headers = source
        .fetch_csv_headers()
        .await
        .map_err(|e| anyhow!(e))
        .context("fetching export header registry")?;
    let mappings = source
        .fetch_vendor_mapping()
        .await
        .map_err(|e| anyhow!(e))
        .context("fetching vendor mapping")?;
    let groups = source
        .fetch_invoiceable_orders()
        .await
        .map_err(|e| anyhow!(e))
        .context("fetching invoiceable orders")?;

    let order_api = Arc::new(
        OrderApiClient::new(OrderApiConfig {
            base_url: config.order_api.base_url.clone(),
            username: config.order_api.username.clone(),
            password: config.order_api.password.clone(),
        })
        .map_err(|e| anyhow!(e))?,
    );

    let stage = EnrichmentStage::new(order_api, notifier.clone());
    let groups = stage.enrich(groups).await;

    if groups.is_empty() {
        info!("No orders ready to invoice");
        notifier
            .notify(
                "Invoicing run completed",
                "There are no orders to invoice.",
            )
            .await;
        return Ok(());
    }

    let accounting = Arc::new(
        AccountingApiClient::new(AccountingApiConfig {
            base_url: config.accounting.base_url.clone(),
            company_id: config.accounting.company_id.clone(),
            access_token: config.accounting.access_token.clone(),
        })
        .map_err(|e| anyhow!(e))?,
    );

    let orchestrator = ReconciliationOrchestrator::new(
        InvoiceBuilder::new(
            accounting,
            CatalogConfig {
                product_item_id: config.catalog.product_item_id.clone(),
                tax_item_id: config.catalog.tax_item_id.clone(),
                shipping_item_id: config.catalog.shipping_item_id.clone(),
                class_id: config.catalog.class_id.clone(),
                term_id: config.catalog.term_id.clone(),
            },
        ),
        ExportAssembler::new(LineItemLabels {
            customer: config.export.line_item_customer.clone(),
            carrier: config.export.line_item_carrier.clone(),
        }),
    );

    let writer = ExportWriter::new(&config.export.root, Local::now().naive_local());
    let mut ledger = RunLedger::new();
    let mut file_paths = Vec::new();

    for group in &groups {
        let table = orchestrator
            .process_group(group, &headers, &mappings, &mut ledger)
            .await
            .with_context(|| format!("reconciling partner {}", group.partner_code))?;

        let written = writer
            .write_table(&table, &group.export_folder)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("writing export file for {}", group.partner_code))?;
        if let Some(path) = written {
            file_paths.push(path);
        }
    }

    if !file_paths.is_empty() {
        let transfer = DropFolderTransfer::new(
            &config.transfer.archive_root,
            &config.transfer.partner_root,
            config.transfer.excluded_folders.clone(),
        );
        if let Err(err) = transfer.upload(&file_paths).await {
            // Transfer trouble is never fatal; the files exist locally and
            // a human finishes the delivery.
            error!(%err, "Export file delivery failed");
            notifier
                .notify(
                    "Export files could not be delivered",
                    &report::undelivered_files(&file_paths),
                )
                .await;
        }
    }

    if ledger.has_exceptions() {
        notifier
            .notify("Invoicing exceptions", &report::exception_report(&ledger))
            .await;
    }

    if !ledger.invoiced.is_empty() {
        source
            .persist_invoice_status(&ledger.invoiced)
            .await
            .map_err(|e| anyhow!(e))
            .context("writing invoice status back to the order database")?;
    }

    notifier
        .notify(
            "Invoicing run completed",
            &report::run_summary(&ledger, file_paths.len()),
        )
        .await;

    Ok(())
}
