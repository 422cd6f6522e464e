//! Human-facing report bodies for the notification channel.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tally_core::RunLedger;

pub fn run_summary(ledger: &RunLedger, files_written: usize) -> String {
    format!(
        "Invoiced {} orders across {} export file(s).\n\
         Already invoiced: {}. Unable to invoice: {}.",
        ledger.invoiced_count(),
        files_written,
        count(&ledger.already_invoiced),
        count(&ledger.unable_to_invoice),
    )
}

/// One report per run enumerating both exception buckets by partner.
pub fn exception_report(ledger: &RunLedger) -> String {
    let mut body = String::new();

    if !ledger.unable_to_invoice.is_empty() {
        body.push_str("Orders that could not be invoiced:\n");
        push_buckets(&mut body, &ledger.unable_to_invoice);
    }
    if !ledger.already_invoiced.is_empty() {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str("Orders that were already invoiced:\n");
        push_buckets(&mut body, &ledger.already_invoiced);
    }

    body
}

pub fn undelivered_files(paths: &[PathBuf]) -> String {
    let listing = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n\t");
    format!(
        "The following export files were not delivered; \
         please upload them manually:\n\t{listing}"
    )
}

fn push_buckets(body: &mut String, buckets: &BTreeMap<String, Vec<String>>) {
    for (partner, pos) in buckets {
        body.push_str(&format!("\t{partner}: {}\n", pos.join(", ")));
    }
}

fn count(buckets: &BTreeMap<String, Vec<String>>) -> usize {
    buckets.values().map(Vec::len).sum()
}
