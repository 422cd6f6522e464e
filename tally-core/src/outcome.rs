use std::collections::BTreeMap;

use crate::order::Order;

/// Terminal classification for one order within a run. Orders excluded by
/// enrichment never reach classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Invoiced,
    AlreadyInvoiced,
    UnableToInvoice,
}

/// The three disjoint outcome buckets accumulated over one run.
///
/// Created empty per run, consumed exactly once by the status writeback and
/// the error report, then discarded. `invoiced` holds full records because
/// the writeback needs the enriched financial values, not just the keys.
#[derive(Debug, Default)]
pub struct RunLedger {
    pub invoiced: Vec<Order>,
    pub already_invoiced: BTreeMap<String, Vec<String>>,
    pub unable_to_invoice: BTreeMap<String, Vec<String>>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single classification point: every classified order lands in exactly
    /// one bucket. Already-invoiced orders also join the status list so a
    /// re-run heals rows that were invoiced but never marked.
    pub fn record(&mut self, order: &Order, outcome: Outcome) {
        match outcome {
            Outcome::Invoiced => self.invoiced.push(order.clone()),
            Outcome::AlreadyInvoiced => {
                self.already_invoiced
                    .entry(order.partner_code.clone())
                    .or_default()
                    .push(order.purchase_order_number.clone());
                self.invoiced.push(order.clone());
            }
            Outcome::UnableToInvoice => {
                self.unable_to_invoice
                    .entry(order.partner_code.clone())
                    .or_default()
                    .push(order.purchase_order_number.clone());
            }
        }
    }

    /// True when the run had orders that need manual attention.
    pub fn has_exceptions(&self) -> bool {
        !self.already_invoiced.is_empty() || !self.unable_to_invoice.is_empty()
    }

    pub fn invoiced_count(&self) -> usize {
        self.invoiced.len()
    }
}
