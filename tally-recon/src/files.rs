//! Export file emission: one timestamped directory per partner per run.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::info;

use crate::export::ExportTable;
use tally_core::BoxError;

const DATE_FORMAT: &str = "%m%d%Y";
const TIME_FORMAT: &str = "%H%M%S";

pub struct ExportWriter {
    root: PathBuf,
    report_stamp: NaiveDateTime,
}

impl ExportWriter {
    pub fn new(root: impl Into<PathBuf>, report_stamp: NaiveDateTime) -> Self {
        Self {
            root: root.into(),
            report_stamp,
        }
    }

    /// Serializes one partner table. Empty tables produce no file and no
    /// upload downstream.
    pub fn write_table(
        &self,
        table: &ExportTable,
        partner_folder: &str,
    ) -> Result<Option<PathBuf>, BoxError> {
        if table.is_empty() {
            return Ok(None);
        }

        let dir = self.run_directory(partner_folder)?;
        let file_path = dir.join(format!(
            "Invoice_{}.csv",
            self.report_stamp.format(DATE_FORMAT)
        ));

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(&file_path)?;
        writer.write_record(table.headers())?;
        for row in table.rows() {
            writer.write_record(row)?;
        }
        writer.flush()?;

        info!(path = %file_path.display(), rows = table.rows().len(), "Export file written");
        Ok(Some(file_path))
    }

    fn run_directory(&self, partner_folder: &str) -> Result<PathBuf, BoxError> {
        let stamp = format!(
            "{}_{}",
            self.report_stamp.format(DATE_FORMAT),
            self.report_stamp.format(TIME_FORMAT)
        );
        let dir = self.root.join(partner_folder).join(stamp);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportAssembler, LineItemLabels};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_core::{Order, OrderItem};

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn generic_headers() -> Vec<String> {
        [
            "po_number",
            "invoice_number",
            "invoice_date",
            "invoice_total_amount",
            "invoice_subtotal_amount",
            "invoice_tax_amount",
            "line_item_sku",
            "line_item_quantity",
            "line_item_unit_cost",
        ]
        .map(str::to_string)
        .to_vec()
    }

    fn enriched_order() -> Order {
        Order {
            order_id: "ACME1001".to_string(),
            purchase_order_number: "1001".to_string(),
            remote_order_id: "900001".to_string(),
            items: vec![OrderItem {
                sku: "SKU1".to_string(),
                quantity: 2,
                unit_cost: Some(dec!(10.00)),
            }],
            subtotal: Some(dec!(25.00)),
            tax: Some(dec!(5.00)),
            shipping: dec!(4.99),
            partner_code: "ACME".to_string(),
            partner_name: "Acme Outfitters".to_string(),
            tracking_number: "1Z999".to_string(),
            ship_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            country: "US".to_string(),
            postal_code: "62701".to_string(),
        }
    }

    #[test]
    fn writes_headers_and_rows_under_timestamped_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ExportWriter::new(tmp.path(), stamp());

        let mut table = ExportTable::new("default", generic_headers());
        let assembler = ExportAssembler::new(LineItemLabels {
            customer: "acme_retail".to_string(),
            carrier: "FEDEX_GROUND".to_string(),
        });
        assembler.populate(&mut table, &enriched_order()).unwrap();

        let path = writer.write_table(&table, "acme_drop").unwrap().unwrap();
        assert_eq!(
            path,
            tmp.path()
                .join("acme_drop/03022026_101500/Invoice_03022026.csv")
        );

        let contents = std::fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), generic_headers().join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1001,ACME1001,2026/03/02"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_table_produces_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ExportWriter::new(tmp.path(), stamp());

        let table = ExportTable::new("default", generic_headers());
        assert!(writer.write_table(&table, "acme_drop").unwrap().is_none());
        assert!(!tmp.path().join("acme_drop").exists());
    }
}
