use crate::dates::BoundaryZone;
use crate::error::{FleetError, Result};
use crate::fmt::money_ascii;
use crate::models::TransactionRecord;
use crate::models::PLACEHOLDER;
use crate::reports::ReportStats;

pub const COLUMNS: [&str; 9] = [
    "No.", "Date", "Fare", "Payment", "Pick-up", "Drop-off", "Driver", "Invoice", "Status",
];

/// One flattened, numbered line of a transaction export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub number: usize,
    pub date: String,
    pub fare: f64,
    pub payment: String,
    pub pick_up: String,
    pub drop_off: String,
    pub driver: String,
    pub invoice: String,
    pub status: String,
}

impl ExportRow {
    pub fn from_record(number: usize, r: &TransactionRecord, zone: BoundaryZone) -> Self {
        Self {
            number,
            date: r
                .timestamp
                .map(|t| zone.date_of(t).format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            fare: r.fare_price,
            payment: r.payment_method.label().to_string(),
            pick_up: r.pick_up_or_placeholder().to_string(),
            drop_off: r.drop_off_or_placeholder().to_string(),
            driver: r.driver_or_placeholder().to_string(),
            invoice: r.invoice_or_placeholder().to_string(),
            status: r.status_label().to_string(),
        }
    }

    pub fn cells(&self) -> [String; 9] {
        [
            self.number.to_string(),
            self.date.clone(),
            format!("{:.2}", self.fare),
            self.payment.clone(),
            self.pick_up.clone(),
            self.drop_off.clone(),
            self.driver.clone(),
            self.invoice.clone(),
            self.status.clone(),
        ]
    }
}

/// Header shown above exported rows.
#[derive(Debug, Clone, Default)]
pub struct ExportMeta {
    pub title: String,
    pub organization: String,
    pub date_range: String,
    pub stats: Option<ReportStats>,
}

/// Turns rows into file bytes.
pub trait Exporter {
    fn extension(&self) -> &'static str;
    fn export(&self, meta: &ExportMeta, rows: &[ExportRow]) -> Result<Vec<u8>>;
}

pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, _meta: &ExportMeta, rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(COLUMNS)?;
        for row in rows {
            wtr.write_record(row.cells())?;
        }
        wtr.into_inner()
            .map_err(|e| FleetError::Other(format!("CSV flush failed: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    #[cfg(feature = "pdf")]
    Pdf,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            #[cfg(feature = "pdf")]
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(FleetError::Validation {
                field: "format",
                message: format!("unsupported export format '{other}'"),
            }),
        }
    }

    pub fn exporter(self) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Csv => Box::new(CsvExporter),
            #[cfg(feature = "pdf")]
            ExportFormat::Pdf => Box::new(crate::pdf::PdfExporter),
        }
    }
}

/// Summary lines placed under a report header.
pub fn summary_lines(stats: &ReportStats) -> Vec<(String, String)> {
    vec![
        ("Total fare".to_string(), money_ascii(stats.total_fare)),
        ("Tickets".to_string(), stats.total_tickets.to_string()),
        (
            "Cash".to_string(),
            format!("{} ({})", money_ascii(stats.cash_amount), stats.cash_payments),
        ),
        (
            "Card".to_string(),
            format!("{} ({})", money_ascii(stats.card_amount), stats.card_payments),
        ),
        ("Voided".to_string(), stats.voided_tickets.to_string()),
    ]
}
