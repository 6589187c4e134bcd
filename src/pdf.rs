use std::io::BufWriter;

use printpdf::*;

use crate::error::{FleetError, Result};
use crate::export::{summary_lines, ExportMeta, ExportRow, Exporter, COLUMNS};
use crate::fmt::money_ascii;

// A4 landscape (mm); nine columns do not fit portrait.
const PAGE_W: f32 = 297.0;
const PAGE_H: f32 = 210.0;
const MARGIN_TOP: f32 = 18.0;
const MARGIN_BOTTOM: f32 = 18.0;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_RIGHT: f32 = 15.0;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// Cut `text` so it fits `width` at `size`, marking the cut with "..".
fn fit(text: &str, width: f32, size: f32) -> String {
    if approx_text_width(text, size) <= width - 1.0 {
        return text.to_string();
    }
    let max_chars = ((width - 1.0) / (size * 0.18)).floor().max(3.0) as usize;
    let kept: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{kept}..")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| FleetError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| FleetError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    /// Returns true when a new page was started.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
            return true;
        }
        false
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold {
            self.font_bold.clone()
        } else {
            self.font.clone()
        };
        let layer = self
            .doc
            .get_page(self.current_page)
            .get_layer(self.current_layer);
        layer.use_text(s, size, Mm(x), Mm(self.pdf_y()), &font);
    }

    fn hline(&self, x1: f32, x2: f32) {
        let layer = self
            .doc
            .get_page(self.current_page)
            .get_layer(self.current_layer);
        layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(x1), Mm(self.pdf_y())), false),
                (Point::new(Mm(x2), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        };
        layer.add_line(line);
    }

    fn header(&mut self, title: &str, organization: &str, date_range: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        if !organization.is_empty() {
            self.text(organization, MARGIN_LEFT, SUBTITLE_SIZE, false);
            self.y += 5.0;
        }
        self.text(date_range, MARGIN_LEFT, SUBTITLE_SIZE, false);
        self.y += 5.0;
        let ts = chrono::Local::now()
            .format("Generated %Y-%m-%d %H:%M")
            .to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 5.0;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        self.cells(cols, headers, true);
        self.y += ROW_H;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    /// A body row; repeats the column header when the row spills onto a new page.
    fn table_row(&mut self, cols: &[Col], headers: &[&str], values: &[&str]) {
        if self.ensure_space(ROW_H) {
            self.table_header(cols, headers);
        }
        self.cells(cols, values, false);
        self.y += ROW_H;
    }

    fn cells(&self, cols: &[Col], values: &[&str], bold: bool) {
        let mut x = MARGIN_LEFT;
        for (col, value) in cols.iter().zip(values) {
            let value = fit(value, col.width, FONT_SIZE);
            match col.align {
                Align::Left => self.text(&value, x, FONT_SIZE, bold),
                Align::Right => {
                    let tw = approx_text_width(&value, FONT_SIZE);
                    self.text(&value, x + col.width - tw, FONT_SIZE, bold);
                }
            }
            x += col.width;
        }
    }

    fn key_value(&mut self, key: &str, value: &str) {
        self.ensure_space(ROW_H);
        self.text(key, MARGIN_LEFT, FONT_SIZE, true);
        self.text(value, MARGIN_LEFT + 35.0, FONT_SIZE, false);
        self.y += ROW_H;
    }

    fn blank_row(&mut self) {
        self.y += ROW_H;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| FleetError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| FleetError::Pdf(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

pub fn render_transactions(meta: &ExportMeta, rows: &[ExportRow]) -> Result<Vec<u8>> {
    let title = if meta.title.is_empty() {
        "Transaction Overview"
    } else {
        meta.title.as_str()
    };
    let mut pdf = PdfWriter::new(title)?;
    pdf.header(title, &meta.organization, &meta.date_range);

    if let Some(stats) = &meta.stats {
        for (key, value) in summary_lines(stats) {
            pdf.key_value(&key, &value);
        }
        pdf.blank_row();
    }

    let cols = &[
        Col { width: 12.0, align: Align::Right },
        Col { width: 24.0, align: Align::Left },
        Col { width: 26.0, align: Align::Right },
        Col { width: 20.0, align: Align::Left },
        Col { width: 44.0, align: Align::Left },
        Col { width: 44.0, align: Align::Left },
        Col { width: 37.0, align: Align::Left },
        Col { width: 30.0, align: Align::Left },
        Col { width: 30.0, align: Align::Left },
    ];
    pdf.table_header(cols, &COLUMNS);

    for row in rows {
        let number = row.number.to_string();
        let fare = money_ascii(row.fare);
        pdf.table_row(
            cols,
            &COLUMNS,
            &[
                number.as_str(),
                row.date.as_str(),
                fare.as_str(),
                row.payment.as_str(),
                row.pick_up.as_str(),
                row.drop_off.as_str(),
                row.driver.as_str(),
                row.invoice.as_str(),
                row.status.as_str(),
            ],
        );
    }

    if rows.is_empty() {
        pdf.text("No transactions in this range.", MARGIN_LEFT, FONT_SIZE, false);
    }

    pdf.to_bytes()
}

pub struct PdfExporter;

impl Exporter for PdfExporter {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn export(&self, meta: &ExportMeta, rows: &[ExportRow]) -> Result<Vec<u8>> {
        render_transactions(meta, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::BoundaryZone;
    use crate::reports::{compute_stats, normalize};
    use serde_json::json;

    fn rows(n: usize) -> (Vec<ExportRow>, crate::reports::ReportStats) {
        let records: Vec<_> = (0..n)
            .map(|i| {
                normalize(
                    &format!("t{i}"),
                    &json!({"timestamp": "2024-01-10T08:00:00Z", "farePrice": 13 + i,
                            "paymentMethod": if i % 2 == 0 { "Cash" } else { "Card" },
                            "pickUp": "Monumento Terminal, Caloocan City, Metro Manila"}),
                    BoundaryZone::utc(),
                )
            })
            .collect();
        let stats = compute_stats(&records);
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, r)| ExportRow::from_record(i + 1, r, BoundaryZone::utc()))
            .collect();
        (rows, stats)
    }

    #[test]
    fn test_render_transactions_produces_pdf() {
        let (rows, stats) = rows(3);
        let meta = ExportMeta {
            title: "Transaction Overview".into(),
            organization: "Metro Transit Coop".into(),
            date_range: "2024-01-10".into(),
            stats: Some(stats),
        };
        let bytes = PdfExporter.export(&meta, &rows).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_spills_onto_more_pages() {
        let (rows, _) = rows(120);
        let bytes = render_transactions(&ExportMeta::default(), &rows).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_empty() {
        let bytes = render_transactions(&ExportMeta::default(), &[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_fit_truncates_long_text() {
        assert_eq!(fit("Cash", 20.0, FONT_SIZE), "Cash");
        let cut = fit("Monumento Terminal, Caloocan City", 20.0, FONT_SIZE);
        assert!(cut.ends_with(".."));
        assert!(cut.chars().count() < 33);
    }
}
