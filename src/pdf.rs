use std::io::BufWriter;

use printpdf::*;

use crate::error::{ReimburseError, Result};
use crate::fmt::money;
use crate::report::{Report, Rows};
use crate::transactions::TypeSummary;

// A4 dimensions (mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_TOP: f32 = 25.4;
const MARGIN_BOTTOM: f32 = 25.4;
const MARGIN_LEFT: f32 = 19.05;
const MARGIN_RIGHT: f32 = 19.05;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 10.0;
const LABEL_W: f32 = 60.0;
const VALUE_W: f32 = PAGE_W - MARGIN_LEFT - MARGIN_RIGHT - LABEL_W;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// Cut `text` so it fits `width` mm at `size`, marking the cut with "...".
fn fit(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * 0.18)) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
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
            .map_err(|e| ReimburseError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReimburseError::Pdf(format!("{e:?}")))?;
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

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
        }
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

    /// Level 1 is the largest.
    fn heading(&mut self, label: &str, level: u8) {
        let size = match level {
            1 => 16.0,
            2 => 13.0,
            _ => 11.0,
        };
        self.ensure_space(ROW_H * 3.0);
        self.y += 3.0;
        self.text(label, MARGIN_LEFT, size, true);
        self.y += size * 0.5;
        if level == 1 {
            self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
            self.y += 3.0;
        }
    }

    fn paragraph(&mut self, line: &str) {
        self.ensure_space(ROW_H);
        let line = fit(line, PAGE_W - MARGIN_LEFT - MARGIN_RIGHT, FONT_SIZE);
        self.text(&line, MARGIN_LEFT, FONT_SIZE, false);
        self.y += ROW_H;
    }

    fn table_row(&mut self, label: &str, value: &str, align: Align, bold: bool) {
        self.ensure_space(ROW_H);
        self.text(&fit(label, LABEL_W, FONT_SIZE), MARGIN_LEFT, FONT_SIZE, bold);
        let value = fit(value, VALUE_W, FONT_SIZE);
        let x = match align {
            Align::Left => MARGIN_LEFT + LABEL_W,
            Align::Right => PAGE_W - MARGIN_RIGHT - approx_text_width(&value, FONT_SIZE),
        };
        self.text(&value, x, FONT_SIZE, bold);
        self.y += ROW_H;
    }

    fn table(&mut self, rows: &Rows) {
        for (label, value) in rows {
            self.table_row(label, value, Align::Left, false);
        }
        self.blank_row();
    }

    fn type_table(&mut self, summary: &TypeSummary) {
        let rows: Vec<_> = summary.rows().collect();
        let last = rows.len().saturating_sub(1);
        for (i, (label, value)) in rows.into_iter().enumerate() {
            if i == last {
                self.separator();
            }
            self.table_row(label, &money(value), Align::Right, i == last);
        }
        self.blank_row();
    }

    fn blank_row(&mut self) {
        self.y += ROW_H;
    }

    fn separator(&mut self) {
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReimburseError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| ReimburseError::Pdf(e.to_string()))
    }
}

/// Render the reimbursement document.
pub fn render_report(report: &Report) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new(&report.name)?;

    pdf.paragraph(&format!("From: {}", report.from));
    pdf.paragraph(&format!("To: {}", report.to));
    pdf.paragraph(&format!("Date: {}", report.date.format("%b %d, %Y")));

    pdf.heading("Total", 1);
    pdf.paragraph(&format!(
        "Total amount for re-imbursement: {}",
        money(report.total_charges)
    ));
    pdf.paragraph(&format!("Total invoices: {}", report.count));

    pdf.heading("Charges by type", 2);
    pdf.type_table(&report.by_type);

    pdf.heading("Summary by Freelancer", 1);
    for section in &report.freelancers {
        pdf.heading(&section.name, 2);
        pdf.table(&section.metadata);

        pdf.heading("By type of charge", 3);
        pdf.type_table(&section.by_type);

        pdf.heading(&format!("Detailed transactions for {}", section.name), 3);
        pdf.paragraph("See invoices by Ref ID for details");
        pdf.blank_row();
        for rows in &section.transactions {
            pdf.table(rows);
        }
    }

    pdf.to_bytes()
}
