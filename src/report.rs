//! PDF diagnostic reports.

use std::io::BufWriter;

use chrono::{DateTime, Local};
use printpdf::*;
use serde_json::Value;

pub const REPORT_TITLE: &str = "Heal-Io Diagnostic Report";

const DISCLAIMER: &str = "This report was generated by an automated screening tool and is not a \
     medical diagnosis. Please consult a qualified healthcare professional.";

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const WRAP_COLUMNS: usize = 90;

#[derive(Debug, thiserror::Error)]
#[error("PDF generation failed: {0}")]
pub struct ReportError(String);

pub fn report_file_name(now: &DateTime<Local>) -> String {
    format!("heal-io-diagnosis-report-{}.pdf", now.format("%Y-%m-%d"))
}

/// Cursor over the document that starts a fresh page when the current one fills up.
struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Writer {
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(12.0);
        self.y -= 4.0;
        self.layer.use_text(text, 11.0, Mm(20.0), Mm(self.y), &self.bold);
        self.y -= 6.0;
    }

    fn paragraph(&mut self, text: &str, indent: f32) {
        for line in wrap_text(text, WRAP_COLUMNS) {
            self.ensure_room(4.5);
            self.layer.use_text(&line, 9.0, Mm(20.0 + indent), Mm(self.y), &self.font);
            self.y -= 4.5;
        }
    }

    fn field(&mut self, label: &str, value: &str) {
        self.paragraph(&format!("{label}: {value}"), 0.0);
    }
}

/// Render a diagnosis JSON object into PDF bytes.
pub fn generate_report(patient_name: &str, diagnosis: &Value, now: &DateTime<Local>) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) = PdfDocument::new(REPORT_TITLE, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError(format!("font: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError(format!("font: {e}")))?;

    let mut w = Writer { doc, layer, font, bold, y: TOP };

    w.layer.use_text(REPORT_TITLE, 16.0, Mm(20.0), Mm(w.y), &w.bold);
    w.y -= 10.0;
    w.field("Date", &now.format("%B %d, %Y").to_string());
    w.field("Time", &now.format("%I:%M %p").to_string());
    w.field("Patient", patient_name);

    w.heading("DIAGNOSIS");
    w.field("Condition", text_or(diagnosis, "disease", "Unknown"));
    if let Some(confidence) = diagnosis.get("confidence").and_then(Value::as_f64) {
        w.field("Confidence", &format!("{:.1}%", confidence * 100.0));
    }
    if let Some(severity) = diagnosis.get("severity").and_then(Value::as_str) {
        w.field("Severity", severity);
    }
    if let Some(description) = diagnosis.get("description").and_then(Value::as_str) {
        w.paragraph(description, 0.0);
    }

    if let Some(explanation) = diagnosis.get("explanation").and_then(Value::as_str) {
        w.heading("EXPLANATION");
        w.paragraph(explanation, 0.0);
    }

    let alternatives = list(diagnosis, "alternative_diagnoses");
    if !alternatives.is_empty() {
        w.heading("ALTERNATIVE DIAGNOSES");
        for alt in alternatives {
            let line = match (alt.get("disease").and_then(Value::as_str), alt.get("confidence").and_then(Value::as_f64)) {
                (Some(name), Some(conf)) => format!("- {name} ({:.1}%)", conf * 100.0),
                (Some(name), None) => format!("- {name}"),
                _ => format!("- {}", display(alt)),
            };
            w.paragraph(&line, 5.0);
        }
    }

    let recommendations = list(diagnosis, "recommendations");
    if !recommendations.is_empty() {
        w.heading("RECOMMENDATIONS");
        for (i, rec) in recommendations.iter().enumerate() {
            w.paragraph(&format!("{}. {}", i + 1, display(rec)), 5.0);
        }
    }

    if let Some(method) = diagnosis.get("analysis_method").and_then(Value::as_str) {
        w.heading("ANALYSIS METHOD");
        w.paragraph(method, 0.0);
    }

    w.heading("DISCLAIMER");
    w.paragraph(DISCLAIMER, 0.0);

    let mut buf = BufWriter::new(Vec::new());
    w.doc
        .save(&mut buf)
        .map_err(|e| ReportError(format!("save: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError(format!("buffer: {e}")))
}

fn text_or<'a>(value: &'a Value, key: &str, default: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
