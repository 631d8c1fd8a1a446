//! PDF report
//!
//! Same content as the text report, laid out on Letter pages with builtin
//! Helvetica. Rule lines become drawn separators.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::*;

use super::text::{is_rule, page_footer, paginate, report_lines};
use super::ExportError;
use crate::metrics::Summary;
use crate::models::Entry;

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
const FOOTER_Y: f32 = 10.0;
const LINE_HEIGHT: f32 = 5.0;

/// Body lines per PDF page
pub const PDF_LINES_PER_PAGE: usize = 48;

const COLOR_TITLE: (u8, u8, u8) = (193, 53, 132);
const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (128, 128, 128);

fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: Mm,
    y: Mm,
    size: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb(color));
    layer.use_text(text, size, x, y, font);
}

fn add_rule(layer: &PdfLayerReference, y: Mm) {
    layer.set_outline_color(rgb(COLOR_GRAY));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN_LEFT), y), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN_LEFT), y), false),
        ],
        is_closed: false,
    });
}

/// Section headings are bracketed: `[Summary]`
fn is_heading(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(']')
}

/// Render the report to `path`; returns the page count
pub fn write_pdf(
    entries: &[Entry],
    summary: &Summary,
    account: Option<&str>,
    generated_at: &str,
    path: &Path,
) -> Result<usize, ExportError> {
    let lines = report_lines(entries, summary, account, generated_at);
    let pages = paginate(&lines, PDF_LINES_PER_PAGE);
    let total = pages.len();

    let (doc, first_page, first_layer) =
        PdfDocument::new("Instagram Growth Report", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    for (i, page_lines) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", i + 1));
            doc.get_page(page).get_layer(layer)
        };

        let mut y = PAGE_HEIGHT - MARGIN_TOP;
        for line in page_lines {
            if is_rule(line) {
                add_rule(&layer, Mm(y + LINE_HEIGHT / 2.0));
            } else if i == 0 && line == "Instagram Growth Report" {
                add_text(&layer, &font_bold, line, Mm(MARGIN_LEFT), Mm(y), 18.0, COLOR_TITLE);
            } else if is_heading(line) {
                add_text(&layer, &font_bold, line, Mm(MARGIN_LEFT), Mm(y), 12.0, COLOR_BLACK);
            } else if !line.is_empty() {
                add_text(&layer, &font, line, Mm(MARGIN_LEFT), Mm(y), 9.0, COLOR_BLACK);
            }
            y -= LINE_HEIGHT;
        }

        add_text(
            &layer,
            &font,
            &page_footer(i + 1, total),
            Mm(PAGE_WIDTH / 2.0 - 8.0),
            Mm(FOOTER_Y),
            8.0,
            COLOR_GRAY,
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| ExportError::Pdf(e.to_string()))?;

    tracing::info!(path = %path.display(), pages = total, "Wrote PDF report");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::entry;
    use crate::metrics::overall_statistics;

    #[test]
    fn test_writes_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/growth.pdf");
        let entries: Vec<Entry> = (1..=10)
            .map(|i| entry(i, &format!("2024-01-{:02}", i), (100, 100 + i), (50, 50 + i)))
            .collect();
        let summary = overall_statistics(&entries);

        let pages = write_pdf(&entries, &summary, Some("Main"), "2024-02-01 10:00", &path).unwrap();
        assert_eq!(pages, 2);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_empty_report_is_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        let pages = write_pdf(&[], &Summary::default(), None, "now", &path).unwrap();
        assert_eq!(pages, 1);
    }
}
