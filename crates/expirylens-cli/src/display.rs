//! Terminal rendering for submission reports.
//!
//! Prints a [`Report`] as a card: detection results, boxes, extracted text,
//! then the expiry analysis.

use std::io::{self, Write};

use chrono::{DateTime, TimeZone};
use expirylens_core::{compact_format, evaluate, parse_format};

use crate::controller::{Report, Session};
use crate::render::{AnalysisView, DetectionView, ScaledBox, Source};

// ── Public API ──

pub fn print_session(session: &Session) -> io::Result<()> {
    write_session(&mut io::stdout().lock(), session)
}

pub fn write_session(out: &mut impl Write, session: &Session) -> io::Result<()> {
    let report = &session.report;
    writeln!(out, "=== {} ===", report.file_name)?;
    if session.image_width > 0 {
        writeln!(out, "{}x{}px", session.image_width, session.image_height)?;
    }
    if let Some(path) = &session.image_path {
        writeln!(out, "stored at {path}")?;
    }
    writeln!(out)?;
    write_report(out, report)
}

pub fn write_report(out: &mut impl Write, report: &Report) -> io::Result<()> {
    write_detection(out, &report.detection)?;
    if !report.boxes.is_empty() {
        write_boxes(out, &report.boxes)?;
    }
    write_analysis(out, &report.analysis)
}

pub fn print_boxes(boxes: &[ScaledBox]) -> io::Result<()> {
    write_boxes(&mut io::stdout().lock(), boxes)
}

/// One line per token: winning format, calendar date, verdict.
pub fn write_parsed<Tz: TimeZone>(
    out: &mut impl Write,
    texts: &[String],
    now: &DateTime<Tz>,
) -> io::Result<()> {
    for text in texts {
        match parse_format(text) {
            Some((format, date)) => {
                let verdict = evaluate(&date, now);
                write!(
                    out,
                    "  {:<14} {:<11} {}  {:<11}  {}",
                    text,
                    format.as_str(),
                    date.format_dmy(),
                    verdict.status(),
                    verdict.time_text()
                )?;
                if let Some(formatted) = compact_format(text) {
                    write!(out, "  (interpreted as {formatted})")?;
                }
                writeln!(out)?;
            }
            None => writeln!(out, "  {:<14} no date found", text)?,
        }
    }
    Ok(())
}

// ── Sections ──

fn write_detection(out: &mut impl Write, view: &DetectionView) -> io::Result<()> {
    writeln!(out, "Detection Results")?;
    match view {
        DetectionView::Message(message) => writeln!(out, "  {message}")?,
        DetectionView::Results(items) => {
            for item in items {
                writeln!(out, "  Date {}: {}", item.index, item.text)?;
                writeln!(out, "    {:<12} {:.1}%", "Detection:", item.detection_pct)?;
                write!(out, "    {:<12} {:.1}%", "OCR:", item.ocr_pct)?;
                if item.low_confidence {
                    write!(out, "  Low confidence")?;
                }
                writeln!(out)?;
                if let Some(dims) = &item.dimensions {
                    writeln!(out, "    {:<12} {}", "Region:", dims)?;
                }
                if let Some(is_date) = item.is_date {
                    let shape = if is_date { "date" } else { "not a date" };
                    writeln!(out, "    {:<12} {}", "Reads as:", shape)?;
                }
            }
        }
    }
    writeln!(out)
}

fn write_boxes(out: &mut impl Write, boxes: &[ScaledBox]) -> io::Result<()> {
    writeln!(out, "Boxes")?;
    for b in boxes {
        writeln!(
            out,
            "  {:<8} left {:>7.1}  top {:>7.1}  width {:>7.1}  height {:>7.1}",
            b.label, b.left, b.top, b.width, b.height
        )?;
    }
    writeln!(out)
}

fn write_analysis(out: &mut impl Write, view: &AnalysisView) -> io::Result<()> {
    let (original_text, translated_text, body) = match view {
        AnalysisView::Unavailable => {
            writeln!(out, "Analysis")?;
            return writeln!(out, "  {}", crate::render::ANALYSIS_UNAVAILABLE);
        }
        AnalysisView::Ready {
            original_text,
            translated_text,
            body,
        } => (original_text, translated_text, body),
    };

    writeln!(out, "Text")?;
    writeln!(out, "  {:<12} {}", "original", original_text)?;
    writeln!(out, "  {:<12} {}", "translated", translated_text)?;
    writeln!(out)?;

    match body.source {
        Source::Server => writeln!(out, "Analysis")?,
        Source::Local => writeln!(out, "Analysis (evaluated locally)")?,
    }
    for line in &body.lines {
        writeln!(out, "  {line}")?;
    }
    for note in &body.notes {
        writeln!(out, "  {note}")?;
    }
    Ok(())
}
