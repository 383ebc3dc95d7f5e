//! Render model for one submission.
//!
//! Everything here is a pure function of service replies (and, for the local
//! expiry fallback, the current time). The controller decides *when* to
//! render; [`crate::display`] decides how it looks on a terminal.

use chrono::{DateTime, TimeZone};
use expirylens_client::{AnalyzeResponse, ClientError, DetectResponse};
use expirylens_core::{AnnotatedDetection, Detection, clean_date_text, evaluate, parse};

pub const NO_DATES: &str = "No dates detected";
pub const ANALYSIS_UNAVAILABLE: &str = "Expiration date analysis unavailable";
pub const NO_TEXT: &str = "No text found";
pub const NO_EXPIRY: &str = "No expiration date found";

/// What the analysis service says when it found nothing usable.
pub const NO_EXPIRY_SENTINEL: &str =
    "No expiration date found. Please check the image for visible dates.";

// ── Detection results ──

#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    /// 1-based position in the service's list.
    pub index: usize,
    pub text: String,
    /// Detector score as a percentage.
    pub detection_pct: f64,
    pub ocr_pct: f64,
    pub low_confidence: bool,
    pub dimensions: Option<String>,
    /// The service's own date-shape check on the OCR text, when it ran one.
    pub is_date: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionView {
    Results(Vec<ResultItem>),
    Message(String),
}

impl DetectionView {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Message(m) if m.starts_with("Error:"))
    }
}

/// Results area for a detection outcome. Never blank.
pub fn detection_view(outcome: &Result<DetectResponse, ClientError>) -> DetectionView {
    match outcome {
        Ok(resp) if resp.detections.is_empty() => DetectionView::Message(NO_DATES.to_string()),
        Ok(resp) => DetectionView::Results(
            resp.detections
                .iter()
                .enumerate()
                .map(|(i, d)| result_item(i + 1, d))
                .collect(),
        ),
        Err(ClientError::Server { message, .. }) => DetectionView::Message(format!(
            "Error: {}",
            message.as_deref().unwrap_or("Failed to process")
        )),
        Err(ClientError::Http(_)) => DetectionView::Message("Error: Connection failed".to_string()),
        Err(e) => DetectionView::Message(format!("Error: {e}")),
    }
}

fn result_item(index: usize, d: &Detection) -> ResultItem {
    ResultItem {
        index,
        text: if d.ocr_text.is_empty() {
            "Unknown".to_string()
        } else {
            d.ocr_text.clone()
        },
        detection_pct: d.detection_confidence * 100.0,
        ocr_pct: d.ocr_confidence,
        low_confidence: d.is_low_confidence(),
        dimensions: d.dimensions.clone(),
        is_date: d.is_date,
    }
}

// ── Boxes ──

/// A detection box in display coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledBox {
    pub label: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale source-pixel boxes to an image shown `display_width` pixels wide.
///
/// With no display width, or an unknown source width, boxes keep source scale.
pub fn scale_boxes(
    detections: &[AnnotatedDetection],
    image_width: u32,
    display_width: Option<f64>,
) -> Vec<ScaledBox> {
    let scale = match display_width {
        Some(w) if image_width > 0 => w / f64::from(image_width),
        _ => 1.0,
    };
    detections
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let [x1, y1, _, _] = a.detection.bbox;
            ScaledBox {
                label: format!("Date {}", i + 1),
                left: x1 * scale,
                top: y1 * scale,
                width: a.detection.width() * scale,
                height: a.detection.height() * scale,
            }
        })
        .collect()
}

// ── Analysis ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Expired,
    NotExpired,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "EXPIRED",
            Self::NotExpired => "NOT EXPIRED",
        }
    }

    /// Find the `Status: ...` verdict in a multi-line analysis.
    fn from_analysis(text: &str) -> Option<Self> {
        text.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("Status: ")?;
            if rest.starts_with("NOT EXPIRED") {
                Some(Self::NotExpired)
            } else if rest.starts_with("EXPIRED") {
                Some(Self::Expired)
            } else {
                None
            }
        })
    }
}

/// Whether the verdict came from the service or was computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Server,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisBody {
    pub lines: Vec<String>,
    pub status: Option<Status>,
    /// `OCR detected "X" (interpreted as Y)` notes.
    pub notes: Vec<String>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisView {
    Ready {
        original_text: String,
        translated_text: String,
        body: AnalysisBody,
    },
    Unavailable,
}

impl AnalysisView {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Analysis section for an analysis outcome.
///
/// When the service has no verdict but detections exist, the first
/// detection whose text parses as a date is evaluated locally against `now`.
pub fn analysis_view<Tz: TimeZone>(
    outcome: &Result<AnalyzeResponse, ClientError>,
    detections: &[AnnotatedDetection],
    now: &DateTime<Tz>,
) -> AnalysisView {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(_) => return AnalysisView::Unavailable,
    };
    let original_text = non_empty(resp.original_text.as_deref()).unwrap_or(NO_TEXT).to_string();
    let translated_text = non_empty(resp.translated_text.as_deref())
        .unwrap_or(NO_TEXT)
        .to_string();
    let analysis = non_empty(resp.analysis.as_deref());

    let wants_fallback = analysis.is_none_or(|a| a == NO_EXPIRY_SENTINEL);
    let local = if wants_fallback && !detections.is_empty() {
        local_analysis(detections, now)
    } else {
        None
    };

    let body = local.unwrap_or_else(|| server_analysis(analysis.unwrap_or(NO_EXPIRY), detections));
    AnalysisView::Ready {
        original_text,
        translated_text,
        body,
    }
}

fn server_analysis(text: &str, detections: &[AnnotatedDetection]) -> AnalysisBody {
    let lines = text.lines().map(str::to_string).collect();
    if !text.contains("EXPIRED") {
        return AnalysisBody {
            lines,
            status: None,
            notes: Vec::new(),
            source: Source::Server,
        };
    }
    AnalysisBody {
        lines,
        status: Status::from_analysis(text),
        notes: detections.iter().filter_map(AnnotatedDetection::format_note).collect(),
        source: Source::Server,
    }
}

/// Evaluate the first detection that reads as a date.
///
/// The raw OCR text is tried first, then the text with label words such as
/// "EXP" removed.
pub fn local_analysis<Tz: TimeZone>(
    detections: &[AnnotatedDetection],
    now: &DateTime<Tz>,
) -> Option<AnalysisBody> {
    detections.iter().find_map(|item| {
        let raw = item.detection.ocr_text.as_str();
        if raw.is_empty() {
            return None;
        }
        let date = parse(raw).or_else(|| parse(&clean_date_text(raw)))?;
        let verdict = evaluate(&date, now);
        tracing::info!(text = raw, days = verdict.days_diff, "evaluated expiry locally");
        let status = if verdict.is_expired {
            Status::Expired
        } else {
            Status::NotExpired
        };
        Some(AnalysisBody {
            lines: vec![
                format!("Expiration Date: {}", date.format_dmy()),
                format!("Original Format: {raw}"),
                format!("Status: {}", verdict.status()),
                format!("Time: {}", verdict.time_text()),
            ],
            status: Some(status),
            notes: item.format_note().into_iter().collect(),
            source: Source::Local,
        })
    })
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use expirylens_core::annotate;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap()
    }

    fn detected(texts: &[&str]) -> Vec<AnnotatedDetection> {
        let raw: Vec<Detection> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let x = i as f64 * 100.0;
                Detection::new([x, 10.0, x + 50.0, 30.0], t, 0.8, 75.0)
            })
            .collect();
        annotate(&raw)
    }

    fn analysis(text: Option<&str>) -> Result<AnalyzeResponse, ClientError> {
        Ok(AnalyzeResponse {
            original_text: Some("원문".into()),
            translated_text: Some("translated".into()),
            analysis: text.map(str::to_string),
            ..Default::default()
        })
    }

    fn body(view: &AnalysisView) -> &AnalysisBody {
        match view {
            AnalysisView::Ready { body, .. } => body,
            AnalysisView::Unavailable => panic!("expected analysis"),
        }
    }

    #[test]
    fn results_list_items() {
        let outcome = Ok(DetectResponse {
            detections: vec![
                Detection::new([0.0; 4], "2022.07.19", 0.912, 88.04),
                Detection::new([0.0; 4], "", 0.5, 12.0),
            ],
            image_width: 100,
            image_height: 100,
            ..Default::default()
        });
        let DetectionView::Results(items) = detection_view(&outcome) else {
            panic!("expected results");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 1);
        assert!((items[0].detection_pct - 91.2).abs() < 1e-9);
        assert!(!items[0].low_confidence);
        assert_eq!(items[1].text, "Unknown");
        assert!(items[1].low_confidence);
        assert_eq!(items[1].is_date, None);
    }

    #[test]
    fn empty_detections_message() {
        let view = detection_view(&Ok(DetectResponse::default()));
        assert_eq!(view, DetectionView::Message(NO_DATES.into()));
        assert!(!view.is_error());
    }

    #[test]
    fn server_error_message() {
        let with_msg = Err(ClientError::Server {
            status: 400,
            message: Some("Invalid file type".into()),
        });
        assert_eq!(
            detection_view(&with_msg),
            DetectionView::Message("Error: Invalid file type".into())
        );
        let without = Err(ClientError::Server {
            status: 500,
            message: None,
        });
        let view = detection_view(&without);
        assert_eq!(view, DetectionView::Message("Error: Failed to process".into()));
        assert!(view.is_error());
    }

    #[test]
    fn boxes_scale_to_display_width() {
        let detections = detected(&["a", "b"]);
        let boxes = scale_boxes(&detections, 800, Some(400.0));
        assert_eq!(
            boxes[1],
            ScaledBox {
                label: "Date 2".into(),
                left: 50.0,
                top: 5.0,
                width: 25.0,
                height: 10.0,
            }
        );
    }

    #[test]
    fn boxes_unscaled_without_width() {
        let detections = detected(&["a"]);
        assert_eq!(scale_boxes(&detections, 800, None)[0].width, 50.0);
        assert_eq!(scale_boxes(&detections, 0, Some(400.0))[0].width, 50.0);
    }

    #[test]
    fn unavailable_on_error() {
        let outcome = Err(ClientError::Server {
            status: 500,
            message: None,
        });
        assert!(analysis_view(&outcome, &[], &now()).is_unavailable());
    }

    #[test]
    fn server_verdict_with_status_and_notes() {
        let text = "Expiration Date: 28-01-2025\nOriginal Format: 202501/28\nStatus: NOT EXPIRED\nTime: 7 days remaining";
        let detections = detected(&["202501/28", "hello"]);
        let view = analysis_view(&analysis(Some(text)), &detections, &now());
        let b = body(&view);
        assert_eq!(b.source, Source::Server);
        assert_eq!(b.lines.len(), 4);
        assert_eq!(b.status, Some(Status::NotExpired));
        assert_eq!(
            b.notes,
            ["OCR detected \"202501/28\" (interpreted as 28/01/2025)"]
        );
    }

    #[test]
    fn server_text_without_verdict_is_plain() {
        let text = "sorry , i couldn't find any dates on this product ! try another image please";
        let view = analysis_view(&analysis(Some(text)), &detected(&["2022.07.19"]), &now());
        let b = body(&view);
        assert_eq!(b.lines, [text]);
        assert_eq!(b.status, None);
        assert!(b.notes.is_empty());
    }

    #[test]
    fn sentinel_triggers_local_fallback() {
        let detections = detected(&["hello", "2022.07.19"]);
        let view = analysis_view(&analysis(Some(NO_EXPIRY_SENTINEL)), &detections, &now());
        let b = body(&view);
        assert_eq!(b.source, Source::Local);
        assert_eq!(
            b.lines,
            [
                "Expiration Date: 19-07-2022",
                "Original Format: 2022.07.19",
                "Status: EXPIRED",
                "Time: 917 days ago",
            ]
        );
        assert_eq!(b.status, Some(Status::Expired));
        assert_eq!(
            b.notes,
            ["OCR detected \"2022.07.19\" (interpreted as 19/07/2022)"]
        );
    }

    #[test]
    fn missing_analysis_triggers_local_fallback() {
        let detections = detected(&["03/02/2025"]);
        let view = analysis_view(&analysis(None), &detections, &now());
        let b = body(&view);
        assert_eq!(b.source, Source::Local);
        assert_eq!(b.status, Some(Status::NotExpired));
        assert_eq!(b.lines[3], "Time: 13 days remaining");
        assert!(b.notes.is_empty());
    }

    #[test]
    fn fallback_tries_cleaned_text() {
        let detections = detected(&["EXP 2022.07.19"]);
        let b = local_analysis(&detections, &now()).unwrap();
        assert_eq!(b.lines[1], "Original Format: EXP 2022.07.19");
        assert_eq!(b.lines[2], "Status: EXPIRED");
    }

    #[test]
    fn fallback_without_parsable_detection_shows_server_text() {
        let detections = detected(&["hello"]);
        let view = analysis_view(&analysis(Some(NO_EXPIRY_SENTINEL)), &detections, &now());
        let b = body(&view);
        assert_eq!(b.source, Source::Server);
        assert_eq!(b.lines, [NO_EXPIRY_SENTINEL]);
    }

    #[test]
    fn no_detections_no_fallback() {
        let view = analysis_view(&analysis(None), &[], &now());
        let AnalysisView::Ready {
            original_text,
            translated_text,
            body,
        } = view
        else {
            panic!("expected analysis");
        };
        assert_eq!(original_text, "원문");
        assert_eq!(translated_text, "translated");
        assert_eq!(body.lines, [NO_EXPIRY]);
    }

    #[test]
    fn empty_texts_use_defaults() {
        let outcome = Ok(AnalyzeResponse {
            original_text: Some(String::new()),
            ..Default::default()
        });
        let AnalysisView::Ready {
            original_text,
            translated_text,
            ..
        } = analysis_view(&outcome, &[], &now())
        else {
            panic!("expected analysis");
        };
        assert_eq!(original_text, NO_TEXT);
        assert_eq!(translated_text, NO_TEXT);
    }

    #[test]
    fn status_parsing_prefers_not_expired() {
        assert_eq!(Status::from_analysis("Status: NOT EXPIRED"), Some(Status::NotExpired));
        assert_eq!(Status::from_analysis("x\nStatus: EXPIRED\n"), Some(Status::Expired));
        assert_eq!(Status::from_analysis("EXPIRED"), None);
    }
}
