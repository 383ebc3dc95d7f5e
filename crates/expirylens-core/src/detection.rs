//! Detection records returned by the detection service.

use serde::{Deserialize, Deserializer, Serialize};

use crate::date::DateFormat;

/// One date region found in an uploaded image.
///
/// Wire names follow the detection service (`paddle_text`,
/// `paddle_confidence`). Missing or null fields fall back to empty/zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    /// Pixel box `[x1, y1, x2, y2]` in source-image coordinates.
    #[serde(default, deserialize_with = "null_default")]
    pub bbox: [f64; 4],
    #[serde(rename = "paddle_text", default, deserialize_with = "null_default")]
    pub ocr_text: String,
    /// Detector score in `0..=1`.
    #[serde(default, deserialize_with = "null_default")]
    pub detection_confidence: f64,
    /// OCR score in `0..=100`.
    #[serde(rename = "paddle_confidence", default, deserialize_with = "null_default")]
    pub ocr_confidence: f64,
    /// Crop size as reported by the service, e.g. `"120x40px"`.
    #[serde(default)]
    pub dimensions: Option<String>,
    /// Whether the service judged the OCR text date-shaped.
    #[serde(default)]
    pub is_date: Option<bool>,
}

impl Detection {
    pub fn new(bbox: [f64; 4], ocr_text: &str, detection_confidence: f64, ocr_confidence: f64) -> Self {
        Self {
            bbox,
            ocr_text: ocr_text.to_string(),
            detection_confidence,
            ocr_confidence,
            dimensions: None,
            is_date: None,
        }
    }

    pub fn width(&self) -> f64 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f64 {
        self.bbox[3] - self.bbox[1]
    }

    pub fn is_low_confidence(&self) -> bool {
        self.ocr_confidence < 50.0
    }

    /// The fields sent back to the analysis service.
    pub fn payload(&self) -> DetectionPayload<'_> {
        DetectionPayload {
            paddle_text: &self.ocr_text,
            detection_confidence: self.detection_confidence,
            paddle_confidence: self.ocr_confidence,
            bbox: self.bbox,
        }
    }
}

/// Cleaned projection of a [`Detection`] for the `detections` form field.
#[derive(Debug, Serialize)]
pub struct DetectionPayload<'a> {
    pub paddle_text: &'a str,
    pub detection_confidence: f64,
    pub paddle_confidence: f64,
    pub bbox: [f64; 4],
}

/// A detection paired with its day-first reading, when the OCR text is in a
/// compact format.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedDetection {
    pub detection: Detection,
    /// `DD/MM/YYYY` built from the raw digits, e.g. `"28/01/2025"`.
    pub formatted_date: Option<String>,
}

impl AnnotatedDetection {
    /// `OCR detected "X" (interpreted as Y)`, for annotated detections only.
    pub fn format_note(&self) -> Option<String> {
        self.formatted_date.as_ref().map(|formatted| {
            format!(
                "OCR detected \"{}\" (interpreted as {})",
                self.detection.ocr_text, formatted
            )
        })
    }
}

/// Annotate detections without touching the originals.
pub fn annotate(detections: &[Detection]) -> Vec<AnnotatedDetection> {
    detections
        .iter()
        .map(|d| AnnotatedDetection {
            detection: d.clone(),
            formatted_date: compact_format(&d.ocr_text),
        })
        .collect()
}

/// Rewrite `YYYYMM/DD`, `YYYYMMDD` or `YYYY.MM.DD` as `DD/MM/YYYY`.
///
/// Works on the raw substrings: no range check, and the day keeps whatever
/// width it had (`"202501/5"` gives `"5/01/2025"`).
pub fn compact_format(text: &str) -> Option<String> {
    let compact = [
        DateFormat::CompactYmSlashD,
        DateFormat::CompactYmd,
        DateFormat::DottedYmd,
    ];
    if !compact.iter().any(|f| f.matches_shape(text)) {
        return None;
    }
    let year = text.get(0..4)?;
    let (month, day) = if text.contains('/') {
        (text.get(4..6)?, text.split('/').nth(1)?)
    } else if text.contains('.') {
        (text.get(5..7)?, text.get(8..10)?)
    } else {
        (text.get(4..6)?, text.get(6..8)?)
    };
    Some(format!("{day}/{month}/{year}"))
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
