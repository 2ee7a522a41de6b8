use serde::{Deserialize, Serialize};

/// Image container formats the capture side can produce and the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Parse a format name as sent on the wire (`"jpeg"`, `"jpg"`, `"png"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Some(Self::Jpeg),
            "png" | "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/process-image`.
///
/// Both fields default so that a missing or `null` `image_data` reaches the
/// gateway's own validation instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessImageRequest {
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub image_format: Option<String>,
}

/// Pixel dimensions and container details reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
    pub aspect_ratio: f32,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32, format: impl Into<String>, size_bytes: u64) -> Self {
        let aspect_ratio = if height == 0 {
            0.0
        } else {
            width as f32 / height as f32
        };
        Self {
            width,
            height,
            format: format.into(),
            size_bytes,
            aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorInfo {
    /// `#RRGGBB`
    pub dominant_color: String,
    pub is_grayscale: bool,
    pub has_transparency: bool,
}

/// One detection, in the order the detector produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: String,
    pub confidence: f32,
}

/// Result of analysing one frame.
///
/// `image_info` and `color_info` serialize as `null` when absent and
/// `bounding_boxes` is always an array; clients rely on every key being present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub image_info: Option<ImageInfo>,
    #[serde(default)]
    pub color_info: Option<ColorInfo>,
    #[serde(default)]
    pub bounding_boxes: Vec<BoundingBox>,
}

impl AnalysisResult {
    /// An unsuccessful result carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            image_info: None,
            color_info: None,
            bounding_boxes: Vec::new(),
        }
    }
}

/// `{success, message}` body used for gateway-level errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBody {
    pub success: bool,
    pub message: String,
}

impl StatusBody {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Liveness payload returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}
