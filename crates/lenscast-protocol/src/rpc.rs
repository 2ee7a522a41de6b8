//! Protobuf messages for the `image_service.ImageProcessor` backend.
//!
//! Field tags mirror the backend's `image_service.proto`:
//!
//! ```text
//! service ImageProcessor { rpc ProcessImage(ImageRequest) returns (ImageResponse); }
//! ```

use crate::types;

pub const PROCESS_IMAGE_PATH: &str = "/image_service.ImageProcessor/ProcessImage";

#[derive(Clone, PartialEq, prost::Message)]
pub struct ImageRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub image_data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub image_format: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ImageResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub image_info: Option<ImageInfo>,
    #[prost(message, optional, tag = "4")]
    pub color_info: Option<ColorInfo>,
    #[prost(message, repeated, tag = "5")]
    pub bounding_boxes: Vec<BoundingBox>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ImageInfo {
    #[prost(uint32, tag = "1")]
    pub width: u32,
    #[prost(uint32, tag = "2")]
    pub height: u32,
    #[prost(string, tag = "3")]
    pub format: String,
    #[prost(uint64, tag = "4")]
    pub size_bytes: u64,
    #[prost(float, tag = "5")]
    pub aspect_ratio: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ColorInfo {
    #[prost(string, tag = "1")]
    pub dominant_color: String,
    #[prost(bool, tag = "2")]
    pub is_grayscale: bool,
    #[prost(bool, tag = "3")]
    pub has_transparency: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BoundingBox {
    #[prost(float, tag = "1")]
    pub x1: f32,
    #[prost(float, tag = "2")]
    pub y1: f32,
    #[prost(float, tag = "3")]
    pub x2: f32,
    #[prost(float, tag = "4")]
    pub y2: f32,
    #[prost(string, tag = "5")]
    pub label: String,
    #[prost(float, tag = "6")]
    pub confidence: f32,
}

impl From<ImageInfo> for types::ImageInfo {
    fn from(info: ImageInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            format: info.format,
            size_bytes: info.size_bytes,
            aspect_ratio: info.aspect_ratio,
        }
    }
}

impl From<ColorInfo> for types::ColorInfo {
    fn from(info: ColorInfo) -> Self {
        Self {
            dominant_color: info.dominant_color,
            is_grayscale: info.is_grayscale,
            has_transparency: info.has_transparency,
        }
    }
}

impl From<BoundingBox> for types::BoundingBox {
    fn from(b: BoundingBox) -> Self {
        Self {
            x1: b.x1,
            y1: b.y1,
            x2: b.x2,
            y2: b.y2,
            label: b.label,
            confidence: b.confidence,
        }
    }
}

impl From<ImageResponse> for types::AnalysisResult {
    fn from(response: ImageResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            image_info: response.image_info.map(Into::into),
            color_info: response.color_info.map(Into::into),
            bounding_boxes: response.bounding_boxes.into_iter().map(Into::into).collect(),
        }
    }
}
