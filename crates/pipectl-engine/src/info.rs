//! Subsystem and scene item descriptors.

use serde::{Deserialize, Serialize};

/// Pixel formats understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoFormat {
    /// Packed 8-bit RGBA.
    Rgba,

    /// Planar 4:2:0 YUV.
    I420,
}

/// Scaling filter used when output size differs from the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    Bilinear,
}

/// Speaker layout of the audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeakerLayout {
    Stereo,
}

/// Video subsystem configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Graphics module to render with.
    pub graphics_module: String,

    /// Display adapter index.
    pub adapter: u32,

    /// Canvas size.
    pub base_width: u32,
    pub base_height: u32,

    /// Rendered output size.
    pub output_width: u32,
    pub output_height: u32,

    /// Frame rate as a fraction.
    pub fps_num: u32,
    pub fps_den: u32,

    pub output_format: VideoFormat,
    pub scale_type: ScaleType,
}

/// Audio subsystem configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Sample rate in Hz.
    pub samples_per_sec: u32,

    pub speakers: SpeakerLayout,
}

/// How a scene item is fitted into its bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundsType {
    /// No bounds; the item keeps its natural size.
    #[default]
    None,

    /// Stretch to fill the bounds.
    Stretch,

    /// Scale to fit inside the bounds, keeping aspect ratio.
    ScaleInner,
}

/// A 2D vector in canvas pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Placement of a scene item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformInfo {
    pub pos: Vec2,
    pub rot: f32,
    pub scale: Vec2,
    pub alignment: u32,
    pub bounds_type: BoundsType,
    pub bounds_alignment: u32,
    pub bounds: Vec2,
}

impl Default for TransformInfo {
    fn default() -> Self {
        Self {
            pos: Vec2::default(),
            rot: 0.0,
            scale: Vec2::new(1.0, 1.0),
            alignment: ALIGN_LEFT | ALIGN_TOP,
            bounds_type: BoundsType::None,
            bounds_alignment: ALIGN_CENTER,
            bounds: Vec2::default(),
        }
    }
}

/// Alignment flags for [`TransformInfo`].
pub const ALIGN_CENTER: u32 = 0;
pub const ALIGN_LEFT: u32 = 1 << 0;
pub const ALIGN_TOP: u32 = 1 << 2;
