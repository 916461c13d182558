//! Geometry inputs for the layout engine
//!
//! The host reads rectangles from the mounted document; the engine only ever
//! sees them through [`GeometrySource`].

use serde::{Deserialize, Serialize};

use crate::glyph::GlyphKey;

/// Axis-aligned rectangle, all values in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// A zero-size rect at vertical position `top`
    pub fn at(top: f64) -> Self {
        Self {
            top,
            ..Self::default()
        }
    }
}

/// Fresh geometry for one layout run
///
/// Frame and glyph rects must share one coordinate space (both
/// viewport-relative, or both document-relative).
pub trait GeometrySource {
    /// The positioning container panels are offset against
    fn frame(&self) -> Option<Rect>;

    /// Current rect of the glyph for `key`, if it is mounted
    fn glyph(&self, key: GlyphKey) -> Option<Rect>;

    /// Rendered height of the panel for `key`, when the host has measured it
    fn panel_height(&self, _key: GlyphKey) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphRect {
    pub key: GlyphKey,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelHeight {
    pub key: GlyphKey,
    pub height: f64,
}

/// Serializable geometry captured by the host in one read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometrySnapshot {
    pub frame: Option<Rect>,
    #[serde(default)]
    pub glyphs: Vec<GlyphRect>,
    #[serde(default)]
    pub panel_heights: Vec<PanelHeight>,
}

impl GeometrySnapshot {
    pub fn new(frame: Rect) -> Self {
        Self {
            frame: Some(frame),
            ..Self::default()
        }
    }

    pub fn with_glyph(mut self, key: GlyphKey, rect: Rect) -> Self {
        self.glyphs.push(GlyphRect { key, rect });
        self
    }

    pub fn with_panel_height(mut self, key: GlyphKey, height: f64) -> Self {
        self.panel_heights.push(PanelHeight { key, height });
        self
    }
}

impl GeometrySource for GeometrySnapshot {
    fn frame(&self) -> Option<Rect> {
        self.frame
    }

    fn glyph(&self, key: GlyphKey) -> Option<Rect> {
        self.glyphs.iter().find(|g| g.key == key).map(|g| g.rect)
    }

    fn panel_height(&self, key: GlyphKey) -> Option<f64> {
        self.panel_heights
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.height)
    }
}
