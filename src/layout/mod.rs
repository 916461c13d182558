//! Sidenote layout
//!
//! Places each panel next to its glyph without overlaps:
//!
//! 1. raw offset = glyph top relative to the frame, minus the lead, floored at 0
//! 2. stable sort by raw offset (ties keep document order)
//! 3. forward sweep: `final = max(raw, previous final + height + spacing)`
//!
//! Panels only ever move down. The whole sweep reruns on every recompute.

mod geometry;

pub use geometry::{GeometrySnapshot, GeometrySource, GlyphRect, PanelHeight, Rect};

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::{Result, SidenoteError};
use crate::extract::Annotation;
use crate::glyph::GlyphKey;

/// Final position of one panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelPlacement {
    pub key: GlyphKey,
    pub id: String,
    /// Glyph-derived position before collision resolution
    pub raw_offset: f64,
    /// Vertical offset to apply to the panel
    pub offset: f64,
}

/// Result of one layout run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Placements in document order
    pub placements: Vec<PanelPlacement>,
    /// Annotations whose glyph could not be found
    pub skipped: Vec<GlyphKey>,
}

impl Layout {
    pub fn offset(&self, key: GlyphKey) -> Option<f64> {
        self.placements
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.offset)
    }

    /// Offsets of every panel sharing `id`, in document order
    pub fn offsets_for_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = f64> + 'a {
        self.placements
            .iter()
            .filter(move |p| p.id == id)
            .map(|p| p.offset)
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Collision-resolving panel layout
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    lead: f64,
    panel_height: f64,
    min_spacing: f64,
    measure_panels: bool,
}

impl LayoutEngine {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            lead: config.lead,
            panel_height: config.panel_height,
            min_spacing: config.min_spacing,
            measure_panels: config.measure_panels,
        }
    }

    /// Lay out every annotation against fresh geometry
    ///
    /// Fails only when the frame is missing; missing glyphs are skipped.
    pub fn compute<G: GeometrySource + ?Sized>(
        &self,
        region: &str,
        annotations: &[Annotation],
        geometry: &G,
    ) -> Result<Layout> {
        let frame = geometry.frame().ok_or_else(|| {
            tracing::warn!(region = region, "Positioning frame not found, skipping sidenote layout");
            SidenoteError::FrameNotFound(region.to_string())
        })?;

        let mut located = Vec::with_capacity(annotations.len());
        let mut skipped = Vec::new();

        for annotation in annotations {
            match geometry.glyph(annotation.key) {
                Some(glyph) => located.push((annotation, self.raw_offset(&frame, &glyph))),
                None => {
                    tracing::warn!(
                        region = region,
                        id = %annotation.id,
                        key = annotation.key.0,
                        "Reference glyph not found, skipping sidenote"
                    );
                    skipped.push(annotation.key);
                }
            }
        }

        let raw: Vec<f64> = located.iter().map(|(_, raw)| *raw).collect();
        let finals = self.resolve_with(&raw, |i| {
            let key = located[i].0.key;
            self.measure_panels
                .then(|| geometry.panel_height(key))
                .flatten()
                .unwrap_or(self.panel_height)
        });

        let placements = located
            .iter()
            .zip(finals)
            .map(|((annotation, raw), offset)| PanelPlacement {
                key: annotation.key,
                id: annotation.id.clone(),
                raw_offset: *raw,
                offset,
            })
            .collect();

        tracing::debug!(region = region, skipped = skipped.len(), "Sidenote layout computed");
        Ok(Layout {
            placements,
            skipped,
        })
    }

    /// Glyph-derived desired offset relative to the frame
    pub fn raw_offset(&self, frame: &Rect, glyph: &Rect) -> f64 {
        (glyph.top - frame.top - self.lead).max(0.0)
    }

    /// Collision sweep over raw offsets using the fixed height estimate
    ///
    /// Returned offsets line up with the input indices.
    pub fn resolve(&self, raw: &[f64]) -> Vec<f64> {
        self.resolve_with(raw, |_| self.panel_height)
    }

    fn resolve_with(&self, raw: &[f64], height_of: impl Fn(usize) -> f64) -> Vec<f64> {
        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]));

        let mut finals = vec![0.0; raw.len()];
        let mut previous: Option<(f64, f64)> = None;

        for i in order {
            let offset = match previous {
                Some((prev_offset, prev_height)) => {
                    raw[i].max(prev_offset + prev_height + self.min_spacing)
                }
                None => raw[i],
            };
            finals[i] = offset;
            previous = Some((offset, height_of(i)));
        }

        finals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(&LayoutConfig::default())
    }

    fn annotation(id: &str, key: usize) -> Annotation {
        Annotation {
            id: id.to_string(),
            content: format!("note {}", id),
            pass: 1,
            key: GlyphKey(key),
            source_start: 0,
            source_end: 0,
        }
    }

    fn snapshot(frame_top: f64, glyph_tops: &[f64]) -> GeometrySnapshot {
        glyph_tops
            .iter()
            .enumerate()
            .fold(GeometrySnapshot::new(Rect::at(frame_top)), |s, (i, top)| {
                s.with_glyph(GlyphKey(i), Rect::at(*top))
            })
    }

    #[test]
    fn test_collisions_stack_downward() {
        assert_eq!(engine().resolve(&[10.0, 15.0, 20.0]), vec![10.0, 110.0, 210.0]);
    }

    #[test]
    fn test_spaced_panels_pass_through() {
        assert_eq!(engine().resolve(&[10.0, 500.0, 1000.0]), vec![10.0, 500.0, 1000.0]);
    }

    #[test]
    fn test_panels_never_pushed_up() {
        // The third panel has room above the pushed second one but stays below it
        let finals = engine().resolve(&[0.0, 50.0, 230.0]);
        assert_eq!(finals, vec![0.0, 100.0, 230.0]);
    }

    #[test]
    fn test_unsorted_input_keeps_index_alignment() {
        let finals = engine().resolve(&[300.0, 10.0, 20.0]);
        assert_eq!(finals, vec![300.0, 10.0, 110.0]);
    }

    #[test]
    fn test_ties_break_by_document_order() {
        let finals = engine().resolve(&[40.0, 40.0]);
        assert_eq!(finals, vec![40.0, 140.0]);
    }

    #[test]
    fn test_compute_relative_to_frame_with_lead() {
        let annotations = vec![annotation("1", 0), annotation("2", 1), annotation("3", 2)];
        let geometry = snapshot(100.0, &[130.0, 135.0, 140.0]);
        let layout = engine().compute("note", &annotations, &geometry).unwrap();

        let offsets: Vec<f64> = layout.placements.iter().map(|p| p.offset).collect();
        let raw: Vec<f64> = layout.placements.iter().map(|p| p.raw_offset).collect();
        assert_eq!(raw, vec![10.0, 15.0, 20.0]);
        assert_eq!(offsets, vec![10.0, 110.0, 210.0]);
        assert!(layout.is_complete());
    }

    #[test]
    fn test_raw_offset_floors_at_zero() {
        let annotations = vec![annotation("1", 0)];
        let geometry = snapshot(100.0, &[90.0]);
        let layout = engine().compute("note", &annotations, &geometry).unwrap();
        assert_eq!(layout.offset(GlyphKey(0)), Some(0.0));
    }

    #[test]
    fn test_missing_glyph_is_skipped() {
        let annotations = vec![annotation("1", 0), annotation("2", 1), annotation("3", 2)];
        let geometry = GeometrySnapshot::new(Rect::at(0.0))
            .with_glyph(GlyphKey(0), Rect::at(30.0))
            .with_glyph(GlyphKey(2), Rect::at(35.0));
        let layout = engine().compute("note", &annotations, &geometry).unwrap();

        assert_eq!(layout.skipped, vec![GlyphKey(1)]);
        assert_eq!(layout.offset(GlyphKey(0)), Some(10.0));
        assert_eq!(layout.offset(GlyphKey(1)), None);
        assert_eq!(layout.offset(GlyphKey(2)), Some(110.0));
    }

    #[test]
    fn test_missing_frame_aborts() {
        let annotations = vec![annotation("1", 0)];
        let geometry = GeometrySnapshot::default().with_glyph(GlyphKey(0), Rect::at(30.0));
        let err = engine().compute("note", &annotations, &geometry).unwrap_err();
        assert!(matches!(err, SidenoteError::FrameNotFound(region) if region == "note"));
    }

    #[test]
    fn test_duplicate_ids_laid_out_independently() {
        let annotations = vec![annotation("1", 0), annotation("1", 1)];
        let geometry = snapshot(0.0, &[40.0, 40.0]);
        let layout = engine().compute("note", &annotations, &geometry).unwrap();

        let offsets: Vec<f64> = layout.offsets_for_id("1").collect();
        assert_eq!(offsets, vec![20.0, 120.0]);
    }

    #[test]
    fn test_relayout_is_idempotent() {
        let annotations = vec![annotation("1", 0), annotation("2", 1), annotation("3", 2)];
        let geometry = snapshot(0.0, &[200.0, 210.0, 900.0]);
        let first = engine().compute("note", &annotations, &geometry).unwrap();
        let second = engine().compute("note", &annotations, &geometry).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_measured_heights_replace_estimate() {
        let config = LayoutConfig {
            measure_panels: true,
            ..LayoutConfig::default()
        };
        let annotations = vec![annotation("1", 0), annotation("2", 1), annotation("3", 2)];
        let geometry = snapshot(0.0, &[30.0, 35.0, 40.0])
            .with_panel_height(GlyphKey(0), 30.0)
            .with_panel_height(GlyphKey(1), 200.0);
        let layout = LayoutEngine::new(&config)
            .compute("note", &annotations, &geometry)
            .unwrap();

        let offsets: Vec<f64> = layout.placements.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![10.0, 60.0, 280.0]);
    }

    #[test]
    fn test_measured_heights_ignored_when_disabled() {
        let annotations = vec![annotation("1", 0), annotation("2", 1)];
        let geometry = snapshot(0.0, &[30.0, 35.0]).with_panel_height(GlyphKey(0), 10.0);
        let layout = engine().compute("note", &annotations, &geometry).unwrap();
        assert_eq!(layout.offset(GlyphKey(1)), Some(110.0));
    }
}
