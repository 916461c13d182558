//! Per-pass annotation registry
//!
//! Maps each glyph key to its annotation and panel for exactly one render
//! pass. Keys are occurrence indices, so repeated author ids stay distinct:
//! every duplicate gets its own glyph, panel and offset. Lookups by author id
//! return all keys sharing it, in document order.

use std::collections::HashMap;

use crate::extract::Annotation;
use crate::glyph::GlyphKey;
use crate::layout::Layout;
use crate::panel::AnnotationPanel;

#[derive(Debug, Clone, Default)]
pub struct PassRegistry {
    annotations: Vec<Annotation>,
    panels: Vec<AnnotationPanel>,
    by_id: HashMap<String, Vec<GlyphKey>>,
}

impl PassRegistry {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        let mut by_id: HashMap<String, Vec<GlyphKey>> = HashMap::new();
        for annotation in &annotations {
            by_id
                .entry(annotation.id.clone())
                .or_default()
                .push(annotation.key);
        }

        Self {
            annotations,
            panels: Vec::new(),
            by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotation(&self, key: GlyphKey) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.key == key)
    }

    /// Every glyph key carrying author id `id`
    pub fn keys_for_id(&self, id: &str) -> &[GlyphKey] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build one panel per annotation, replacing any existing panels
    pub fn mount_panels(&mut self) -> &[AnnotationPanel] {
        self.panels = self
            .annotations
            .iter()
            .map(AnnotationPanel::from_annotation)
            .collect();
        &self.panels
    }

    pub fn panels(&self) -> &[AnnotationPanel] {
        &self.panels
    }

    pub fn panel(&self, key: GlyphKey) -> Option<&AnnotationPanel> {
        self.panels.iter().find(|p| p.key == key)
    }

    /// Write layout offsets onto panels; skipped panels lose any stale offset
    ///
    /// Returns the number of panels positioned.
    pub fn apply(&mut self, layout: &Layout) -> usize {
        let mut positioned = 0;
        for panel in &mut self.panels {
            panel.vertical_offset = layout.offset(panel.key);
            if panel.vertical_offset.is_some() {
                positioned += 1;
            }
        }
        positioned
    }

    /// Drop every panel; returns how many were discarded
    pub fn clear_panels(&mut self) -> usize {
        let count = self.panels.len();
        self.panels.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PanelPlacement;

    fn annotation(id: &str, key: usize) -> Annotation {
        Annotation {
            id: id.to_string(),
            content: format!("content {}", key),
            pass: 1,
            key: GlyphKey(key),
            source_start: 0,
            source_end: 0,
        }
    }

    #[test]
    fn test_duplicate_ids_keep_both_keys() {
        let registry = PassRegistry::new(vec![annotation("1", 0), annotation("2", 1), annotation("1", 2)]);
        assert_eq!(registry.keys_for_id("1"), &[GlyphKey(0), GlyphKey(2)]);
        assert_eq!(registry.keys_for_id("2"), &[GlyphKey(1)]);
        assert!(registry.keys_for_id("9").is_empty());
        assert_eq!(registry.annotation(GlyphKey(2)).map(|a| a.content.as_str()), Some("content 2"));
    }

    #[test]
    fn test_panels_mirror_glyph_order() {
        let mut registry = PassRegistry::new(vec![annotation("5", 0), annotation("2", 1)]);
        assert!(registry.panels().is_empty());

        let ids: Vec<&str> = registry.mount_panels().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "2"]);
        let keys: Vec<GlyphKey> = registry.panels().iter().map(|p| p.key).collect();
        let glyph_keys: Vec<GlyphKey> = registry.annotations().iter().map(|a| a.key).collect();
        assert_eq!(keys, glyph_keys);
    }

    #[test]
    fn test_apply_layout() {
        let mut registry = PassRegistry::new(vec![annotation("1", 0), annotation("2", 1)]);
        registry.mount_panels();

        let layout = Layout {
            placements: vec![PanelPlacement {
                key: GlyphKey(0),
                id: "1".to_string(),
                raw_offset: 5.0,
                offset: 5.0,
            }],
            skipped: vec![GlyphKey(1)],
        };

        assert_eq!(registry.apply(&layout), 1);
        assert_eq!(registry.panel(GlyphKey(0)).and_then(|p| p.vertical_offset), Some(5.0));
        assert_eq!(registry.panel(GlyphKey(1)).and_then(|p| p.vertical_offset), None);
        assert_eq!(registry.clear_panels(), 2);
    }
}
