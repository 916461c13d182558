//! Reference glyphs
//!
//! The inline marker left in place of `^<id>[...]`. A glyph owns no content;
//! it carries the author id (queryable by the host), a per-pass key that
//! stays unique even when ids repeat, and the pass that produced it so glyphs
//! of several regions mounted in one view never share a selector.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ExtractConfig;

/// Occurrence index of a glyph within one render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlyphKey(pub usize);

impl fmt::Display for GlyphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Renders glyph markup from the extractor configuration
#[derive(Debug, Clone)]
pub struct GlyphRenderer {
    tag: String,
    class: String,
    id_attribute: String,
    key_attribute: String,
    pass_attribute: String,
}

impl GlyphRenderer {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            tag: config.glyph_tag.clone(),
            class: config.glyph_class.clone(),
            id_attribute: config.id_attribute.clone(),
            key_attribute: config.key_attribute.clone(),
            pass_attribute: config.pass_attribute.clone(),
        }
    }

    /// Append the glyph for `id` to `out`
    ///
    /// Ids are ASCII digits by construction, so they need no escaping.
    pub fn write(&self, out: &mut String, id: &str, pass: u32, key: GlyphKey) {
        out.push_str(&format!(
            "<{tag} class=\"{class}\" {id_attr}=\"{id}\" {pass_attr}=\"{pass}\" {key_attr}=\"{key}\">{id}</{tag}>",
            tag = self.tag,
            class = self.class,
            id_attr = self.id_attribute,
            pass_attr = self.pass_attribute,
            key_attr = self.key_attribute,
            id = id,
            pass = pass,
            key = key,
        ));
    }

    pub fn render(&self, id: &str, pass: u32, key: GlyphKey) -> String {
        let mut out = String::new();
        self.write(&mut out, id, pass, key);
        out
    }

    /// CSS selector the host uses to find the glyph for `key` of `pass`
    pub fn selector(&self, pass: u32, key: GlyphKey) -> String {
        format!(
            "{}.{}[{}=\"{}\"][{}=\"{}\"]",
            self.tag, self.class, self.pass_attribute, pass, self.key_attribute, key
        )
    }
}
