//! Annotation extraction
//!
//! Turns `^<id>[<content>]` markers in a rendered region into reference
//! glyphs and returns the annotations in document order.
//!
//! # Strategies
//!
//! - `RawMarkup` (default): scans serialized markup, balances nested
//!   brackets and ignores brackets inside tags.
//! - `TextNode`: one pattern per plain-text run; first `]` wins.
//!
//! Both skip code/preformatted elements and generated panel regions.

mod exclusion;
mod scanner;
mod text_node;

pub use exclusion::{ExcludedRanges, ExclusionPredicate, ExclusionRules};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::config::{ScanStrategy, SidenoteConfig};
use crate::error::Result;
use crate::glyph::{GlyphKey, GlyphRenderer};

/// One extracted sidenote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Author-supplied digits; not necessarily unique
    pub id: String,
    /// Raw markup between the delimiters, as authored
    pub content: String,
    /// Render pass that extracted it; 0 outside a session
    pub pass: u32,
    /// Key of the glyph that replaced the marker
    pub key: GlyphKey,
    /// Byte offset of the caret in the source region
    pub source_start: usize,
    /// Byte offset just past the closing bracket
    pub source_end: usize,
}

/// Result of one extraction pass over a region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub pass: u32,
    /// Region markup with every marker replaced by its glyph
    pub markup: String,
    /// Annotations in left-to-right order
    pub annotations: Vec<Annotation>,
}

impl ExtractionResult {
    fn unchanged(src: &str, pass: u32) -> Self {
        Self {
            pass,
            markup: src.to_string(),
            annotations: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Marker extractor configured for one session
#[derive(Debug, Clone)]
pub struct Extractor {
    strategy: ScanStrategy,
    glyph: GlyphRenderer,
    rules: ExclusionRules,
    marker: Regex,
}

impl Extractor {
    pub fn new(config: &SidenoteConfig) -> Result<Self> {
        Ok(Self {
            strategy: config.extract.strategy,
            glyph: GlyphRenderer::new(&config.extract),
            rules: ExclusionRules::from_config(&config.extract, &config.panel),
            marker: Regex::new(text_node::MARKER_PATTERN)?,
        })
    }

    pub fn strategy(&self) -> ScanStrategy {
        self.strategy
    }

    pub fn glyph(&self) -> &GlyphRenderer {
        &self.glyph
    }

    /// Extract using the configured exclusion rules
    pub fn extract(&self, src: &str) -> ExtractionResult {
        self.run(src, 0, &self.rules)
    }

    /// Extract for a session pass; glyphs carry `pass` so they stay unique
    /// across regions mounted in the same view
    pub fn extract_for_pass(&self, src: &str, pass: u32) -> ExtractionResult {
        self.run(src, pass, &self.rules)
    }

    /// Extract with a caller-supplied exclusion predicate
    pub fn extract_with<P: ExclusionPredicate + ?Sized>(
        &self,
        src: &str,
        predicate: &P,
    ) -> ExtractionResult {
        self.run(src, 0, predicate)
    }

    fn run<P: ExclusionPredicate + ?Sized>(
        &self,
        src: &str,
        pass: u32,
        predicate: &P,
    ) -> ExtractionResult {
        if !src.contains('^') {
            return ExtractionResult::unchanged(src, pass);
        }

        let excluded = ExcludedRanges::find(src, predicate);
        let mut out = Rewriter::new(src, pass, &self.glyph);

        match self.strategy {
            ScanStrategy::RawMarkup => scanner::scan(src, &excluded, &mut out),
            ScanStrategy::TextNode => text_node::scan(src, &excluded, &self.marker, &mut out),
        }

        let result = out.finish();
        tracing::debug!(
            pass = pass,
            strategy = ?self.strategy,
            annotations = result.annotations.len(),
            "Extracted sidenotes"
        );
        result
    }
}

/// Copies untouched input and splices glyphs over matched spans
pub(crate) struct Rewriter<'a> {
    src: &'a str,
    pass: u32,
    glyph: &'a GlyphRenderer,
    out: String,
    copied: usize,
    annotations: Vec<Annotation>,
}

impl<'a> Rewriter<'a> {
    fn new(src: &'a str, pass: u32, glyph: &'a GlyphRenderer) -> Self {
        Self {
            src,
            pass,
            glyph,
            out: String::with_capacity(src.len()),
            copied: 0,
            annotations: Vec::new(),
        }
    }

    /// Replace `span` with a glyph; spans must arrive in ascending order
    pub(crate) fn replace(&mut self, span: Range<usize>, id: &str, content: &str) {
        self.out.push_str(&self.src[self.copied..span.start]);

        let key = GlyphKey(self.annotations.len());
        self.glyph.write(&mut self.out, id, self.pass, key);
        self.annotations.push(Annotation {
            id: id.to_string(),
            content: content.to_string(),
            pass: self.pass,
            key,
            source_start: span.start,
            source_end: span.end,
        });

        self.copied = span.end;
    }

    fn finish(mut self) -> ExtractionResult {
        self.out.push_str(&self.src[self.copied..]);
        ExtractionResult {
            pass: self.pass,
            markup: self.out,
            annotations: self.annotations,
        }
    }
}
