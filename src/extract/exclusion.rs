//! Regions the extractor must never scan
//!
//! Code and preformatted blocks keep their carets literal, and panels this
//! crate generated must not be extracted a second time. Excluded regions are
//! resolved to byte ranges before any marker matching starts.

use std::ops::Range;

use crate::config::{ExtractConfig, PanelConfig};
use crate::markup::{tags, Tag, TagKind};

/// Decides whether the element opened by a start tag is skipped entirely
pub trait ExclusionPredicate {
    fn excludes(&self, tag: &Tag<'_>) -> bool;
}

impl<F> ExclusionPredicate for F
where
    F: Fn(&Tag<'_>) -> bool,
{
    fn excludes(&self, tag: &Tag<'_>) -> bool {
        self(tag)
    }
}

/// Tag-name and class based exclusions
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    tags: Vec<String>,
    classes: Vec<String>,
}

impl ExclusionRules {
    pub fn new(tags: Vec<String>, classes: Vec<String>) -> Self {
        Self { tags, classes }
    }

    /// Configured exclusions plus the generated panel classes
    pub fn from_config(extract: &ExtractConfig, panel: &PanelConfig) -> Self {
        let mut classes = extract.excluded_classes.clone();
        for class in [&panel.container_class, &panel.panel_class] {
            if !classes.contains(class) {
                classes.push(class.clone());
            }
        }
        Self::new(extract.excluded_tags.clone(), classes)
    }
}

impl ExclusionPredicate for ExclusionRules {
    fn excludes(&self, tag: &Tag<'_>) -> bool {
        self.tags.iter().any(|name| tag.is(name))
            || self.classes.iter().any(|class| tag.has_class(class))
    }
}

/// Sorted, non-overlapping byte ranges covering excluded elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedRanges {
    ranges: Vec<Range<usize>>,
}

impl ExcludedRanges {
    /// Resolve every excluded element in `src`, start tag through end tag
    ///
    /// An excluded element that never closes runs to the end of input.
    pub fn find<P: ExclusionPredicate + ?Sized>(src: &str, predicate: &P) -> Self {
        let mut ranges = Vec::new();
        let mut iter = tags(src);

        while let Some(tag) = iter.next() {
            if tag.kind != TagKind::Start || tag.is_void() || !predicate.excludes(&tag) {
                continue;
            }

            let start = tag.span.start;
            let mut depth = 1usize;
            let mut end = src.len();

            for inner in iter.by_ref() {
                if !inner.name.eq_ignore_ascii_case(tag.name) {
                    continue;
                }
                match inner.kind {
                    TagKind::Start => depth += 1,
                    TagKind::End => {
                        depth -= 1;
                        if depth == 0 {
                            end = inner.span.end;
                            break;
                        }
                    }
                    _ => {}
                }
            }

            ranges.push(start..end);
        }

        Self { ranges }
    }

    /// End of the excluded range beginning exactly at `pos`
    pub fn end_if_starts_at(&self, pos: usize) -> Option<usize> {
        let idx = self.ranges.partition_point(|r| r.start < pos);
        self.ranges
            .get(idx)
            .filter(|r| r.start == pos)
            .map(|r| r.end)
    }

    pub fn contains(&self, pos: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= pos);
        self.ranges.get(idx).map_or(false, |r| r.start <= pos)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range<usize>> {
        self.ranges.iter()
    }
}
