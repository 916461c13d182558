//! Raw-markup marker scanner
//!
//! Walks serialized markup byte by byte. Outside a marker, tags are stepped
//! over whole so a caret inside an attribute value never starts a match.
//! Inside marker content, bracket depth is only counted outside tags and
//! outside excluded regions; the marker closes when depth returns to zero.

use std::ops::Range;

use super::exclusion::ExcludedRanges;
use super::Rewriter;
use crate::markup::{opens_tag, tag_end};

/// A complete `^<id>[<content>]` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkerMatch {
    pub id: Range<usize>,
    pub content: Range<usize>,
    /// Offset just past the closing `]`
    pub end: usize,
}

pub(crate) fn scan(src: &str, excluded: &ExcludedRanges, out: &mut Rewriter<'_>) {
    let bytes = src.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => i = skip_markup(src, i, excluded).unwrap_or(i + 1),
            b'^' => match match_marker(src, i, excluded) {
                Some(found) => {
                    out.replace(i..found.end, &src[found.id], &src[found.content]);
                    i = found.end;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
}

/// Where scanning resumes after the tag or excluded element at `pos`
///
/// `None` when `<` is a literal character or the tag never closes.
fn skip_markup(src: &str, pos: usize, excluded: &ExcludedRanges) -> Option<usize> {
    if !opens_tag(src, pos) {
        return None;
    }
    excluded
        .end_if_starts_at(pos)
        .or_else(|| tag_end(src, pos))
}

/// Match a marker whose caret sits at `caret`
///
/// Unterminated or empty content is not a match.
pub(crate) fn match_marker(src: &str, caret: usize, excluded: &ExcludedRanges) -> Option<MarkerMatch> {
    let bytes = src.as_bytes();

    let digits_start = caret + 1;
    let mut open = digits_start;
    while open < bytes.len() && bytes[open].is_ascii_digit() {
        open += 1;
    }
    if open == digits_start || bytes.get(open) != Some(&b'[') {
        return None;
    }

    let content_start = open + 1;
    let mut depth = 1usize;
    let mut k = content_start;

    while k < bytes.len() {
        match bytes[k] {
            b'<' => {
                if let Some(resume) = skip_markup(src, k, excluded) {
                    k = resume;
                    continue;
                }
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    if k == content_start {
                        return None;
                    }
                    return Some(MarkerMatch {
                        id: digits_start..open,
                        content: content_start..k,
                        end: k + 1,
                    });
                }
            }
            _ => {}
        }
        k += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(src: &str) -> Option<(String, String)> {
        match_marker(src, 0, &ExcludedRanges::default())
            .map(|m| (src[m.id].to_string(), src[m.content].to_string()))
    }

    #[test]
    fn test_simple_marker() {
        assert_eq!(matched("^7[note]"), Some(("7".into(), "note".into())));
    }

    #[test]
    fn test_nested_brackets_balance() {
        assert_eq!(
            matched("^1[see also [ref]] tail]"),
            Some(("1".into(), "see also [ref]".into()))
        );
    }

    #[test]
    fn test_brackets_inside_tag_ignored() {
        let src = r#"^2[a <span title="[[">b</span>]"#;
        assert_eq!(
            matched(src),
            Some(("2".into(), r#"a <span title="[[">b</span>"#.into()))
        );
    }

    #[test]
    fn test_literal_lt_does_not_enter_tag() {
        assert_eq!(matched("^4[a < b]"), Some(("4".into(), "a < b".into())));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(matched("^[x]"), None);
        assert_eq!(matched("^12 [x]"), None);
        assert_eq!(matched("^1[]"), None);
        assert_eq!(matched("^1[open [inner]"), None);
        assert_eq!(matched("^"), None);
    }

    #[test]
    fn test_excluded_region_inside_content() {
        let src = "^1[call <code>f(a])</code> here]";
        fn rules(tag: &crate::markup::Tag<'_>) -> bool {
            tag.is("code")
        }
        let excluded = ExcludedRanges::find(src, &rules);
        let m = match_marker(src, 0, &excluded).unwrap();
        assert_eq!(&src[m.content], "call <code>f(a])</code> here");
    }
}
