//! Text-run fast path
//!
//! Markers are matched with one pattern inside each plain-text run between
//! tags. The first `]` closes a marker, so nested brackets and embedded
//! markup are not supported here; use the raw-markup scanner for those.

use regex::Regex;
use std::ops::Range;

use super::exclusion::ExcludedRanges;
use super::Rewriter;
use crate::markup::tags;

pub(crate) const MARKER_PATTERN: &str = r"\^(\d+)\[([^\]]+)\]";

pub(crate) fn scan(
    src: &str,
    excluded: &ExcludedRanges,
    marker: &Regex,
    out: &mut Rewriter<'_>,
) {
    for run in text_runs(src, excluded) {
        let text = &src[run.clone()];
        for caps in marker.captures_iter(text) {
            if let (Some(whole), Some(id), Some(content)) = (caps.get(0), caps.get(1), caps.get(2)) {
                out.replace(
                    run.start + whole.start()..run.start + whole.end(),
                    id.as_str(),
                    content.as_str(),
                );
            }
        }
    }
}

/// Byte ranges of text outside tags and excluded elements
pub(crate) fn text_runs(src: &str, excluded: &ExcludedRanges) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for tag in tags(src) {
        if tag.span.start < cursor {
            continue;
        }
        if tag.span.start > cursor {
            runs.push(cursor..tag.span.start);
        }
        cursor = excluded
            .end_if_starts_at(tag.span.start)
            .unwrap_or(tag.span.end);
    }

    if cursor < src.len() {
        runs.push(cursor..src.len());
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Tag;

    #[test]
    fn test_text_runs_split_on_tags() {
        let src = "a<b>c</b>d";
        let runs: Vec<&str> = text_runs(src, &ExcludedRanges::default())
            .into_iter()
            .map(|r| &src[r])
            .collect();
        assert_eq!(runs, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_text_runs_skip_excluded() {
        let src = "x<pre>^1[a]<b>y</b></pre>z";
        fn rules(tag: &Tag<'_>) -> bool {
            tag.is("pre")
        }
        let excluded = ExcludedRanges::find(src, &rules);
        let runs: Vec<&str> = text_runs(src, &excluded)
            .into_iter()
            .map(|r| &src[r])
            .collect();
        assert_eq!(runs, vec!["x", "z"]);
    }

    #[test]
    fn test_plain_text_is_one_run() {
        let src = "just ^1[text]";
        assert_eq!(text_runs(src, &ExcludedRanges::default()), vec![0..src.len()]);
    }

    #[test]
    fn test_pattern_stops_at_first_close() {
        let marker = Regex::new(MARKER_PATTERN).unwrap();
        let caps = marker.captures("^1[see [ref]]").unwrap();
        assert_eq!(&caps[2], "see [ref");
    }
}
