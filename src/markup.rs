//! Minimal markup lexing shared by the marker scanners
//!
//! Only what the scanners need: where a tag starts and ends, its name, and
//! attribute lookup. Everything here works on byte offsets into UTF-8 input;
//! every delimiter is ASCII, so offsets always land on char boundaries.

use std::ops::Range;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Start,
    End,
    SelfClosing,
    /// Comments, doctypes and processing instructions
    Other,
}

/// A lexed tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub kind: TagKind,
    pub name: &'a str,
    /// Raw attribute source between the name and the closing `>`
    pub attrs: &'a str,
    pub span: Range<usize>,
}

/// True when the `<` at `pos` opens a tag rather than being a literal less-than
pub fn opens_tag(src: &str, pos: usize) -> bool {
    let bytes = src.as_bytes();
    if bytes.get(pos) != Some(&b'<') {
        return false;
    }
    matches!(
        bytes.get(pos + 1),
        Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?')
    )
}

/// Byte offset just past the `>` closing the tag opened at `pos`
///
/// Quoted attribute values may contain `>`. Comments close on `-->`.
pub fn tag_end(src: &str, pos: usize) -> Option<usize> {
    if src[pos..].starts_with("<!--") {
        return src[pos + 4..].find("-->").map(|i| pos + 4 + i + 3);
    }

    let bytes = src.as_bytes();
    let mut quote: Option<u8> = None;
    let mut after_eq = false;
    let mut i = pos + 1;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'>' => return Some(i + 1),
                b'"' | b'\'' if after_eq => {
                    quote = Some(b);
                    after_eq = false;
                }
                b'=' => after_eq = true,
                b if b.is_ascii_whitespace() => {}
                _ => after_eq = false,
            },
        }
        i += 1;
    }

    None
}

/// Lex the tag opened at `pos`; `None` when it is not a tag or never closes
pub fn parse_tag(src: &str, pos: usize) -> Option<Tag<'_>> {
    if !opens_tag(src, pos) {
        return None;
    }
    let end = tag_end(src, pos)?;
    let inner = &src[pos + 1..end - 1];

    let (kind, rest) = if let Some(rest) = inner.strip_prefix('/') {
        (TagKind::End, rest)
    } else if inner.starts_with('!') || inner.starts_with('?') {
        (TagKind::Other, inner)
    } else if inner.trim_end().ends_with('/') {
        (TagKind::SelfClosing, inner)
    } else {
        (TagKind::Start, inner)
    };

    let name_len = rest
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    let attrs = rest[name_len..].trim_end().trim_end_matches('/');

    Some(Tag {
        kind,
        name,
        attrs,
        span: pos..end,
    })
}

impl<'a> Tag<'a> {
    /// Case-insensitive name comparison
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// True for elements that cannot enclose content
    pub fn is_void(&self) -> bool {
        self.kind == TagKind::SelfClosing || VOID_ELEMENTS.iter().any(|v| self.is(v))
    }

    /// Look up an attribute value; bare attributes yield an empty string
    pub fn attribute(&self, wanted: &str) -> Option<&'a str> {
        let attrs = self.attrs;
        let bytes = attrs.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
                i += 1;
            }
            let name_start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
                i += 1;
            }
            let name = &attrs[name_start..i];
            if name.is_empty() {
                break;
            }

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let value = if i < bytes.len() && bytes[i] == b'=' {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                match bytes.get(i) {
                    Some(&q) if q == b'"' || q == b'\'' => {
                        let start = i + 1;
                        let len = attrs[start..].find(q as char).unwrap_or(attrs.len() - start);
                        i = (start + len + 1).min(bytes.len());
                        &attrs[start..start + len]
                    }
                    _ => {
                        let start = i;
                        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                            i += 1;
                        }
                        &attrs[start..i]
                    }
                }
            } else {
                ""
            };

            if name.eq_ignore_ascii_case(wanted) {
                return Some(value);
            }
        }

        None
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// Iterate over every well-formed tag in `src`, in order
pub fn tags(src: &str) -> Tags<'_> {
    Tags { src, pos: 0 }
}

pub struct Tags<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Iterator for Tags<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(offset) = self.src[self.pos..].find('<') {
            let at = self.pos + offset;
            if let Some(tag) = parse_tag(self.src, at) {
                self.pos = tag.span.end;
                return Some(tag);
            }
            self.pos = at + 1;
        }
        self.pos = self.src.len();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_tag() {
        assert!(opens_tag("<p>", 0));
        assert!(opens_tag("</p>", 0));
        assert!(opens_tag("<!-- c -->", 0));
        assert!(!opens_tag("a < b", 2));
        assert!(!opens_tag("<3", 0));
    }

    #[test]
    fn test_tag_end_skips_quoted_gt() {
        let src = r#"<a title="a>b" href='x'>link</a>"#;
        assert_eq!(tag_end(src, 0), Some(24));
    }

    #[test]
    fn test_tag_end_unquoted_apostrophe() {
        let src = "<p title=it's>text";
        assert_eq!(tag_end(src, 0), Some(14));
    }

    #[test]
    fn test_tag_end_comment() {
        let src = "<!-- a > b -->rest";
        assert_eq!(tag_end(src, 0), Some(14));
        assert_eq!(tag_end("<!-- open", 0), None);
    }

    #[test]
    fn test_parse_tag_kinds() {
        let start = parse_tag(r#"<div class="a sidenote">"#, 0).unwrap();
        assert_eq!(start.kind, TagKind::Start);
        assert_eq!(start.name, "div");
        assert!(start.has_class("sidenote"));
        assert!(!start.has_class("side"));

        let end = parse_tag("</PRE>", 0).unwrap();
        assert_eq!(end.kind, TagKind::End);
        assert!(end.is("pre"));

        let br = parse_tag("<br/>", 0).unwrap();
        assert_eq!(br.kind, TagKind::SelfClosing);
        assert!(br.is_void());

        let img = parse_tag(r#"<img src="x.png">"#, 0).unwrap();
        assert!(img.is_void());
    }

    #[test]
    fn test_attribute_lookup() {
        let tag = parse_tag(r#"<a href="x]y" data-k=3 hidden>"#, 0).unwrap();
        assert_eq!(tag.attribute("href"), Some("x]y"));
        assert_eq!(tag.attribute("data-k"), Some("3"));
        assert_eq!(tag.attribute("hidden"), Some(""));
        assert_eq!(tag.attribute("class"), None);
    }

    #[test]
    fn test_tags_iterator_skips_literal_lt() {
        let names: Vec<_> = tags("a < b <em>c</em>").map(|t| t.name).collect();
        assert_eq!(names, vec!["em", "em"]);
    }
}
