//! Tolerant HTML scanning for the handful of tables we read from vendor pages.
//!
//! Elements are located by tag name with nesting tracked per tag, attributes are
//! matched case-insensitively, and cell text is the concatenation of its trimmed
//! text pieces. This is not a general HTML parser: comments and `<script>`
//! bodies are not special-cased.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)\b([^>]*)>").expect("valid tag regex")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("valid entity regex")
});

/// An element found in a document: its raw attribute text and inner markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub attrs: &'a str,
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<String> {
        attr(self.attrs, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Direct and nested child elements of `tag`, outermost only
    pub fn find_all(&self, tag: &str) -> Vec<Element<'a>> {
        find_all(self.inner, tag)
    }

    pub fn find_by_id(&self, tag: &str, id: &str) -> Option<Element<'a>> {
        find_by_id(self.inner, tag, id)
    }

    /// First child `tag` carrying `class`
    pub fn find_by_class(&self, tag: &str, class: &str) -> Option<Element<'a>> {
        descendants(self.inner, tag).find(|e| e.has_class(class))
    }

    pub fn text(&self) -> String {
        text(self.inner)
    }
}

struct TagMatch<'a> {
    closing: bool,
    name: &'a str,
    attrs: &'a str,
    start: usize,
    end: usize,
}

fn tags<'a>(html: &'a str, tag: &str) -> impl Iterator<Item = TagMatch<'a>> {
    TAG_RE.captures_iter(html).filter_map(move |c| {
        let whole = c.get(0)?;
        let name = c.get(2)?.as_str();
        name.eq_ignore_ascii_case(tag).then(|| TagMatch {
            closing: !c[1].is_empty(),
            name,
            attrs: c.get(3).map_or("", |m| m.as_str()),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// Complete the element opened by `open`, tracking nesting of the same tag.
/// An element left open runs to the end of the document.
fn close_element<'a>(html: &'a str, tag: &str, open: &TagMatch<'a>) -> Element<'a> {
    let attrs = open.attrs.trim_end_matches('/');
    if open.attrs.trim_end().ends_with('/') {
        return Element { attrs, inner: "" };
    }

    let rest = &html[open.end..];
    let mut depth = 1usize;
    for t in tags(rest, tag) {
        if t.closing {
            depth -= 1;
            if depth == 0 {
                return Element {
                    attrs,
                    inner: &rest[..t.start],
                };
            }
        } else {
            depth += 1;
        }
    }

    Element { attrs, inner: rest }
}

/// Every `tag` element in document order, including ones nested in each other
fn descendants<'a>(html: &'a str, tag: &str) -> impl Iterator<Item = Element<'a>> {
    tags(html, tag)
        .filter(|t| !t.closing)
        .map(move |t| close_element(html, t.name, &t))
}

/// All outermost `tag` elements in `html`
pub fn find_all<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let mut found = Vec::new();
    let mut offset = 0;
    while let Some(open) = tags(&html[offset..], tag).find(|t| !t.closing) {
        let element = close_element(&html[offset..], tag, &open);
        // Skip past the element's closing tag (or to the end when unclosed)
        let inner_end = offset + open.end + element.inner.len();
        offset = match tags(&html[inner_end..], tag).next() {
            Some(close) if close.closing => inner_end + close.end,
            _ => inner_end.max(offset + open.end),
        };
        found.push(element);
        if offset >= html.len() {
            break;
        }
    }
    found
}

/// First `tag` element whose `id` attribute equals `id`
pub fn find_by_id<'a>(html: &'a str, tag: &str, id: &str) -> Option<Element<'a>> {
    tags(html, tag)
        .filter(|t| !t.closing)
        .find(|t| attr(t.attrs, "id").as_deref() == Some(id))
        .map(|t| close_element(html, tag, &t))
}

/// Value of attribute `name` in a raw attribute string, entities decoded
pub fn attr(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4)))
        .map(|m| decode_entities(m.as_str()))
}

/// Text content of a fragment: each text piece between tags is decoded and
/// trimmed, empty pieces are dropped and the rest are joined without separator.
pub fn text(fragment: &str) -> String {
    ANY_TAG_RE
        .split(fragment)
        .map(decode_entities)
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Decode numeric and the common named character references
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    ENTITY_RE
        .replace_all(s, |c: &regex::Captures| {
            let name = &c[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            decoded.map_or_else(|| c[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "reg" => '®',
        "copy" => '©',
        "trade" => '™',
        "deg" => '°',
        "micro" => 'µ',
        "plusmn" => '±',
        "Omega" => 'Ω',
        "ndash" => '–',
        "mdash" => '—',
        _ => return None,
    })
}
