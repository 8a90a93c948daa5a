//! Byte-level scanners shared by the block and inline parsers.
//!
//! Every scanner takes a byte slice and a starting position and returns the
//! position just past what it recognized, or `None`. None of them allocate
//! except the decoders ([`unescape`], [`decode_entity`]).

use std::borrow::Cow;

use memchr::{memchr, memmem};

use crate::ast::CowStr;

/// Slice a `CowStr`, keeping the borrow when there is one.
#[inline]
pub(crate) fn slice_cow<'a>(text: &CowStr<'a>, start: usize, end: usize) -> CowStr<'a> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(&s[start..end]),
        Cow::Owned(s) => Cow::Owned(s[start..end].to_owned()),
    }
}

#[inline]
pub(crate) fn is_ascii_punctuation(b: u8) -> bool {
    b.is_ascii_punctuation()
}

#[inline]
pub(crate) fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Skip spaces and tabs.
#[inline]
pub(crate) fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_space_or_tab(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// Skip spaces, at most one line ending, then spaces again.
pub(crate) fn skip_spnl(bytes: &[u8], pos: usize) -> usize {
    let mut pos = skip_spaces(bytes, pos);
    if bytes.get(pos) == Some(&b'\n') {
        pos = skip_spaces(bytes, pos + 1);
    }
    pos
}

/// Length of the run of `ch` starting at `pos`.
#[inline]
pub(crate) fn run_length(bytes: &[u8], pos: usize, ch: u8) -> usize {
    bytes[pos..].iter().take_while(|&&b| b == ch).count()
}

// =============================================================================
// Links
// =============================================================================

const MAX_LABEL_LEN: usize = 999;
const MAX_DEST_PARENS: usize = 32;

/// A link label `[...]` starting at `pos`; returns the position after `]`.
pub(crate) fn scan_link_label(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'[') {
        return None;
    }
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|&b| is_ascii_punctuation(b)) => i += 2,
            b'[' => return None,
            b']' => {
                return (i - pos - 1 <= MAX_LABEL_LEN).then_some(i + 1);
            }
            _ => i += 1,
        }
        if i - pos > MAX_LABEL_LEN + 1 {
            return None;
        }
    }
    None
}

/// Where a scanned link destination sits in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Destination {
    pub start: usize,
    pub end: usize,
    /// Position after the destination, including a closing `>`.
    pub next: usize,
}

/// A link destination, either `<...>` or a raw run with balanced parens.
///
/// Raw destinations may be empty only when `allow_empty` is set (inline
/// links followed directly by `)`).
pub(crate) fn scan_link_destination(
    bytes: &[u8],
    pos: usize,
    allow_empty: bool,
) -> Option<Destination> {
    if bytes.get(pos) == Some(&b'<') {
        let mut i = pos + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if bytes.get(i + 1).is_some_and(|&b| is_ascii_punctuation(b)) => i += 2,
                b'>' => {
                    return Some(Destination {
                        start: pos + 1,
                        end: i,
                        next: i + 1,
                    })
                }
                b'\n' | b'<' => return None,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut depth = 0usize;
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|&b| is_ascii_punctuation(b)) => i += 2,
            b'(' => {
                depth += 1;
                if depth > MAX_DEST_PARENS {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                i += 1;
            }
            b if b <= b' ' || b == 0x7f => break,
            _ => i += 1,
        }
    }
    if depth != 0 || (i == pos && !allow_empty) {
        return None;
    }
    Some(Destination {
        start: pos,
        end: i,
        next: i,
    })
}

/// A link title in `"..."`, `'...'` or `(...)`; returns the content range and
/// the position after the closing delimiter.
pub(crate) fn scan_link_title(bytes: &[u8], pos: usize) -> Option<(usize, usize, usize)> {
    let close = match bytes.get(pos)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|&b| is_ascii_punctuation(b)) => i += 2,
            b if b == close => return Some((pos + 1, i, i + 1)),
            b'(' if close == b')' => return None,
            _ => i += 1,
        }
    }
    None
}

// =============================================================================
// Escapes and entities
// =============================================================================

/// Named references whose value is two code points.
const TWO_CODE_POINT_ENTITIES: &[(&str, &str)] = &[
    ("NotEqualTilde", "\u{2242}\u{338}"),
    ("NotGreaterFullEqual", "\u{2267}\u{338}"),
    ("NotGreaterGreater", "\u{226B}\u{338}"),
    ("NotGreaterSlantEqual", "\u{2A7E}\u{338}"),
    ("NotHumpDownHump", "\u{224E}\u{338}"),
    ("NotHumpEqual", "\u{224F}\u{338}"),
    ("NotLeftTriangleBar", "\u{29CF}\u{338}"),
    ("NotLessLess", "\u{226A}\u{338}"),
    ("NotLessSlantEqual", "\u{2A7D}\u{338}"),
    ("NotNestedGreaterGreater", "\u{2AA2}\u{338}"),
    ("NotNestedLessLess", "\u{2AA1}\u{338}"),
    ("NotPrecedesEqual", "\u{2AAF}\u{338}"),
    ("NotRightTriangleBar", "\u{29D0}\u{338}"),
    ("NotSquareSubset", "\u{228F}\u{338}"),
    ("NotSquareSuperset", "\u{2290}\u{338}"),
    ("NotSubset", "\u{2282}\u{20D2}"),
    ("NotSucceedsEqual", "\u{2AB0}\u{338}"),
    ("NotSucceedsTilde", "\u{227F}\u{338}"),
    ("NotSuperset", "\u{2283}\u{20D2}"),
    ("ThickSpace", "\u{205F}\u{200A}"),
    ("acE", "\u{223E}\u{333}"),
    ("bne", "=\u{20E5}"),
    ("bnequiv", "\u{2261}\u{20E5}"),
    ("caps", "\u{2229}\u{FE00}"),
    ("cups", "\u{222A}\u{FE00}"),
    ("fjlig", "fj"),
    ("gesl", "\u{22DB}\u{FE00}"),
    ("gvertneqq", "\u{2269}\u{FE00}"),
    ("gvnE", "\u{2269}\u{FE00}"),
    ("lates", "\u{2AAD}\u{FE00}"),
    ("lesg", "\u{22DA}\u{FE00}"),
    ("lvertneqq", "\u{2268}\u{FE00}"),
    ("lvnE", "\u{2268}\u{FE00}"),
    ("nGg", "\u{22D9}\u{338}"),
    ("nGt", "\u{226B}\u{20D2}"),
    ("nGtv", "\u{226B}\u{338}"),
    ("nLl", "\u{22D8}\u{338}"),
    ("nLt", "\u{226A}\u{20D2}"),
    ("nLtv", "\u{226A}\u{338}"),
    ("nang", "\u{2220}\u{20D2}"),
    ("napE", "\u{2A70}\u{338}"),
    ("napid", "\u{224B}\u{338}"),
    ("nbump", "\u{224E}\u{338}"),
    ("nbumpe", "\u{224F}\u{338}"),
    ("ncongdot", "\u{2A6D}\u{338}"),
    ("nedot", "\u{2250}\u{338}"),
    ("nesim", "\u{2242}\u{338}"),
    ("ngE", "\u{2267}\u{338}"),
    ("ngeqq", "\u{2267}\u{338}"),
    ("ngeqslant", "\u{2A7E}\u{338}"),
    ("nges", "\u{2A7E}\u{338}"),
    ("nlE", "\u{2266}\u{338}"),
    ("nleqq", "\u{2266}\u{338}"),
    ("nleqslant", "\u{2A7D}\u{338}"),
    ("nles", "\u{2A7D}\u{338}"),
    ("nparsl", "\u{2AFD}\u{20E5}"),
    ("npart", "\u{2202}\u{338}"),
    ("npre", "\u{2AAF}\u{338}"),
    ("npreceq", "\u{2AAF}\u{338}"),
    ("nrarrc", "\u{2933}\u{338}"),
    ("nrarrw", "\u{219D}\u{338}"),
    ("nsce", "\u{2AB0}\u{338}"),
    ("nsubE", "\u{2AC5}\u{338}"),
    ("nsubset", "\u{2282}\u{20D2}"),
    ("nsubseteqq", "\u{2AC5}\u{338}"),
    ("nsucceq", "\u{2AB0}\u{338}"),
    ("nsupE", "\u{2AC6}\u{338}"),
    ("nsupset", "\u{2283}\u{20D2}"),
    ("nsupseteqq", "\u{2AC6}\u{338}"),
    ("nvap", "\u{224D}\u{20D2}"),
    ("nvge", "\u{2265}\u{20D2}"),
    ("nvgt", ">\u{20D2}"),
    ("nvle", "\u{2264}\u{20D2}"),
    ("nvlt", "<\u{20D2}"),
    ("nvltrie", "\u{22B4}\u{20D2}"),
    ("nvrtrie", "\u{22B5}\u{20D2}"),
    ("nvsim", "\u{223C}\u{20D2}"),
    ("race", "\u{223D}\u{331}"),
    ("smtes", "\u{2AAC}\u{FE00}"),
    ("sqcaps", "\u{2293}\u{FE00}"),
    ("sqcups", "\u{2294}\u{FE00}"),
    ("varsubsetneq", "\u{228A}\u{FE00}"),
    ("varsubsetneqq", "\u{2ACB}\u{FE00}"),
    ("varsupsetneq", "\u{228B}\u{FE00}"),
    ("varsupsetneqq", "\u{2ACC}\u{FE00}"),
    ("vnsub", "\u{2282}\u{20D2}"),
    ("vnsup", "\u{2283}\u{20D2}"),
    ("vsubnE", "\u{2ACB}\u{FE00}"),
    ("vsubne", "\u{228A}\u{FE00}"),
    ("vsupnE", "\u{2ACC}\u{FE00}"),
    ("vsupne", "\u{228B}\u{FE00}"),
];

/// Decode the entity or numeric character reference starting at `pos`
/// (which must be `&`). Returns the decoded text and the position after `;`.
pub(crate) fn decode_entity(text: &str, pos: usize) -> Option<(String, usize)> {
    let tail = text.as_bytes().get(pos + 1..)?;
    let semi = pos + 1 + memchr(b';', &tail[..tail.len().min(40)])?;
    let body = &text[pos + 1..semi];
    let end = semi + 1;

    if let Some(num) = body.strip_prefix('#') {
        let (digits, radix, max_len) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 6),
            None => (num, 10, 7),
        };
        if digits.is_empty()
            || digits.len() > max_len
            || !digits.bytes().all(|b| (b as char).is_digit(radix))
        {
            return None;
        }
        let code = u32::from_str_radix(digits, radix).ok()?;
        let ch = match code {
            0 => '\u{FFFD}',
            _ => char::from_u32(code).unwrap_or('\u{FFFD}'),
        };
        return Some((ch.to_string(), end));
    }

    let name = body.as_bytes();
    if name.is_empty()
        || name.len() > 31
        || !name[0].is_ascii_alphabetic()
        || !name.iter().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }
    if let Ok(found) = TWO_CODE_POINT_ENTITIES.binary_search_by_key(&body, |&(name, _)| name) {
        return Some((TWO_CODE_POINT_ENTITIES[found].1.to_string(), end));
    }
    // Named references expand to one or two code points; anything longer
    // means only a legacy prefix of the name was recognized.
    let raw = &text[pos..end];
    match html_escape::decode_html_entities(raw) {
        Cow::Owned(decoded) if decoded != raw && decoded.chars().count() <= 2 => {
            Some((decoded, end))
        }
        _ => None,
    }
}

/// Process backslash escapes and character references.
pub(crate) fn unescape<'a>(text: CowStr<'a>) -> CowStr<'a> {
    if !text.bytes().any(|b| b == b'\\' || b == b'&') {
        return text;
    }
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|&b| is_ascii_punctuation(b)) => {
                out.push_str(&text[copied..i]);
                copied = i + 1;
                i += 2;
            }
            b'&' => match decode_entity(&text, i) {
                Some((decoded, end)) => {
                    out.push_str(&text[copied..i]);
                    out.push_str(&decoded);
                    i = end;
                    copied = end;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

// =============================================================================
// Autolinks and raw HTML
// =============================================================================

/// `<scheme:...>` or `<user@host>` at `pos`; returns the end (after `>`) and
/// whether it is an email address.
pub(crate) fn scan_autolink(bytes: &[u8], pos: usize) -> Option<(usize, bool)> {
    if bytes.get(pos) != Some(&b'<') {
        return None;
    }
    let start = pos + 1;
    // Neither form allows `<` or whitespace inside, so the scan stops at the
    // first of those.
    let close = start
        + bytes[start..]
            .iter()
            .position(|&b| b == b'>' || b == b'<' || b <= b' ')?;
    if bytes[close] != b'>' {
        return None;
    }
    let inner = &bytes[start..close];

    if let Some(colon) = memchr(b':', inner) {
        let scheme = &inner[..colon];
        let scheme_ok = (2..=32).contains(&scheme.len())
            && scheme[0].is_ascii_alphabetic()
            && scheme
                .iter()
                .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'));
        let rest_ok = inner[colon + 1..]
            .iter()
            .all(|&b| b > b' ' && b != b'<' && b != 0x7f);
        if scheme_ok && rest_ok {
            return Some((close + 1, false));
        }
    }

    is_email(inner).then_some((close + 1, true))
}

fn is_email(inner: &[u8]) -> bool {
    let Some(at) = memchr(b'@', inner) else {
        return false;
    };
    let (local, domain) = (&inner[..at], &inner[at + 1..]);
    let local_ok = !local.is_empty()
        && local
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b));
    local_ok
        && !domain.is_empty()
        && domain.split(|&b| b == b'.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label[0].is_ascii_alphanumeric()
                && label[label.len() - 1].is_ascii_alphanumeric()
                && label.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

fn scan_tag_name(bytes: &[u8], pos: usize) -> Option<usize> {
    if !bytes.get(pos)?.is_ascii_alphabetic() {
        return None;
    }
    let mut i = pos + 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    Some(i)
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_whitespace(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn scan_attribute(bytes: &[u8], pos: usize) -> Option<usize> {
    let first = *bytes.get(pos)?;
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b':') {
        return None;
    }
    let mut i = pos + 1;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'.' | b':' | b'-'))
    {
        i += 1;
    }
    let name_end = i;
    let j = skip_whitespace(bytes, i);
    if bytes.get(j) != Some(&b'=') {
        return Some(name_end);
    }
    let j = skip_whitespace(bytes, j + 1);
    match *bytes.get(j)? {
        quote @ (b'"' | b'\'') => {
            let close = memchr(quote, &bytes[j + 1..])?;
            Some(j + 1 + close + 1)
        }
        _ => {
            let mut k = j;
            while k < bytes.len()
                && !is_whitespace(bytes[k])
                && !matches!(bytes[k], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            {
                k += 1;
            }
            (k > j).then_some(k)
        }
    }
}

/// A complete open tag `<name attr=...>` or `<name/>` at `pos`.
pub(crate) fn scan_open_tag(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'<') {
        return None;
    }
    let mut i = scan_tag_name(bytes, pos + 1)?;
    loop {
        let j = skip_whitespace(bytes, i);
        match bytes.get(j)? {
            b'>' => return Some(j + 1),
            b'/' => return (bytes.get(j + 1) == Some(&b'>')).then_some(j + 2),
            _ if j > i => i = scan_attribute(bytes, j)?,
            _ => return None,
        }
    }
}

/// A closing tag `</name>` at `pos`.
pub(crate) fn scan_closing_tag(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos..pos + 2) != Some(b"</") {
        return None;
    }
    let i = skip_whitespace(bytes, scan_tag_name(bytes, pos + 2)?);
    (bytes.get(i) == Some(&b'>')).then_some(i + 1)
}

/// Offsets from which a raw HTML closer is known to be absent.
///
/// A failed search for `-->` from offset `p` also fails from every later
/// offset, so one miss answers all later openers of the same kind.
#[derive(Debug, Default)]
pub(crate) struct MissingClosers {
    comment: Option<usize>,
    instruction: Option<usize>,
    cdata: Option<usize>,
    declaration: Option<usize>,
}

fn find_closer(
    bytes: &[u8],
    from: usize,
    closer: &[u8],
    missing: &mut Option<usize>,
) -> Option<usize> {
    if missing.is_some_and(|p| from >= p) {
        return None;
    }
    let found = if closer.len() == 1 {
        memchr(closer[0], &bytes[from..])
    } else {
        memmem::find(&bytes[from..], closer)
    };
    match found {
        Some(i) => Some(from + i + closer.len()),
        None => {
            *missing = Some(missing.map_or(from, |p| p.min(from)));
            None
        }
    }
}

/// Raw inline HTML at `pos`: tags, comments, processing instructions,
/// declarations and CDATA sections.
pub(crate) fn scan_inline_html(
    bytes: &[u8],
    pos: usize,
    missing: &mut MissingClosers,
) -> Option<usize> {
    let rest = bytes.get(pos..)?;
    if rest.starts_with(b"<!--") {
        if rest[4..].starts_with(b">") {
            return Some(pos + 5);
        }
        if rest[4..].starts_with(b"->") {
            return Some(pos + 6);
        }
        return find_closer(bytes, pos + 4, b"-->", &mut missing.comment);
    }
    if rest.starts_with(b"<?") {
        return find_closer(bytes, pos + 2, b"?>", &mut missing.instruction);
    }
    if rest.starts_with(b"<![CDATA[") {
        return find_closer(bytes, pos + 9, b"]]>", &mut missing.cdata);
    }
    if rest.starts_with(b"<!") {
        if !rest.get(2)?.is_ascii_alphabetic() {
            return None;
        }
        return find_closer(bytes, pos + 2, b">", &mut missing.declaration);
    }
    if rest.starts_with(b"</") {
        return scan_closing_tag(bytes, pos);
    }
    scan_open_tag(bytes, pos)
}

// =============================================================================
// Block-level line patterns
// =============================================================================

const HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

const HTML_RAW_TAGS: &[&str] = &["pre", "script", "style", "textarea"];

fn starts_with_ignore_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// HTML block start condition (1-7) matched by `line`, which begins at the
/// first non-space byte.
pub(crate) fn html_block_start(line: &str) -> Option<u8> {
    let bytes = line.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }

    for tag in HTML_RAW_TAGS {
        let tag = tag.as_bytes();
        if starts_with_ignore_case(&bytes[1..], tag) {
            match bytes.get(1 + tag.len()) {
                None | Some(b' ' | b'\t' | b'>') => return Some(1),
                _ => {}
            }
        }
    }
    if bytes.starts_with(b"<!--") {
        return Some(2);
    }
    if bytes.starts_with(b"<?") {
        return Some(3);
    }
    if bytes.starts_with(b"<![CDATA[") {
        return Some(5);
    }
    if bytes.starts_with(b"<!") && bytes.get(2).is_some_and(|b| b.is_ascii_alphabetic()) {
        return Some(4);
    }

    let name_start = if bytes.get(1) == Some(&b'/') { 2 } else { 1 };
    if let Some(name_end) = scan_tag_name(bytes, name_start) {
        let name = &line[name_start..name_end];
        if HTML_BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            match bytes.get(name_end) {
                None | Some(b' ' | b'\t' | b'>') => return Some(6),
                Some(b'/') if bytes.get(name_end + 1) == Some(&b'>') => return Some(6),
                _ => {}
            }
        }
        let is_raw = HTML_RAW_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name));
        let tag_end = if name_start == 2 {
            scan_closing_tag(bytes, 0)
        } else {
            scan_open_tag(bytes, 0)
        };
        if let Some(end) = tag_end {
            if !is_raw && bytes[end..].iter().all(|&b| is_space_or_tab(b)) {
                return Some(7);
            }
        }
    }
    None
}

/// Whether `line` satisfies the end condition of HTML block `kind`.
///
/// Kinds 6 and 7 end at a blank line instead, which the block parser
/// handles itself.
pub(crate) fn html_block_ends(kind: u8, line: &str) -> bool {
    let bytes = line.as_bytes();
    match kind {
        1 => {
            let lower = line.to_ascii_lowercase();
            ["</pre>", "</script>", "</style>", "</textarea>"]
                .iter()
                .any(|end| lower.contains(end))
        }
        2 => memmem::find(bytes, b"-->").is_some(),
        3 => memmem::find(bytes, b"?>").is_some(),
        4 => memchr(b'>', bytes).is_some(),
        5 => memmem::find(bytes, b"]]>").is_some(),
        _ => false,
    }
}

/// `***`, `---` or `___` with optional interior spaces.
pub(crate) fn is_thematic_break(line: &str) -> bool {
    let bytes = line.as_bytes();
    let Some(&ch) = bytes.first() else {
        return false;
    };
    if !matches!(ch, b'*' | b'-' | b'_') {
        return false;
    }
    let mut count = 0;
    for &b in bytes {
        if b == ch {
            count += 1;
        } else if !is_space_or_tab(b) {
            return false;
        }
    }
    count >= 3
}

/// Opening code fence: returns the fence character and length.
pub(crate) fn scan_code_fence(line: &str) -> Option<(u8, usize)> {
    let bytes = line.as_bytes();
    let ch = *bytes.first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let len = run_length(bytes, 0, ch);
    if len < 3 {
        return None;
    }
    if ch == b'`' && memchr(b'`', &bytes[len..]).is_some() {
        return None;
    }
    Some((ch, len))
}

/// Closing code fence of at least `min_len` characters `ch`.
pub(crate) fn is_closing_fence(line: &str, ch: u8, min_len: usize) -> bool {
    let bytes = line.as_bytes();
    let len = run_length(bytes, 0, ch);
    len >= min_len && bytes[len..].iter().all(|&b| is_space_or_tab(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_labels() {
        assert_eq!(scan_link_label(b"[foo] x", 0), Some(5));
        assert_eq!(scan_link_label(b"[a\\]b]", 0), Some(6));
        assert_eq!(scan_link_label(b"[a[b]", 0), None);
        assert_eq!(scan_link_label(b"[open", 0), None);
    }

    #[test]
    fn destinations() {
        let d = scan_link_destination(b"<a b>)", 0, false).unwrap();
        assert_eq!((d.start, d.end, d.next), (1, 4, 5));
        let d = scan_link_destination(b"/u(r)l) x", 0, false).unwrap();
        assert_eq!(d.end, 6);
        assert!(scan_link_destination(b"(unbalanced", 0, false).is_none());
        assert!(scan_link_destination(b")", 0, false).is_none());
        assert_eq!(scan_link_destination(b")", 0, true).map(|d| d.end), Some(0));
    }

    #[test]
    fn titles() {
        assert_eq!(scan_link_title(b"\"t \\\" x\" rest", 0), Some((1, 7, 8)));
        assert_eq!(scan_link_title(b"(a(b)", 0), None);
    }

    #[test]
    fn entities() {
        assert_eq!(decode_entity("&amp;", 0), Some(("&".to_string(), 5)));
        assert_eq!(decode_entity("&#35;", 0), Some(("#".to_string(), 5)));
        assert_eq!(decode_entity("&#x22;", 0), Some(("\"".to_string(), 6)));
        assert_eq!(decode_entity("&#0;", 0), Some(("\u{FFFD}".to_string(), 4)));
        assert_eq!(decode_entity("&nosuch;", 0), None);
        assert_eq!(decode_entity("&amp", 0), None);
        assert_eq!(decode_entity("&ngE;", 0), Some(("\u{2267}\u{338}".to_string(), 5)));
        assert_eq!(decode_entity("&fjlig;", 0), Some(("fj".to_string(), 7)));
        assert_eq!(decode_entity("&nvlt;", 0), Some(("<\u{20D2}".to_string(), 6)));
    }

    #[test]
    fn two_code_point_entities_are_sorted() {
        assert!(TWO_CODE_POINT_ENTITIES.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(unescape(Cow::Borrowed("a\\*b &lt; \\q")), "a*b < \\q");
        assert!(matches!(unescape(Cow::Borrowed("plain")), Cow::Borrowed(_)));
    }

    #[test]
    fn autolinks() {
        assert_eq!(scan_autolink(b"<http://a.b/c>", 0), Some((14, false)));
        assert_eq!(scan_autolink(b"<me@example.com>", 0), Some((16, true)));
        assert_eq!(scan_autolink(b"<http://a b>", 0), None);
        assert_eq!(scan_autolink(b"<m:x>", 0), None);
    }

    fn html(bytes: &[u8]) -> Option<usize> {
        scan_inline_html(bytes, 0, &mut MissingClosers::default())
    }

    #[test]
    fn inline_html() {
        assert_eq!(html(b"<a href=\"x\">"), Some(12));
        assert_eq!(html(b"<br/>"), Some(5));
        assert_eq!(html(b"</em >"), Some(6));
        assert_eq!(html(b"<!-- c -->"), Some(10));
        assert_eq!(html(b"<!-->"), Some(5));
        assert_eq!(html(b"<?php x ?>"), Some(10));
        assert_eq!(html(b"<!DOCTYPE html>"), Some(15));
        assert_eq!(html(b"<a =x>"), None);
        assert_eq!(html(b"<33>"), None);
    }

    #[test]
    fn missing_closer_is_remembered() {
        let bytes = b"<!-- a <!-- b <?x <?y";
        let mut missing = MissingClosers::default();
        assert_eq!(scan_inline_html(bytes, 0, &mut missing), None);
        assert_eq!(missing.comment, Some(4));
        assert_eq!(scan_inline_html(bytes, 7, &mut missing), None);
        assert_eq!(missing.comment, Some(4));
        assert_eq!(scan_inline_html(bytes, 14, &mut missing), None);
        assert_eq!(missing.instruction, Some(16));
        // A closer before the remembered offset is still found.
        let bytes = b"<?a?> <?b";
        let mut missing = MissingClosers {
            instruction: Some(8),
            ..MissingClosers::default()
        };
        assert_eq!(scan_inline_html(bytes, 0, &mut missing), Some(5));
    }

    #[test]
    fn html_block_kinds() {
        assert_eq!(html_block_start("<script>"), Some(1));
        assert_eq!(html_block_start("<!-- x"), Some(2));
        assert_eq!(html_block_start("<div class=\"a\">"), Some(6));
        assert_eq!(html_block_start("</table>"), Some(6));
        assert_eq!(html_block_start("<custom-tag>  "), Some(7));
        assert_eq!(html_block_start("<span>text</span>"), None);
        assert!(html_block_ends(1, "x</SCRIPT>"));
        assert!(!html_block_ends(6, ""));
    }

    #[test]
    fn fences_and_breaks() {
        assert_eq!(scan_code_fence("```rust"), Some((b'`', 3)));
        assert_eq!(scan_code_fence("``` a`b"), None);
        assert_eq!(scan_code_fence("~~~~ a`b"), Some((b'~', 4)));
        assert!(is_closing_fence("````  ", b'`', 3));
        assert!(!is_closing_fence("``` x", b'`', 3));
        assert!(is_thematic_break("* * *"));
        assert!(is_thematic_break("___"));
        assert!(!is_thematic_break("--"));
        assert!(!is_thematic_break("-- a"));
    }
}
