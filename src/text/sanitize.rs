//! Markup sanitizer for Telegram's HTML parse mode.
//!
//! Turns rich HTML coming from the AI backend into the small tag subset
//! Telegram accepts. The pipeline works on escaped text: everything is
//! escaped first, then the allowed inline tags are restored and every
//! other known tag is degraded to an allowed tag, a literal, or nothing.

// lazy_regex! uses once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use tracing::debug;

/// Tags Telegram understands in HTML parse mode
pub const ALLOWED_TAGS: &[&str] = &["b", "i", "u", "s", "code", "pre", "a"];

/// Upper bound on pipeline passes while looking for a fixed point
const MAX_PASSES: usize = 32;

/// Entities that survive escaping untouched
static RE_ENTITY: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"^&(?:lt|gt|amp|quot|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});");

/// Escaped allowed tag: `&lt;b&gt;`, `&lt;/code&gt;`, `&lt;a href="..."&gt;`
static RE_ESCAPED_ALLOWED: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)&lt;(/?)(b|i|u|s|code|pre|a)((?:\s[^\n]*?)?)/?&gt;");

/// Any escaped tag shape
static RE_ESCAPED_TAG: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"&lt;(/?)([a-zA-Z][a-zA-Z0-9]*)((?:\s[^\n]*?)?)/?&gt;");

/// Real tags, which only the restore and degrade steps can produce
static RE_REAL_TAG: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"<(/?)([a-zA-Z0-9]+)([^>]*)>");

/// A newline separated from the next one by blank content only
static RE_BLANK_LINE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\n\s*\n");

/// Match 3+ consecutive newlines
static RE_MULTI_NEWLINE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\n{3,}");

/// Symbols spelled out in ASCII. Output is already escaped.
const MATH_SYMBOLS: &[(&str, &str)] = &[
    ("α", "alpha"),
    ("β", "beta"),
    ("γ", "gamma"),
    ("δ", "delta"),
    ("Δ", "Delta"),
    ("ε", "epsilon"),
    ("θ", "theta"),
    ("λ", "lambda"),
    ("μ", "mu"),
    ("π", "pi"),
    ("σ", "sigma"),
    ("τ", "tau"),
    ("φ", "phi"),
    ("ω", "omega"),
    ("Ω", "Omega"),
    ("±", "+/-"),
    ("×", "x"),
    ("÷", "/"),
    ("≈", "~="),
    ("≠", "!="),
    ("≤", "&lt;="),
    ("≥", "&gt;="),
    ("∞", "inf"),
    ("∑", "sum"),
    ("∏", "prod"),
    ("∫", "int"),
    ("∂", "partial"),
    ("√", "sqrt"),
    ("∛", "cbrt"),
    ("∝", "prop to"),
];

/// Sanitizes rich markup into Telegram-safe HTML.
///
/// Total and idempotent: `sanitize(&sanitize(x)) == sanitize(x)` for every input.
///
/// # Examples
///
/// ```
/// use pdf_analyst::text::sanitize::sanitize;
///
/// let html = "<h2>Result</h2><p>x ≤ 3 <em>always</em></p>";
/// assert_eq!(sanitize(html), "<b>Result</b>x &lt;= 3 <i>always</i>");
/// ```
#[must_use]
pub fn sanitize(text: &str) -> String {
    let mut current = sanitize_pass(text);
    for pass in 1..MAX_PASSES {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        debug!(pass, "Sanitizer output changed on re-application");
        current = next;
    }
    current
}

/// Removes every tag and decodes entities, producing text for plain parse mode.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    let without_tags = RE_REAL_TAG.replace_all(text, "");
    html_escape::decode_html_entities(&without_tags).into_owned()
}

fn sanitize_pass(text: &str) -> String {
    let escaped = escape_markup(text);
    let converted = convert_tags(&escaped);
    let ascii = replace_math_symbols(converted);
    let balanced = balance_tags(&ascii);
    normalize_whitespace(&balanced)
}

/// Escapes `<`, `>` and any `&` that does not already start an entity.
fn escape_markup(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for (idx, c) in text.char_indices() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' if RE_ENTITY.is_match(&text[idx..]) => result.push('&'),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

/// Restores and degrades escaped tags until none of them change.
///
/// Removing a tag can join its neighbours into a new escaped tag, so one
/// replacement round is not enough. Every change consumes an `&lt;`, which
/// bounds the loop.
fn convert_tags(text: &str) -> String {
    let mut current = restore_allowed_tags(text);
    loop {
        let next = restore_allowed_tags(&degrade_rich_tags(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

fn restore_allowed_tags(text: &str) -> String {
    RE_ESCAPED_ALLOWED
        .replace_all(text, |caps: &regex::Captures| {
            let closing = caps.get(1).map_or("", |m| m.as_str());
            let name = caps
                .get(2)
                .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
            let attrs = caps.get(3).map_or("", |m| m.as_str());
            if closing.is_empty() && name == "a" {
                format!("<a{attrs}>")
            } else {
                format!("<{closing}{name}>")
            }
        })
        .into_owned()
}

fn degrade_rich_tags(text: &str) -> String {
    RE_ESCAPED_TAG
        .replace_all(text, |caps: &regex::Captures| {
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let name = caps
                .get(2)
                .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
            tag_replacement(&name, closing).map_or_else(
                || caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
                ToString::to_string,
            )
        })
        .into_owned()
}

/// Replacement for an opening or closing rich tag; `None` leaves the text alone.
fn tag_replacement(name: &str, closing: bool) -> Option<&'static str> {
    let pick = |open: &'static str, close: &'static str| Some(if closing { close } else { open });
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "strong" => pick("<b>", "</b>"),
        "em" | "figcaption" | "cite" => pick("<i>", "</i>"),
        "ins" => pick("<u>", "</u>"),
        "del" | "strike" => pick("<s>", "</s>"),
        "sub" => pick("_", ""),
        "sup" => pick("^", ""),
        "br" => Some("\n"),
        "hr" => Some("\n—————\n"),
        "img" => Some("[IMAGE]"),
        "table" => Some("\n\n"),
        "tr" => pick("", "\n"),
        "td" | "th" => pick("", "\t"),
        "li" => pick("• ", "\n"),
        "thead" | "tbody" | "tfoot" | "caption" | "colgroup" | "col" | "div" | "span" | "p"
        | "figure" | "section" | "article" | "header" | "footer" | "main" | "nav" | "ul"
        | "ol" | "blockquote" | "font" | "center" | "small" | "big" | "mark" | "abbr"
        | "html" | "body" => Some(""),
        _ => None,
    }
}

fn replace_math_symbols(mut text: String) -> String {
    for (symbol, ascii) in MATH_SYMBOLS {
        if text.contains(symbol) {
            text = text.replace(symbol, ascii);
        }
    }
    text
}

/// Drops real tags outside the allow list, drops orphan closing tags and
/// closes whatever is still open at the end.
fn balance_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut open: Vec<String> = Vec::new();
    let mut last_end = 0;

    for caps in RE_REAL_TAG.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        result.push_str(&text[last_end..whole.start()]);
        last_end = whole.end();

        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map_or("", |m| m.as_str());
        if !ALLOWED_TAGS.contains(&name) {
            continue;
        }

        if !closing {
            result.push_str(whole.as_str());
            open.push(name.to_string());
        } else if let Some(pos) = open.iter().rposition(|tag| tag == name) {
            // Close inner tags first so nesting stays valid
            for inner in open.drain(pos..).rev() {
                result.push_str("</");
                result.push_str(&inner);
                result.push('>');
            }
        }
    }
    result.push_str(&text[last_end..]);

    for tag in open.iter().rev() {
        result.push_str("</");
        result.push_str(tag);
        result.push('>');
    }
    result
}

fn normalize_whitespace(text: &str) -> String {
    let paragraphs = RE_BLANK_LINE.replace_all(text, "\n\n");
    RE_MULTI_NEWLINE.replace_all(&paragraphs, "\n\n").into_owned()
}
