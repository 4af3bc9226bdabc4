//! Markdown to Telegram HTML rendering for AI output.

// lazy_regex! uses once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// Match fenced code blocks with optional language: ```language\ncode```
static RE_CODE_BLOCK_FENCE: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"```([\w+-]*)\n?([\s\S]*?)```");

/// Match inline code: `code`
static RE_INLINE_CODE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"`([^`\n]+)`");

/// Match headings: # Title
static RE_HEADING: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?m)^#{1,6}[ \t]+(.+?)[ \t#]*$");

/// Match bullet points at start of line: * item, - item
static RE_BULLET: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?m)^([ \t]*)[*-][ \t]+");

/// Match bold text: **text** or __text__
static RE_BOLD: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\*\*(.+?)\*\*|__(.+?)__");

/// Match italic text: *text*
static RE_ITALIC: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\*([^*\n]+?)\*");

/// Match 3+ consecutive newlines
static RE_MULTI_NEWLINE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\n{3,}");

/// Renders Markdown produced by the AI backend as Telegram HTML.
///
/// Supported formatting:
/// - Code blocks: ` ```language\ncode``` ` -> `<pre>code</pre>`
/// - Headings: `## Title` -> `<b>Title</b>`
/// - Bullets: `* ` or `- ` at the start of a line -> `• `
/// - Bold: `**text**` -> `<b>text</b>`
/// - Italic: `*text*` -> `<i>text</i>`
/// - Inline code: `` `code` `` -> `<code>code</code>`
///
/// Everything else is HTML-escaped, so literal `<`, `>` and `&` in the
/// model output can never break Telegram's parser.
///
/// # Examples
///
/// ```
/// use pdf_analyst::text::markdown::render;
///
/// let html = render("**Total:** 3 < 4 and `x`");
/// assert_eq!(html, "<b>Total:</b> 3 &lt; 4 and <code>x</code>");
/// ```
#[must_use]
pub fn render(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 4);
    let mut last_end = 0;

    for caps in RE_CODE_BLOCK_FENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        result.push_str(&render_prose(&text[last_end..whole.start()]));
        let code = caps.get(2).map_or("", |m| m.as_str()).trim_end();
        result.push_str("<pre>");
        result.push_str(&html_escape::encode_text(code));
        result.push_str("</pre>");
        last_end = whole.end();
    }
    result.push_str(&render_prose(&text[last_end..]));

    RE_MULTI_NEWLINE
        .replace_all(&result, "\n\n")
        .trim()
        .to_string()
}

/// Renders text outside code blocks, keeping inline code spans verbatim.
fn render_prose(text: &str) -> String {
    let escaped = html_escape::encode_text(text);
    let headings = RE_HEADING.replace_all(&escaped, "<b>$1</b>");
    let lines = RE_BULLET.replace_all(&headings, "$1• ");

    let mut result = String::with_capacity(lines.len());
    let mut last_end = 0;
    for caps in RE_INLINE_CODE.captures_iter(&lines) {
        let Some(whole) = caps.get(0) else { continue };
        result.push_str(&render_emphasis(&lines[last_end..whole.start()]));
        result.push_str("<code>");
        result.push_str(caps.get(1).map_or("", |m| m.as_str()));
        result.push_str("</code>");
        last_end = whole.end();
    }
    result.push_str(&render_emphasis(&lines[last_end..]));
    result
}

fn render_emphasis(text: &str) -> String {
    let bold = RE_BOLD.replace_all(text, |caps: &regex::Captures| {
        let inner = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        format!("<b>{inner}</b>")
    });
    RE_ITALIC.replace_all(&bold, "<i>$1</i>").into_owned()
}
