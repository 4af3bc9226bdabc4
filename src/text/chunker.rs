//! Splits long messages into bounded chunks along paragraph and sentence
//! boundaries.
//!
//! Chunk bodies are contiguous slices of the input, so concatenating them
//! reproduces the original text exactly. Lengths are counted in `char`s.

// lazy_regex! uses once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use unicode_segmentation::UnicodeSegmentation;

/// Sentence terminator followed by whitespace; the whitespace stays with the sentence
static RE_SENTENCE_END: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"[.!?]\s+");

/// One piece of a longer logical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Title and/or part label, including the separating blank line
    pub header: String,
    /// Slice of the original text carried by this chunk
    pub body: String,
}

impl Chunk {
    /// Full message text: header followed by body.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}{}", self.header, self.body)
    }

    /// Length in characters of the full message text.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.header.chars().count() + self.body.chars().count()
    }
}

/// How part headers are written.
#[derive(Debug, Clone, Copy)]
enum Labeling<'t> {
    /// `"{title} (Part i/n)"`
    Titled(&'t str),
    /// `"Part i/n"`
    Generic,
    /// No header at all, used when even the generic label does not fit
    Bare,
}

impl Labeling<'_> {
    fn header(self, index: usize, total: usize) -> String {
        match self {
            Self::Titled(title) => format!("{title} (Part {index}/{total})\n\n"),
            Self::Generic => format!("Part {index}/{total}\n\n"),
            Self::Bare => String::new(),
        }
    }
}

/// Splits `text` into chunks whose full length never exceeds `max_length`.
///
/// Text that fits together with its title comes back as a single chunk
/// without a part label. Longer text is packed paragraph by paragraph,
/// then sentence by sentence, and finally hard-split when a single
/// sentence is longer than a chunk. A title is repeated on every part.
///
/// A header is dropped to the generic `Part i/n` label, and then to no
/// label at all, when it would take more than half of `max_length`.
///
/// # Examples
///
/// ```
/// use pdf_analyst::text::chunker::split;
///
/// let chunks = split("short answer", Some("Result"), 100);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text(), "Result\n\nshort answer");
///
/// let long = "First paragraph.\n\nSecond paragraph.";
/// let chunks = split(long, None, 30);
/// assert_eq!(chunks[0].text(), "Part 1/2\n\nFirst paragraph.\n\n");
/// assert_eq!(chunks[1].text(), "Part 2/2\n\nSecond paragraph.");
/// ```
#[must_use]
pub fn split(text: &str, title: Option<&str>, max_length: usize) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }
    let max_length = max_length.max(1);

    let single_header = title.map_or_else(String::new, |t| format!("{t}\n\n"));
    if single_header.chars().count() + text.chars().count() <= max_length {
        return vec![Chunk {
            header: single_header,
            body: text.to_string(),
        }];
    }

    let labelings = title
        .map(Labeling::Titled)
        .into_iter()
        .chain([Labeling::Generic, Labeling::Bare]);

    for labeling in labelings {
        if let Some(chunks) = split_labeled(text, labeling, max_length) {
            return chunks;
        }
    }
    // Bare labeling always succeeds
    Vec::new()
}

fn split_labeled(text: &str, labeling: Labeling<'_>, max_length: usize) -> Option<Vec<Chunk>> {
    // Header width depends on the digit count of the total, so re-split
    // until the estimate covers the actual number of parts.
    let mut estimate = 1;
    loop {
        let width = labeling.header(estimate, estimate).chars().count();
        if width > 0 && width * 2 > max_length {
            return None;
        }

        let bodies = split_bodies(text, max_length - width);
        let total = bodies.len();
        if digits(total) <= digits(estimate) {
            let chunks = bodies
                .into_iter()
                .enumerate()
                .map(|(idx, body)| Chunk {
                    header: labeling.header(idx + 1, total),
                    body: body.to_string(),
                })
                .collect();
            return Some(chunks);
        }
        estimate = total;
    }
}

const fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// Granularity of a piece offered to the packer.
#[derive(Debug, Clone, Copy)]
enum Level {
    Paragraph,
    Sentence,
    Grapheme,
}

/// Greedy packer over consecutive slices of one text.
struct Packer<'a> {
    text: &'a str,
    capacity: usize,
    start: usize,
    end: usize,
    chars: usize,
    bodies: Vec<&'a str>,
}

impl<'a> Packer<'a> {
    fn new(text: &'a str, capacity: usize) -> Self {
        Self {
            text,
            capacity,
            start: 0,
            end: 0,
            chars: 0,
            bodies: Vec::new(),
        }
    }

    /// Offers the next piece; pieces must arrive in order and without gaps.
    fn offer(&mut self, piece: &'a str, level: Level) {
        let len = piece.chars().count();
        if self.chars + len <= self.capacity {
            self.accept(piece, len);
            return;
        }

        self.flush();
        if len <= self.capacity {
            self.accept(piece, len);
            return;
        }

        match level {
            Level::Paragraph => {
                for sentence in sentences(piece) {
                    self.offer(sentence, Level::Sentence);
                }
            }
            Level::Sentence => {
                for grapheme in piece.graphemes(true) {
                    self.offer(grapheme, Level::Grapheme);
                }
            }
            // A single grapheme cluster wider than the capacity
            Level::Grapheme => {
                for (idx, c) in piece.char_indices() {
                    self.accept(&piece[idx..idx + c.len_utf8()], 1);
                    if self.chars >= self.capacity {
                        self.flush();
                    }
                }
            }
        }
    }

    fn accept(&mut self, piece: &str, len: usize) {
        self.end += piece.len();
        self.chars += len;
    }

    fn flush(&mut self) {
        if self.end > self.start {
            self.bodies.push(&self.text[self.start..self.end]);
            self.start = self.end;
            self.chars = 0;
        }
    }

    fn finish(mut self) -> Vec<&'a str> {
        self.flush();
        self.bodies
    }
}

fn split_bodies(text: &str, capacity: usize) -> Vec<&str> {
    let mut packer = Packer::new(text, capacity.max(1));
    for paragraph in text.split_inclusive("\n\n") {
        packer.offer(paragraph, Level::Paragraph);
    }
    packer.finish()
}

/// Splits after each `.`, `!` or `?` plus its trailing whitespace.
fn sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut last_end = 0;
    for m in RE_SENTENCE_END.find_iter(text) {
        pieces.push(&text[last_end..m.end()]);
        last_end = m.end();
    }
    if last_end < text.len() {
        pieces.push(&text[last_end..]);
    }
    pieces
}
