//! Delimiter scanning for `$...$` and `$$...$$` math spans.
//!
//! The scanner is a single left-to-right pass over a text buffer. It is
//! deliberately dumb: it knows about the two dollar forms and backslash
//! escapes, nothing else. Spans are recomputed fresh every time they are
//! needed because the host may rewrite the buffer between scans.
//!
//! Offsets are byte offsets into the scanned `&str`. Both delimiters and the
//! escape character are ASCII, so every offset the scanner produces lands on
//! a char boundary. DOM hosts address text in UTF-16 code units; use
//! [`Span::to_utf16`] to translate.

use std::iter::FusedIterator;
use std::ops::Range;

/// Which dollar form delimits a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DelimiterForm {
    /// `$...$`
    Inline,
    /// `$$...$$`
    Display,
}

impl DelimiterForm {
    /// The delimiter text for this form.
    pub fn delimiter(self) -> &'static str {
        match self {
            DelimiterForm::Inline => "$",
            DelimiterForm::Display => "$$",
        }
    }

    /// Length of the delimiter in bytes (and in UTF-16 units, it's ASCII).
    pub fn len(self) -> usize {
        self.delimiter().len()
    }
}

/// A located delimiter-bounded region of text.
///
/// `open_offset..inner_start` is the opening delimiter,
/// `inner_start..inner_end` the math content and
/// `inner_end..close_offset` the closing delimiter. `close_offset` is
/// exclusive. Inner content is never empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub open_offset: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    pub close_offset: usize,
    pub form: DelimiterForm,
}

impl Span {
    /// Whether this is the `$$` form.
    pub fn is_display(&self) -> bool {
        self.form == DelimiterForm::Display
    }

    /// The math content between the delimiters.
    ///
    /// `text` must be the buffer this span was scanned from.
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.inner_range()]
    }

    pub fn inner_len(&self) -> usize {
        self.inner_end - self.inner_start
    }

    pub fn inner_range(&self) -> Range<usize> {
        self.inner_start..self.inner_end
    }

    pub fn opener_range(&self) -> Range<usize> {
        self.open_offset..self.inner_start
    }

    pub fn closer_range(&self) -> Range<usize> {
        self.inner_end..self.close_offset
    }

    /// Delimiters included.
    pub fn outer_range(&self) -> Range<usize> {
        self.open_offset..self.close_offset
    }

    /// Translate this span into UTF-16 code unit offsets within `text`.
    pub fn to_utf16(&self, text: &str) -> Utf16Span {
        Utf16Span {
            open_offset: utf16_offset(text, self.open_offset),
            inner_start: utf16_offset(text, self.inner_start),
            inner_end: utf16_offset(text, self.inner_end),
            close_offset: utf16_offset(text, self.close_offset),
        }
    }
}

/// A [`Span`] expressed in UTF-16 code units, as DOM ranges count them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Utf16Span {
    pub open_offset: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    pub close_offset: usize,
}

/// Convert a byte offset in `text` to a UTF-16 code unit offset.
///
/// Offsets past the end clamp to the end of the buffer. An offset inside a
/// multi-byte char counts that char as not yet reached.
pub fn utf16_offset(text: &str, byte_offset: usize) -> usize {
    let end = byte_offset.min(text.len());
    text.char_indices()
        .take_while(|(i, _)| *i < end)
        .map(|(_, c)| c.len_utf16())
        .sum()
}

/// Lazily scan `text` for convertible spans, left to right.
///
/// Cloning the returned iterator gives an independent scan from the same
/// point, so a scan can be restarted without rescanning from the start.
pub fn scan(text: &str) -> Spans<'_> {
    Spans { text, pos: 0 }
}

/// All spans in `text`.
pub fn find_spans(text: &str) -> Vec<Span> {
    scan(text).collect()
}

/// The first span in `text`, if any.
pub fn first_span(text: &str) -> Option<Span> {
    scan(text).next()
}

/// Iterator over the spans in a buffer. See [`scan`].
#[derive(Clone, Debug)]
pub struct Spans<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Spans<'a> {
    /// The buffer being scanned.
    pub fn text(&self) -> &'a str {
        self.text
    }
}

impl Iterator for Spans<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        let bytes = self.text.as_bytes();

        while self.pos < bytes.len() {
            let Some(open) = find_opener(bytes, self.pos) else {
                self.pos = bytes.len();
                return None;
            };

            let form = if bytes.get(open + 1) == Some(&b'$') {
                DelimiterForm::Display
            } else {
                DelimiterForm::Inline
            };
            let inner_start = open + form.len();

            let Some(inner_end) = find_closer(bytes, inner_start, form) else {
                // Stray opener: retry one byte further so a later `$` can
                // still pair up.
                self.pos = open + 1;
                continue;
            };

            let close_offset = inner_end + form.len();
            self.pos = close_offset;

            if inner_end > inner_start {
                return Some(Span {
                    open_offset: open,
                    inner_start,
                    inner_end,
                    close_offset,
                    form,
                });
            }
        }

        None
    }
}

impl FusedIterator for Spans<'_> {}

/// Position of the next unescaped `$` at or after `from`.
fn find_opener(bytes: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Position where the closing delimiter for `form` starts.
fn find_closer(bytes: &[u8], from: usize, form: DelimiterForm) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => match form {
                DelimiterForm::Inline => return Some(i),
                DelimiterForm::Display if bytes.get(i + 1) == Some(&b'$') => return Some(i),
                // A single `$` inside display content is content.
                DelimiterForm::Display => i += 1,
            },
            _ => i += 1,
        }
    }
    None
}
