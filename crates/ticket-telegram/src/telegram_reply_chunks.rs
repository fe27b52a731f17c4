//! Splits replies into `sendMessage`-sized pieces.
//!
//! Telegram counts the limit in visible characters after markup parsing, so
//! in HTML mode tags are free, an entity counts as one character and neither
//! is ever cut. Every chunk closes the tags it leaves open and the next one
//! reopens them.

use ticket_board::{html_entity_len, html_tag_len, MarkupMode};

pub const TELEGRAM_SAFE_MAX_CHARS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom<'a> {
    Tag(&'a str),
    Visible(&'a str),
}

fn atoms(text: &str, markup: MarkupMode) -> Vec<Atom<'_>> {
    let mut atoms = Vec::new();
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        let markup_len = match (markup, ch) {
            (MarkupMode::Html, '<') => html_tag_len(rest).map(|len| (len, true)),
            (MarkupMode::Html, '&') => html_entity_len(rest).map(|len| (len, false)),
            _ => None,
        };
        let (len, is_tag) = markup_len.unwrap_or((ch.len_utf8(), false));
        let (head, tail) = rest.split_at(len);
        atoms.push(if is_tag {
            Atom::Tag(head)
        } else {
            Atom::Visible(head)
        });
        rest = tail;
    }
    atoms
}

/// An open element: its name and the exact opening tag to repeat.
type OpenTag = (String, String);

fn opening_tag_name(tag: &str) -> Option<&str> {
    if tag.starts_with("</") || tag.ends_with("/>") {
        return None;
    }
    tag_name(&tag[1..])
}

fn closing_tag_name(tag: &str) -> Option<&str> {
    tag_name(tag.strip_prefix("</")?)
}

fn tag_name(rest: &str) -> Option<&str> {
    let end = rest
        .find(|ch: char| !ch.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

#[derive(Debug, Clone)]
struct LineBreak {
    text_len: usize,
    visible: usize,
    open: Vec<OpenTag>,
    resume_at: usize,
}

#[derive(Debug, Default)]
struct ChunkBuilder {
    text: String,
    visible: usize,
    open: Vec<OpenTag>,
    line_break: Option<LineBreak>,
}

impl ChunkBuilder {
    fn reopening(open: &[OpenTag]) -> Self {
        Self {
            text: open.iter().map(|(_, tag)| tag.as_str()).collect(),
            open: open.to_vec(),
            ..Self::default()
        }
    }

    fn push_tag(&mut self, tag: &str) {
        self.text.push_str(tag);
        if let Some(name) = closing_tag_name(tag) {
            if let Some(index) = self.open.iter().rposition(|(open, _)| open == name) {
                self.open.remove(index);
            }
        } else if let Some(name) = opening_tag_name(tag) {
            self.open.push((name.to_string(), tag.to_string()));
        }
    }

    fn push_visible(&mut self, atom: &str, index: usize) {
        if atom == "\n" {
            self.line_break = Some(LineBreak {
                text_len: self.text.len(),
                visible: self.visible,
                open: self.open.clone(),
                resume_at: index + 1,
            });
        }
        self.text.push_str(atom);
        self.visible += 1;
    }

    /// Rewinds to the last line break of this chunk, if one follows some
    /// visible text. Returns the atom index to continue from.
    fn rewind_to_line_break(&mut self) -> Option<usize> {
        let line_break = self.line_break.take().filter(|mark| mark.visible > 0)?;
        self.text.truncate(line_break.text_len);
        self.visible = line_break.visible;
        self.open = line_break.open;
        Some(line_break.resume_at)
    }

    fn finish(mut self, chunks: &mut Vec<String>) -> Vec<OpenTag> {
        for (name, _) in self.open.iter().rev() {
            self.text.push_str("</");
            self.text.push_str(name);
            self.text.push('>');
        }
        if self.visible > 0 {
            chunks.push(self.text);
        }
        self.open
    }
}

/// Splits `text` into chunks of at most `max_chars` visible characters,
/// breaking on newlines where possible. A single line longer than the limit
/// is cut hard between characters.
pub fn split_reply_chunks(text: &str, markup: MarkupMode, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if max_chars == 0 {
        return chunks;
    }
    let atoms = atoms(text, markup);
    let mut chunk = ChunkBuilder::default();
    let mut index = 0_usize;
    while let Some(atom) = atoms.get(index).copied() {
        match atom {
            Atom::Tag(tag) => {
                chunk.push_tag(tag);
                index += 1;
            }
            Atom::Visible(visible) if chunk.visible < max_chars => {
                chunk.push_visible(visible, index);
                index += 1;
            }
            Atom::Visible(visible) => {
                if visible == "\n" {
                    index += 1;
                } else if let Some(resume_at) = chunk.rewind_to_line_break() {
                    index = resume_at;
                }
                let open = chunk.finish(&mut chunks);
                chunk = ChunkBuilder::reopening(&open);
            }
        }
    }
    chunk.finish(&mut chunks);
    chunks
}
