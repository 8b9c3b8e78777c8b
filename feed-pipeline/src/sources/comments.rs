use crate::utils::text;

pub const MAX_COMMENTS: usize = 50;
pub const MAX_DISCUSSION_CHARS: usize = 15_000;

/// Accumulates a comment thread into the plain text handed to the summarizer.
#[derive(Debug, Default)]
pub struct CommentDigest {
    text: String,
    comments: usize,
    chars: usize,
}

impl CommentDigest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one comment given as HTML or plain text. Returns false once the
    /// digest is full; later comments are dropped.
    pub fn push(&mut self, author: Option<&str>, body: &str) -> bool {
        if self.is_full() {
            return false;
        }
        let body = text::strip_html(body);
        if body.is_empty() {
            return true;
        }

        let line = format!("{}: {}\n", author.unwrap_or("anonymous"), body);
        let line_chars = line.chars().count();
        if self.chars + line_chars > MAX_DISCUSSION_CHARS {
            self.comments = MAX_COMMENTS;
            return false;
        }

        self.text.push_str(&line);
        self.chars += line_chars;
        self.comments += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.comments >= MAX_COMMENTS
    }

    pub fn len(&self) -> usize {
        self.comments
    }

    pub fn is_empty(&self) -> bool {
        self.comments == 0
    }

    pub fn finish(self) -> String {
        self.text.trim_end().to_string()
    }
}
