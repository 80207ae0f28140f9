use std::ops::Range;

/// Authoring surface for one block's source. Every edit reports the whole
/// new text to `on_change`; nothing is validated while editing.
pub struct Editor<F: FnMut(&str)> {
    text: String,
    on_change: F,
}

impl<F: FnMut(&str)> Editor<F> {
    pub fn new(text: impl Into<String>, on_change: F) -> Self {
        Editor {
            text: text.into(),
            on_change,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn replace_all(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.changed();
    }

    /// Insert `text` before the character at index `at`. Indexes past the
    /// end append.
    pub fn insert(&mut self, at: usize, text: &str) {
        let offset = self.byte_offset(at);
        self.text.insert_str(offset, text);
        self.changed();
    }

    /// Remove the characters in `range`, clamped to the text.
    pub fn delete(&mut self, range: Range<usize>) {
        let start = self.byte_offset(range.start);
        let end = self.byte_offset(range.end.max(range.start));
        self.text.replace_range(start..end, "");
        self.changed();
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(offset, _)| offset)
    }

    fn changed(&mut self) {
        (self.on_change)(&self.text);
    }
}

impl<F: FnMut(&str)> std::fmt::Debug for Editor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor").field("text", &self.text).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_edit_reports_the_full_text() {
        let mut seen = Vec::new();
        let mut editor = Editor::new("() => 1", |text: &str| seen.push(text.to_string()));
        editor.insert(6, "(");
        editor.insert(100, ")");
        editor.delete(6..7);
        editor.replace_all("");
        drop(editor);
        assert_eq!(seen, vec!["() => (1", "() => (1)", "() => 1)", ""]);
    }

    #[test]
    fn offsets_count_characters() {
        let mut editor = Editor::new("é1", |_: &str| {});
        editor.insert(1, "ü");
        assert_eq!(editor.text(), "éü1");
        editor.delete(0..2);
        assert_eq!(editor.text(), "1");
        editor.delete(5..2);
        assert_eq!(editor.text(), "1");
    }
}
