//! Editable text of the input control

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Draft text plus a cursor counted in characters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    content: String,
    cursor: usize,
}

impl Draft {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let cursor = content.chars().count();
        Self { content, cursor }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Replace the whole text and move the cursor to the end
    pub fn set(&mut self, content: impl Into<String>) {
        *self = Self::new(content);
    }

    /// Take the text out, leaving the draft empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    /// Insert text at the cursor. `\r\n` and lone `\r` become `\n`.
    pub fn insert_str(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let at = self.byte_index(self.cursor);
        self.content.insert_str(at, &text);
        self.cursor += text.chars().count();
    }

    /// Apply an editing key. Returns whether the text or cursor changed.
    ///
    /// Enter is only handled here when it asks for a literal newline;
    /// a plain Enter is a submit gesture and belongs to the controller.
    pub fn apply_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER) {
            return false;
        }

        match key.code {
            KeyCode::Enter if is_newline_gesture(&key) => {
                self.insert_char('\n');
                true
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_to(self.cursor.saturating_sub(1)),
            KeyCode::Right => self.move_to(self.cursor + 1),
            KeyCode::Home => self.move_to(0),
            KeyCode::End => self.move_to(usize::MAX),
            _ => false,
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.content.chars().count() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    fn move_to(&mut self, position: usize) -> bool {
        let clamped = position.min(self.content.chars().count());
        let moved = clamped != self.cursor;
        self.cursor = clamped;
        moved
    }
}

/// Enter with Shift or Alt inserts a newline instead of submitting
pub fn is_newline_gesture(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter && key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
}

/// Plain Enter submits the draft
pub fn is_submit_gesture(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
        && key.kind != KeyEventKind::Release
        && !is_newline_gesture(key)
        && !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER)
}
