// src/core/reader.rs

/// A single-pass character cursor over a template string.
///
/// Positions are char indices, so error offsets line up with what a user sees
/// regardless of multi-byte characters.
#[derive(Debug, Clone)]
pub struct StringReader {
    chars: Vec<char>,
    index: usize,
}

impl StringReader {
    /// Creates a reader positioned before the first character.
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
        }
    }

    /// Returns `true` if there is at least one character left.
    pub fn has_next(&self) -> bool {
        self.index < self.chars.len()
    }

    /// Returns the current character and advances past it.
    pub fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.index).copied();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    /// Returns the current character without advancing.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// Returns the character after the current one without advancing.
    pub fn peek_second(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    /// The 0-based index of the most recently consumed character, `-1` before any.
    pub fn pos(&self) -> isize {
        isize::try_from(self.index).map_or(isize::MAX, |i| i - 1)
    }

    /// The index of the next character to be consumed.
    pub fn next_pos(&self) -> usize {
        self.index
    }
}
