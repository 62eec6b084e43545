use serde::{Serialize, Deserialize};

/// Token representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,      // Normalized token text
    pub position: u32,     // Word position in the source text
    pub offset: usize,     // Byte offset in original text
    pub length: usize,     // Byte length of the original word
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize, length: usize) -> Self {
        Token {
            text,
            position,
            offset,
            length,
        }
    }

    /// Slice of the source text this token was produced from
    pub fn source<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.offset..self.offset + self.length).unwrap_or("")
    }
}
