//! Logical line counting for files missing from a coverage dataset

use std::ffi::OsStr;
use std::path::Path;

/// Counts the statements a source file would contribute to a coverage total
pub trait LineCounter {
    fn count_file(&self, path: &Path) -> std::io::Result<u64>;
}

/// Comment syntax used when classifying lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    /// `//` line comments and `/* */` block comments
    CFamily,
    /// `#` line comments
    Hash,
}

impl CommentStyle {
    fn from_extension(ext: Option<&OsStr>) -> Self {
        match ext.and_then(OsStr::to_str) {
            Some("py" | "rb" | "sh" | "pl" | "toml" | "yml" | "yaml") => CommentStyle::Hash,
            _ => CommentStyle::CFamily,
        }
    }
}

/// Counts lines that carry code: blank lines and comments are excluded
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeLineCounter;

impl CodeLineCounter {
    pub fn new() -> Self {
        Self
    }

    pub fn count_content(&self, content: &str, path: &Path) -> u64 {
        let style = CommentStyle::from_extension(path.extension());
        let mut state = Scan::Code;
        let mut count = 0;

        for line in content.lines() {
            if is_code_line(line.trim(), style, &mut state) {
                count += 1;
            }
        }

        count
    }
}

impl LineCounter for CodeLineCounter {
    fn count_file(&self, path: &Path) -> std::io::Result<u64> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.count_content(&content, path))
    }
}

/// Where a line starts: in code, inside a block comment, or inside a
/// string literal left open by a previous line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Block,
    Str,
}

fn is_code_line(trimmed: &str, style: CommentStyle, state: &mut Scan) -> bool {
    match style {
        CommentStyle::Hash => !trimmed.is_empty() && !trimmed.starts_with('#'),
        CommentStyle::CFamily => scan_c_family(trimmed.as_bytes(), state),
    }
}

/// Comment markers only count outside string and char literals
fn scan_c_family(bytes: &[u8], state: &mut Scan) -> bool {
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        match *state {
            Scan::Block => {
                if bytes[i..].starts_with(b"*/") {
                    *state = Scan::Code;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            Scan::Str => {
                has_code = true;
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => {
                        *state = Scan::Code;
                        i += 1;
                    }
                    _ => i += 1,
                }
            }
            Scan::Code => match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'/') => return has_code,
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    *state = Scan::Block;
                    i += 2;
                }
                b'"' => {
                    *state = Scan::Str;
                    has_code = true;
                    i += 1;
                }
                b'\'' => {
                    has_code = true;
                    i += char_literal_len(&bytes[i..]);
                }
                b if b.is_ascii_whitespace() => i += 1,
                _ => {
                    has_code = true;
                    i += 1;
                }
            },
        }
    }

    has_code
}

/// Length of a `'x'` or `'\x'` literal at the start of `bytes`, or 1 for a
/// lone quote such as a lifetime
fn char_literal_len(bytes: &[u8]) -> usize {
    match bytes {
        [b'\'', b'\\', _, rest @ ..] => rest
            .iter()
            .position(|&b| b == b'\'')
            .map_or(1, |close| close + 4),
        [b'\'', _, b'\'', ..] => 3,
        _ => 1,
    }
}
