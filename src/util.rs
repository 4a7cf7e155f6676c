//! Small utility helpers used across modules.

/// Zero-width code points that sneak into spreadsheet exports.
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// True for characters that never belong to a target phrase or corpus.
pub fn is_blank(ch: char) -> bool {
  ch.is_whitespace() || ZERO_WIDTH.contains(&ch)
}

/// Split a phrase into characters, dropping whitespace and zero-width characters.
pub fn normalize_chars(s: &str) -> Vec<char> {
  s.chars().filter(|c| !is_blank(*c)).collect()
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let count = s.chars().count();
  if count <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, count)
  }
}
