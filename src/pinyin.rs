//! Hanzi → Hanyu Pinyin (tone diacritics) for candidate labels.
//!
//! Example:
//!   输入: '天'
//!   输出: Some("tiān")
use pinyin::ToPinyin;

/// Pinyin with tone marks for a single character, `None` for non-Hanzi.
///
/// This is per-character (no word segmentation), so polyphonic characters
/// use the library's default reading.
pub fn char_pinyin(ch: char) -> Option<String> {
    ch.to_pinyin().map(|py| py.with_tone().to_string())
}
