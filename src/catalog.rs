//! Level catalog: parse a chapter's level table and serve definitions by id.
//!
//! Table layout (header row required, columns matched by name):
//!   id, wenzitext, errortext, clicktimes, tips1, tips2
//!
//! `wenzitext` is the target phrase, `errortext` the distractor count and
//! `clicktimes` the number of tolerated wrong selections. A bad row is skipped
//! on its own; it never aborts the rest of the chapter.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::LevelDefinition;
use crate::error::{GameError, GameResult};
use crate::util::{normalize_chars, trunc_for_log};

#[derive(Clone, Debug, Default)]
pub struct LevelCatalog {
  levels: BTreeMap<u32, LevelDefinition>,
}

impl LevelCatalog {
  /// Parse CSV text. Malformed rows are logged and skipped.
  pub fn parse(csv_text: &str) -> Self {
    let mut lines = csv_text.lines().enumerate();
    let Some((_, header_line)) = lines.find(|(_, l)| !l.trim().is_empty()) else {
      warn!(target: "catalog", "Level table is empty");
      return Self::default();
    };
    let headers: Vec<&str> = header_line.trim_start_matches('\u{FEFF}').split(',').map(str::trim).collect();

    let mut levels = BTreeMap::new();
    for (idx, raw) in lines {
      let line_no = idx + 1;
      if raw.trim().is_empty() {
        continue;
      }
      match parse_row(&headers, raw, line_no) {
        Ok(def) => {
          if levels.contains_key(&def.id) {
            warn!(target: "catalog", line = line_no, id = def.id, "Duplicate level id; later row wins");
          }
          levels.insert(def.id, def);
        }
        Err(e) => {
          warn!(target: "catalog", error = %e, row = %trunc_for_log(raw, 40), "Skipping level row");
        }
      }
    }
    debug!(target: "catalog", count = levels.len(), "Parsed level table");
    Self { levels }
  }

  /// Read `<dir>/<chapter_id>.csv`. Any IO failure degrades to an empty catalog.
  #[instrument(level = "info", skip(dir), fields(dir = %dir.display()))]
  pub async fn load(dir: &Path, chapter_id: &str) -> Self {
    let path = dir.join(format!("{chapter_id}.csv"));
    match tokio::fs::read_to_string(&path).await {
      Ok(text) => {
        let catalog = Self::parse(&text);
        info!(target: "catalog", chapter = chapter_id, levels = catalog.len(), "Loaded level table");
        catalog
      }
      Err(e) => {
        error!(target: "catalog", chapter = chapter_id, path = %path.display(), error = %e, "Failed to read level table; chapter has no levels");
        Self::default()
      }
    }
  }

  pub fn get(&self, level_id: u32) -> Option<&LevelDefinition> {
    self.levels.get(&level_id)
  }

  /// Level ids in ascending order.
  pub fn level_ids(&self) -> impl Iterator<Item = u32> + '_ {
    self.levels.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.levels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.levels.is_empty()
  }
}

fn parse_row(headers: &[&str], raw: &str, line: usize) -> GameResult<LevelDefinition> {
  let malformed = |reason: String| GameError::MalformedDefinition { line, reason };

  let values: Vec<&str> = raw.split(',').map(str::trim).collect();
  if values.len() != headers.len() {
    return Err(malformed(format!("expected {} columns, found {}", headers.len(), values.len())));
  }
  let field = |name: &str| headers.iter().position(|h| *h == name).map(|i| values[i]);
  let number = |name: &str| -> GameResult<u64> {
    let v = field(name).ok_or_else(|| malformed(format!("missing column '{name}'")))?;
    v.parse::<u64>().map_err(|_| malformed(format!("'{name}' is not a number: '{v}'")))
  };

  let id = u32::try_from(number("id")?).map_err(|_| malformed("id too large".into()))?;
  if id == 0 {
    return Err(malformed("id must be positive".into()));
  }
  let target = normalize_chars(field("wenzitext").ok_or_else(|| malformed("missing column 'wenzitext'".into()))?);
  if target.is_empty() {
    return Err(malformed("target phrase is empty".into()));
  }
  let distractor_count = usize::try_from(number("errortext")?).map_err(|_| malformed("errortext too large".into()))?;
  let max_mistakes = u32::try_from(number("clicktimes")?).map_err(|_| malformed("clicktimes too large".into()))?;
  if max_mistakes == 0 {
    return Err(malformed("clicktimes must be positive".into()));
  }

  Ok(LevelDefinition {
    id,
    target,
    distractor_count,
    max_mistakes,
    hint_primary: field("tips1").unwrap_or_default().to_string(),
    hint_secondary: field("tips2").unwrap_or_default().to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::SAMPLE_CHAPTER_CSV;

  #[test]
  fn parses_sample_chapter() {
    let cat = LevelCatalog::parse(SAMPLE_CHAPTER_CSV);
    assert_eq!(cat.len(), 3);
    let l1 = cat.get(1).expect("level 1");
    assert_eq!(l1.target, vec!['天', '地']);
    assert_eq!(l1.distractor_count, 2);
    assert_eq!(l1.max_mistakes, 3);
    assert_eq!(l1.hint_primary, "千字文开篇");
    assert_eq!(l1.hint_secondary, "天玄地黄");
    assert_eq!(cat.level_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
  }

  #[test]
  fn malformed_rows_are_skipped_individually() {
    let csv = "id,wenzitext,errortext,clicktimes,tips1,tips2
1,天地,2,3,a,b
x,日月,2,3,a,b
3,山水,two,3,a,b
4,风雨,2,3,a
5, \u{200B} ,2,3,a,b
6,江河,2,0,a,b

7,草木,1,2,,
";
    let cat = LevelCatalog::parse(csv);
    assert_eq!(cat.level_ids().collect::<Vec<_>>(), vec![1, 7]);
    assert_eq!(cat.get(7).map(|l| l.hint_primary.as_str()), Some(""));
  }

  #[test]
  fn target_is_normalized() {
    let csv = "id,wenzitext,errortext,clicktimes,tips1,tips2\n1,天 \u{200B}地,0,1,,\n";
    let cat = LevelCatalog::parse(csv);
    assert_eq!(cat.get(1).map(|l| l.target_text()), Some("天地".to_string()));
  }

  #[test]
  fn columns_are_matched_by_header_name() {
    let csv = "clicktimes,id,tips2,tips1,errortext,wenzitext\n2,9,second,first,5,日月\n";
    let cat = LevelCatalog::parse(csv);
    let l = cat.get(9).expect("level 9");
    assert_eq!(l.max_mistakes, 2);
    assert_eq!(l.distractor_count, 5);
    assert_eq!(l.hint_primary, "first");
    assert_eq!(l.hint_secondary, "second");
  }

  #[test]
  fn empty_text_gives_empty_catalog() {
    assert!(LevelCatalog::parse("").is_empty());
    assert!(LevelCatalog::parse("id,wenzitext,errortext,clicktimes,tips1,tips2\n").is_empty());
  }

  #[tokio::test]
  async fn missing_file_degrades_to_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cat = LevelCatalog::load(dir.path(), "nowhere").await;
    assert!(cat.is_empty());
  }

  #[tokio::test]
  async fn loads_from_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("han.csv"), SAMPLE_CHAPTER_CSV).expect("write");
    let cat = LevelCatalog::load(dir.path(), "han").await;
    assert_eq!(cat.len(), 3);
  }
}
