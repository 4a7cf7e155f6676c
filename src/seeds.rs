//! Seed data: the built-in chapter order and legacy chapter id aliases.

use std::collections::HashMap;

use crate::domain::ChapterInfo;

/// Dynasty chapters in play order. Used when the config does not list chapters.
const DYNASTY_ORDER: [(&str, &str); 8] = [
  ("xianqin", "先秦"),
  ("han", "汉"),
  ("sanguo", "魏晋"),
  ("tang", "唐"),
  ("song", "宋"),
  ("yuan", "元"),
  ("ming", "明"),
  ("qing", "清"),
];

pub fn default_chapters() -> Vec<ChapterInfo> {
  DYNASTY_ORDER
    .iter()
    .map(|(id, name)| ChapterInfo { id: (*id).into(), name: (*name).into() })
    .collect()
}

/// Old save files stored the Wei-Jin chapter under "weijin".
pub fn default_legacy_aliases() -> HashMap<String, String> {
  HashMap::from([("weijin".to_string(), "sanguo".to_string())])
}

/// Small sample chapter for tests and demos (same column layout as the CSV files).
#[cfg(test)]
pub const SAMPLE_CHAPTER_CSV: &str = "id,wenzitext,errortext,clicktimes,tips1,tips2
1,天地,2,3,千字文开篇,天玄地黄
2,关关雎鸠,4,3,诗经首篇,在河之洲
3,学而时习之,6,2,论语,不亦说乎
";

#[cfg(test)]
pub const SAMPLE_CORPUS: &str = "的一是了我不人在他有这个上们来到时大地为子中你说生国年着就那和要她出也得里后自以会家可下而过天去能对小多然于心学么之都好看起发当没成只如事把还用第样道想作种开美总从无情己面最女但现前些所同日手又行意动方期它头经长儿回位分爱老因很给名法间斯知世什两次使身者被高已亲其进此话常与活正感";
