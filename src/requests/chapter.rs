use serde::{Deserialize, Serialize};

use super::query_utils::null_as_default;

/// Chapter entry of a title detail response
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Chapter {
    pub title_id: Option<u64>,
    pub chapter_id: Option<u64>,
    pub name: Option<String>,
    pub sub_title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub start_time_stamp: Option<i64>,
    pub end_time_stamp: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub already_viewed: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_vertical_only: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_expired: bool,
}

impl Chapter {
    /// `#012` is chapter 12; extras like `ex` have no number
    pub fn number(&self) -> Option<f32> {
        self.name.as_deref()?.trim().strip_prefix('#')?.trim().parse().ok()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRef {
    pub chapter_id: String,
    /// Id of the title this chapter belongs to
    pub manga_id: String,
    pub name: String,
    pub sub_title: Option<String>,
    pub number: Option<f32>,
    pub published_at: Option<i64>,
    pub is_expired: bool,
    /// Position in the newest-first list
    pub order: usize,
}

/// Merges the two upstream chapter lists newest-first and drops expired chapters.
///
/// Upstream lists run oldest to newest, `first` before `last`, so the
/// concatenation is reversed. Chapters without an id are skipped.
pub fn chapter_refs(first: &[Chapter], last: &[Chapter], manga_id: &str) -> Vec<ChapterRef> {
    first
        .iter()
        .chain(last.iter())
        .rev()
        .filter(|chapter| !chapter.is_expired)
        .filter_map(|chapter| Some((chapter.chapter_id?, chapter)))
        .enumerate()
        .map(|(order, (chapter_id, chapter))| ChapterRef {
            chapter_id: chapter_id.to_string(),
            manga_id: manga_id.to_owned(),
            name: chapter.name.clone().unwrap_or_default(),
            sub_title: chapter.sub_title.clone(),
            number: chapter.number(),
            published_at: chapter.start_time_stamp,
            is_expired: chapter.is_expired,
            order,
        })
        .collect()
}
