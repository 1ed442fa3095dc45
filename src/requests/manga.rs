use serde::{Deserialize, Serialize};

use super::chapter::{chapter_refs, Chapter, ChapterRef};
use super::feed::Title;
use super::query_utils::{null_as_default, Language};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TitleDetailView {
    pub title: Option<Title>,
    pub title_image_url: Option<String>,
    pub overview: Option<String>,
    pub background_image_url: Option<String>,
    pub next_time_stamp: Option<i64>,
    pub viewing_period_description: Option<String>,
    pub non_appearance_info: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub first_chapter_list: Vec<Chapter>,
    #[serde(deserialize_with = "null_as_default")]
    pub last_chapter_list: Vec<Chapter>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_simul_released: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub chapters_descending: bool,
}

impl TitleDetailView {
    /// Portrait image of the title, used as the cover everywhere
    pub fn cover_url(&self) -> Option<&str> {
        self.title.as_ref()?.portrait_image_url.as_deref()
    }
}

/// Canonical title metadata
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MangaDetail {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: String,
    pub banner_url: Option<String>,
    pub synopsis: Option<String>,
    /// Publication schedule or hiatus notice
    pub schedule: Option<String>,
    pub language: Language,
}

/// Maps a title detail payload into metadata and the newest-first chapter list.
///
/// `manga_id` is the id the detail was requested for. It is used when the
/// payload lacks one and as the back reference of every chapter.
pub fn map_detail(view: &TitleDetailView, manga_id: &str) -> (MangaDetail, Vec<ChapterRef>) {
    let title = view.title.clone().unwrap_or_default();

    let id = title
        .title_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| manga_id.to_owned());

    let schedule = view
        .non_appearance_info
        .clone()
        .filter(|info| !info.is_empty())
        .or_else(|| view.viewing_period_description.clone());

    let detail = MangaDetail {
        id: id.clone(),
        title: title.name.unwrap_or_default(),
        author: title.author,
        cover_url: title.portrait_image_url.unwrap_or_default(),
        banner_url: view.title_image_url.clone(),
        synopsis: view.overview.clone(),
        schedule,
        language: title.language.unwrap_or(Language::FALLBACK),
    };

    let chapters = chapter_refs(&view.first_chapter_list, &view.last_chapter_list, &id);

    (detail, chapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn chapter(id: u64, expired: bool) -> Value {
        json!({
            "titleId": 100020,
            "chapterId": id,
            "name": format!("#{id:03}"),
            "subTitle": format!("Chapter {id}"),
            "startTimeStamp": 1_700_000_000 + id as i64,
            "isExpired": expired,
        })
    }

    fn view(value: Value) -> TitleDetailView {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_map_detail() {
        let view = view(json!({
            "title": {
                "titleId": 100020,
                "name": "ONE PIECE",
                "author": "Eiichiro Oda",
                "portraitImageUrl": "https://img/portrait.jpg",
                "language": "ENGLISH"
            },
            "titleImageUrl": "https://img/banner.jpg",
            "overview": "Pirates.",
            "viewingPeriodDescription": "New chapter every Sunday",
            "firstChapterList": [chapter(1, false), chapter(2, true)],
            "lastChapterList": [chapter(3, false), chapter(4, false)]
        }));

        let (detail, chapters) = map_detail(&view, "100020");

        assert_eq!(
            detail,
            MangaDetail {
                id: "100020".to_owned(),
                title: "ONE PIECE".to_owned(),
                author: Some("Eiichiro Oda".to_owned()),
                cover_url: "https://img/portrait.jpg".to_owned(),
                banner_url: Some("https://img/banner.jpg".to_owned()),
                synopsis: Some("Pirates.".to_owned()),
                schedule: Some("New chapter every Sunday".to_owned()),
                language: Language::English,
            }
        );

        let ids: Vec<_> = chapters.iter().map(|c| c.chapter_id.as_str()).collect();
        assert_eq!(ids, ["4", "3", "1"]);
        assert_eq!(chapters[0].number, Some(4.0));
        assert_eq!(chapters[0].sub_title.as_deref(), Some("Chapter 4"));
        assert_eq!(chapters[0].published_at, Some(1_700_000_004));
    }

    #[test]
    fn test_hiatus_notice_takes_precedence() {
        let view = view(json!({
            "title": { "titleId": 1, "name": "On break" },
            "viewingPeriodDescription": "Every Monday",
            "nonAppearanceInfo": "On hiatus until further notice"
        }));

        let (detail, chapters) = map_detail(&view, "1");
        assert_eq!(detail.schedule.as_deref(), Some("On hiatus until further notice"));
        assert!(chapters.is_empty());
    }

    #[test]
    fn test_null_fields_degrade() {
        let view = view(json!({
            "title": { "titleId": 9, "name": null, "portraitImageUrl": null },
            "overview": null,
            "isSimulReleased": null,
            "firstChapterList": [
                { "chapterId": 1, "name": null, "isExpired": null },
                { "chapterId": 2, "name": "#002", "subTitle": null }
            ],
            "lastChapterList": null
        }));

        let (detail, chapters) = map_detail(&view, "9");
        assert_eq!(detail.title, "");
        assert_eq!(detail.cover_url, "");
        assert_eq!(detail.synopsis, None);

        let ids: Vec<_> = chapters.iter().map(|c| c.chapter_id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(chapters[1].name, "");
        assert_eq!(chapters[1].number, None);
        assert_eq!(chapters[0].number, Some(2.0));
    }

    #[test]
    fn test_missing_fields_degrade() {
        let view = view(json!({}));

        let (detail, chapters) = map_detail(&view, "42");
        assert_eq!(detail.id, "42");
        assert_eq!(detail.title, "");
        assert_eq!(detail.cover_url, "");
        assert_eq!(detail.language, Language::English);
        assert!(chapters.is_empty());
        assert_eq!(view.cover_url(), None);
    }
}
