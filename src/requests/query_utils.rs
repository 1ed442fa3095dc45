use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};

use super::feed::{AllTitlesView, FeaturedTitlesView, TitleRankingView, WebHomeView};
use super::manga::TitleDetailView;
use super::{Error, Result};
use crate::config::ImageQuality;
use crate::viewer::MangaViewer;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_ERROR: &str = "Unknown error";

pub trait Query: Serialize + std::fmt::Debug {}

/// Reads an explicit `null` the same way as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Yes,
    No,
}

impl From<bool> for Split {
    fn from(split: bool) -> Self {
        if split {
            Split::Yes
        } else {
            Split::No
        }
    }
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct FormatQuery {
    pub format: ResponseFormat,
}
impl Query for FormatQuery {}

#[derive(Serialize, Debug, Clone, Builder)]
pub struct FeaturedQuery {
    #[builder(into, default = "eng".to_owned())]
    pub lang: String,
    #[builder(into, default = "eng".to_owned())]
    pub clang: String,
    #[builder(default)]
    pub format: ResponseFormat,
}
impl Query for FeaturedQuery {}

#[derive(Serialize, Debug, Clone, Builder)]
pub struct HomeQuery {
    #[builder(into, default = "eng".to_owned())]
    pub lang: String,
    #[builder(default)]
    pub format: ResponseFormat,
}
impl Query for HomeQuery {}

#[derive(Serialize, Debug, Clone, Default, Builder)]
pub struct AllTitlesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub filter: Option<String>,
    #[builder(default)]
    pub format: ResponseFormat,
}
impl Query for AllTitlesQuery {}

impl AllTitlesQuery {
    /// Empty search text sends no `filter` at all
    pub fn search(text: &str) -> Self {
        Self {
            filter: (!text.is_empty()).then(|| text.to_owned()),
            format: ResponseFormat::Json,
        }
    }
}

#[derive(Serialize, Debug, Clone, Builder)]
pub struct TitleDetailQuery {
    #[builder(into)]
    pub title_id: String,
    #[builder(default)]
    pub format: ResponseFormat,
}
impl Query for TitleDetailQuery {}

#[derive(Serialize, Debug, Clone, Builder)]
pub struct ViewerQuery {
    #[builder(into)]
    pub chapter_id: String,
    #[builder(into)]
    pub split: Split,
    pub img_quality: ImageQuality,
    #[builder(default)]
    pub format: ResponseFormat,
}
impl Query for ViewerQuery {}

/// Language tag carried by titles and error popups
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, std::hash::Hash, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    English,
    Spanish,
    French,
    Indonesian,
    PortugueseBr,
    Russian,
    Thai,
    German,
    Vietnamese,
    #[serde(other)]
    Unknown,
}

impl Language {
    /// Assumed for items that carry no language tag
    pub const FALLBACK: Language = Language::English;

    pub const ALL: [Language; 9] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::Indonesian,
        Language::PortugueseBr,
        Language::Russian,
        Language::Thai,
        Language::German,
        Language::Vietnamese,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Español",
            Language::French => "Français",
            Language::Indonesian => "Bahasa Indonesia",
            Language::PortugueseBr => "Português (Brasil)",
            Language::Russian => "Русский",
            Language::Thai => "ไทย",
            Language::German => "Deutsch",
            Language::Vietnamese => "Tiếng Việt",
            Language::Unknown => "Unknown",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::Indonesian => "id",
            Language::PortugueseBr => "pt-br",
            Language::Russian => "ru",
            Language::Thai => "th",
            Language::German => "de",
            Language::Vietnamese => "vi",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts the short code (`pt-br`) or the wire name (`PORTUGUESE_BR`), case-insensitively
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Language::ALL
            .into_iter()
            .find(|language| {
                language.code().eq_ignore_ascii_case(s)
                    || serde_json::to_value(language)
                        .ok()
                        .and_then(|value| value.as_str().map(|name| name.eq_ignore_ascii_case(s)))
                        .unwrap_or(false)
            })
            .ok_or_else(|| format!("unknown language: {s}"))
    }
}

/// Set of languages the user wants to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFilter {
    enabled: HashSet<Language>,
}

impl LanguageFilter {
    pub fn new(enabled: impl IntoIterator<Item = Language>) -> Self {
        Self {
            enabled: enabled.into_iter().collect(),
        }
    }

    /// Untagged items count as [`Language::FALLBACK`]
    pub fn allows(&self, language: Option<Language>) -> bool {
        self.enabled.contains(&language.unwrap_or(Language::FALLBACK))
    }

    pub fn enabled(&self) -> &HashSet<Language> {
        &self.enabled
    }
}

impl Default for LanguageFilter {
    fn default() -> Self {
        Self::new([Language::FALLBACK])
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Popup {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub language: Option<Language>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorResult {
    pub action: Option<String>,
    pub english_popup: Option<Popup>,
    #[serde(deserialize_with = "null_as_default")]
    pub popups: Vec<Popup>,
}

impl ErrorResult {
    pub fn popup(&self, language: Language) -> Option<&Popup> {
        let tagged = || {
            self.popups
                .iter()
                .find(|popup| popup.language == Some(language))
        };

        if language == Language::English {
            self.english_popup.as_ref().or_else(tagged)
        } else {
            tagged()
        }
    }

    pub fn message(&self, language: Language) -> String {
        self.popup(language)
            .and_then(|popup| popup.body.clone())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_owned())
    }
}

/// Payload of a successful response. Only the view matching the endpoint is present.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SuccessResult {
    pub featured_titles_view_v2: Option<FeaturedTitlesView>,
    pub title_ranking_view: Option<TitleRankingView>,
    pub web_home_view_v4: Option<WebHomeView>,
    pub all_titles_view_v2: Option<AllTitlesView>,
    pub title_detail_view: Option<TitleDetailView>,
    pub manga_viewer: Option<MangaViewer>,
}

/// Top level envelope of every JSON response. A missing `success` is the only error signal.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct MangaPlusResponse {
    pub success: Option<SuccessResult>,
    pub error: Option<ErrorResult>,
}

impl MangaPlusResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn into_success(self) -> Result<SuccessResult> {
        match self.success {
            Some(success) => Ok(success),
            None => {
                let message = self
                    .error
                    .map(|error| error.message(Language::English))
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_owned());

                tracing::warn!("upstream returned an error: {message}");

                Err(Error::UpstreamError(message))
            }
        }
    }
}
