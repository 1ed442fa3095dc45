//! Catalog feeds and their normalization into [`CatalogEntry`] lists.
//!
//! Each upstream list endpoint nests its titles differently. [`Feed`] holds one
//! variant per layout; everything after title extraction is shared.

use serde::{Deserialize, Serialize};

use super::query_utils::{null_as_default, Language, LanguageFilter};

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Name of the curated block taken from the featured view
pub const FEATURED_LIST_NAME: &str = "WEEKLY SHONEN JUMP";

/// Title as it appears in every list view
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Title {
    pub title_id: Option<u64>,
    pub name: Option<String>,
    pub author: Option<String>,
    pub portrait_image_url: Option<String>,
    pub landscape_image_url: Option<String>,
    pub view_count: Option<u64>,
    pub language: Option<Language>,
}

/// Uniform search/discover result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    /// Author
    pub subtitle: Option<String>,
    pub image_url: String,
}

impl CatalogEntry {
    /// `None` when the title has no id or no name
    pub fn from_title(title: Title) -> Option<Self> {
        let id = title.title_id?.to_string();
        let name = title.name.filter(|name| !name.is_empty())?;

        Some(Self {
            id,
            title: name,
            subtitle: title.author,
            image_url: title.portrait_image_url.unwrap_or_default(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedTitleList {
    pub list_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub featured_titles: Vec<Title>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedContent {
    pub title_list: Option<FeaturedTitleList>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedTitlesView {
    #[serde(deserialize_with = "null_as_default")]
    pub contents: Vec<FeaturedContent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TitleRankingView {
    #[serde(deserialize_with = "null_as_default")]
    pub titles: Vec<Title>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatedTitle {
    #[serde(deserialize_with = "null_as_default")]
    pub title: Title,
    pub chapter_id: Option<u64>,
    pub chapter_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatedTitleGroup {
    pub the_title: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub titles: Vec<UpdatedTitle>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateGroup {
    pub group_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub title_groups: Vec<UpdatedTitleGroup>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WebHomeView {
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<UpdateGroup>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AllTitlesGroup {
    pub the_title: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub titles: Vec<Title>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AllTitlesView {
    #[serde(rename = "AllTitlesGroup", deserialize_with = "null_as_default")]
    pub all_titles_group: Vec<AllTitlesGroup>,
}

/// One upstream list payload, tagged by its layout
#[derive(Debug, Clone)]
pub enum Feed {
    Featured(FeaturedTitlesView),
    Ranking(TitleRankingView),
    LatestUpdates(WebHomeView),
    AllTitles(AllTitlesView),
    /// Full catalog narrowed to names or authors containing `query`, ignoring case
    Search { view: AllTitlesView, query: String },
}

impl Feed {
    /// Flattens the payload into titles, in upstream order
    pub fn titles(self) -> Vec<Title> {
        match self {
            Feed::Featured(view) => view
                .contents
                .into_iter()
                .filter_map(|content| content.title_list)
                .find(|list| list.list_name.as_deref() == Some(FEATURED_LIST_NAME))
                .map(|list| list.featured_titles)
                .unwrap_or_default(),
            Feed::Ranking(view) => view.titles,
            Feed::LatestUpdates(view) => view
                .groups
                .into_iter()
                .flat_map(|group| group.title_groups)
                .flat_map(|group| group.titles)
                .map(|updated| updated.title)
                .collect(),
            Feed::AllTitles(view) => flatten_groups(view),
            Feed::Search { view, query } => {
                let query = query.to_lowercase();

                flatten_groups(view)
                    .into_iter()
                    .filter(|title| matches_query(title, &query))
                    .collect()
            }
        }
    }

    /// Visible, valid, unique entries in upstream order
    pub fn normalize(self, filter: &LanguageFilter) -> Vec<CatalogEntry> {
        let mut seen = HashSet::new();

        self.titles()
            .into_iter()
            .filter(|title| filter.allows(title.language))
            .filter_map(CatalogEntry::from_title)
            .filter(|entry| seen.insert(entry.id.clone()))
            .collect()
    }
}

fn flatten_groups(view: AllTitlesView) -> Vec<Title> {
    view.all_titles_group
        .into_iter()
        .flat_map(|group| group.titles)
        .collect()
}

fn matches_query(title: &Title, lowercase_query: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(lowercase_query);

    title.name.as_deref().is_some_and(contains) || title.author.as_deref().is_some_and(contains)
}

/// Home page sections offered to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoverSection {
    Featured,
    Popular,
    LatestUpdates,
}

impl DiscoverSection {
    pub const ALL: [DiscoverSection; 3] = [
        DiscoverSection::Featured,
        DiscoverSection::Popular,
        DiscoverSection::LatestUpdates,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            DiscoverSection::Featured => "featured",
            DiscoverSection::Popular => "popular",
            DiscoverSection::LatestUpdates => "latest_updates",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiscoverSection::Featured => "Featured",
            DiscoverSection::Popular => "Popular",
            DiscoverSection::LatestUpdates => "Latest Updates",
        }
    }
}

impl fmt::Display for DiscoverSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for DiscoverSection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DiscoverSection::ALL
            .into_iter()
            .find(|section| section.id() == s)
            .ok_or_else(|| format!("unknown section: {s}"))
    }
}
