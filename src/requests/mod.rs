//! Structs and utilities for making requests to the MANGA Plus API

pub mod chapter;
pub mod feed;
pub mod manga;
pub mod query_utils;

use crate::interceptor::{self, CoverLookup};
use crate::rate_limiter::RequestClass;
use crate::MangaPlusClient;
use chapter::ChapterRef;
use feed::{CatalogEntry, DiscoverSection, Feed};
use manga::{map_detail, MangaDetail, TitleDetailView};
use query_utils::{
    AllTitlesQuery, FeaturedQuery, FormatQuery, HomeQuery, MangaPlusResponse, Query,
    SuccessResult, TitleDetailQuery,
};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Custom error type that contains all errors that can be emitted by this crate's functions
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    RequestWithMiddleWareError(#[from] reqwest_middleware::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    /// Error envelope from the server, carrying its message
    #[error("{0}")]
    UpstreamError(String),
    #[error(transparent)]
    QsError(#[from] serde_qs::Error),
    #[error(transparent)]
    HeaderError(#[from] http::header::InvalidHeaderValue),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Type alias for the [`Result`](std::result::Result) that is used in the crate's functions
pub type Result<T> = std::result::Result<T, Error>;

impl MangaPlusClient {
    /// Lowest level function that executes an arbitrary [Query] against an API `endpoint`
    /// and returns the raw body
    #[tracing::instrument(skip(self))]
    pub async fn get_json(&self, endpoint: &str, query: &impl Query) -> Result<Bytes> {
        let query_data = serde_qs::to_string(query)?;
        let url = format!(
            "{}/{endpoint}?{query_data}",
            self.config.api_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .get(url)
            .with_extension(RequestClass::Metadata)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("got {status} from server");
        }

        Ok(resp.bytes().await?)
    }

    /// Executes a query and unwraps the response envelope
    pub async fn get_success(&self, endpoint: &str, query: &impl Query) -> Result<SuccessResult> {
        let body = self.get_json(endpoint, query).await?;

        MangaPlusResponse::from_slice(&body)?.into_success()
    }

    /// Titles of the weekly curated list
    #[tracing::instrument(skip(self))]
    pub async fn featured_titles(&self) -> Result<Vec<CatalogEntry>> {
        let success = self
            .get_success("featuredV2", &FeaturedQuery::builder().build())
            .await?;

        let feed = Feed::Featured(success.featured_titles_view_v2.unwrap_or_default());

        Ok(feed.normalize(&self.settings.language_filter()))
    }

    /// Ranking list, used as the popular section
    #[tracing::instrument(skip(self))]
    pub async fn popular_titles(&self) -> Result<Vec<CatalogEntry>> {
        let success = self
            .get_success("title_list/ranking", &FormatQuery::default())
            .await?;

        let feed = Feed::Ranking(success.title_ranking_view.unwrap_or_default());

        Ok(feed.normalize(&self.settings.language_filter()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn latest_updates(&self) -> Result<Vec<CatalogEntry>> {
        let success = self
            .get_success("web/web_homeV4", &HomeQuery::builder().build())
            .await?;

        let feed = Feed::LatestUpdates(success.web_home_view_v4.unwrap_or_default());

        Ok(feed.normalize(&self.settings.language_filter()))
    }

    /// Every title of the catalog
    #[tracing::instrument(skip(self))]
    pub async fn all_titles(&self) -> Result<Vec<CatalogEntry>> {
        let success = self
            .get_success("title_list/allV2", &AllTitlesQuery::default())
            .await?;

        let feed = Feed::AllTitles(success.all_titles_view_v2.unwrap_or_default());

        Ok(feed.normalize(&self.settings.language_filter()))
    }

    /// Searches the catalog for titles whose name or author contains `text`.
    /// Empty `text` returns the whole catalog.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, text: &str) -> Result<Vec<CatalogEntry>> {
        let success = self
            .get_success("title_list/allV2", &AllTitlesQuery::search(text))
            .await?;

        let feed = Feed::Search {
            view: success.all_titles_view_v2.unwrap_or_default(),
            query: text.to_owned(),
        };

        Ok(feed.normalize(&self.settings.language_filter()))
    }

    pub async fn discover(&self, section: DiscoverSection) -> Result<Vec<CatalogEntry>> {
        match section {
            DiscoverSection::Featured => self.featured_titles().await,
            DiscoverSection::Popular => self.popular_titles().await,
            DiscoverSection::LatestUpdates => self.latest_updates().await,
        }
    }

    /// Raw title detail view of the title with the given `title_id`
    #[tracing::instrument(skip(self))]
    pub async fn title_detail(&self, title_id: &str) -> Result<TitleDetailView> {
        let query = TitleDetailQuery::builder().title_id(title_id).build();
        let success = self.get_success("title_detailV3", &query).await?;

        Ok(success.title_detail_view.unwrap_or_default())
    }

    /// Metadata and newest-first, non-expired chapters of the title with the given `title_id`
    pub async fn manga_details(&self, title_id: &str) -> Result<(MangaDetail, Vec<ChapterRef>)> {
        let view = self.title_detail(title_id).await?;

        Ok(map_detail(&view, title_id))
    }

    pub async fn chapters(&self, title_id: &str) -> Result<Vec<ChapterRef>> {
        Ok(self.manga_details(title_id).await?.1)
    }

    /// Downloads an image, resolving a cover placeholder first
    #[tracing::instrument(skip(self))]
    pub async fn download_image(&self, url: &str) -> Result<Bytes> {
        let url = interceptor::resolve_url(url, self).await?;

        let resp = self
            .client
            .get(url)
            .with_extension(RequestClass::Image)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl CoverLookup for MangaPlusClient {
    async fn cover_url(&self, title_id: &str) -> Result<Option<String>> {
        let view = self.title_detail(title_id).await?;

        Ok(view.cover_url().map(str::to_owned))
    }
}
