//! Chapter viewer: page references and page downloads.
//!
//! A page reference is the image URL followed by `#` and the hex key the image
//! is encrypted with. Pages the viewer returns without a key become empty
//! placeholders so page indices keep lining up with upstream.

use crate::interceptor::EncryptionKey;
use crate::rate_limiter::RequestClass;
use crate::requests::query_utils::{null_as_default, MangaPlusResponse, ViewerQuery};
use crate::requests::Result;
use crate::MangaPlusClient;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt as _, TryStreamExt as _};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MangaPage {
    pub image_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "type")]
    pub page_type: Option<String>,
    pub encryption_key: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerPage {
    pub manga_page: Option<MangaPage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MangaViewer {
    #[serde(deserialize_with = "null_as_default")]
    pub pages: Vec<ViewerPage>,
    pub chapter_id: Option<u64>,
    pub chapter_name: Option<String>,
    pub title_name: Option<String>,
}

impl MangaViewer {
    /// Entries without a manga page (banners, end cards) are dropped.
    ///
    /// NOTE: a page without an encryption key yields a placeholder, not its
    /// plain URL. So does a page without an image URL.
    pub fn page_refs(&self) -> Vec<PageRef> {
        self.pages
            .iter()
            .filter_map(|page| page.manga_page.as_ref())
            .map(|page| {
                let url = page.image_url.as_deref().filter(|url| !url.is_empty());
                let key = page.encryption_key.as_deref().filter(|key| !key.is_empty());

                match (url, key) {
                    (Some(url), Some(key)) => PageRef::encrypted(url, key),
                    _ => PageRef::placeholder(),
                }
            })
            .collect()
    }
}

/// Maps a viewer response into page references, failing on an error envelope
pub fn map_pages(response: MangaPlusResponse) -> Result<Vec<PageRef>> {
    let success = response.into_success()?;

    Ok(success
        .manga_viewer
        .map(|viewer| viewer.page_refs())
        .unwrap_or_default())
}

/// `imageUrl#encryptionKey`, or an empty placeholder
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct PageRef(String);

impl PageRef {
    pub fn encrypted(image_url: &str, key: &str) -> Self {
        Self(format!("{image_url}#{key}"))
    }

    pub fn placeholder() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty()
    }

    /// URL part, without the key
    pub fn image_url(&self) -> &str {
        match self.0.rsplit_once('#') {
            Some((url, _)) => url,
            None => &self.0,
        }
    }

    pub fn encryption_key(&self) -> Option<&str> {
        self.0.rsplit_once('#').map(|(_, key)| key)
    }
}

impl From<String> for PageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for PageRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn page_file_name(index: usize) -> String {
    format!("{index:03}.jpg")
}

impl MangaPlusClient {
    /// Queries the viewer for the pages of the chapter with the given `chapter_id`,
    /// using the split and quality preferences from the settings store
    #[tracing::instrument(skip(self))]
    pub async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<PageRef>> {
        let query = ViewerQuery::builder()
            .chapter_id(chapter_id)
            .split(self.settings.split_images())
            .img_quality(self.settings.image_quality())
            .build();

        let body = self.get_json("manga_viewer", &query).await?;

        map_pages(MangaPlusResponse::from_slice(&body)?)
    }

    /// Downloads and decrypts a single page. Placeholders fail in the transport layer.
    #[tracing::instrument(skip(self, page), fields(url = %page.image_url()))]
    pub async fn download_page(&self, page: &PageRef) -> Result<Bytes> {
        let mut request = self
            .client
            .get(page.image_url())
            .with_extension(RequestClass::Image);

        if let Some(key) = page.encryption_key() {
            request = request.with_extension(EncryptionKey::new(key));
        }

        let resp = request.send().await?.error_for_status()?;

        Ok(resp.bytes().await?)
    }

    /// Downloads `pages` with at most `max_concurrent` requests in flight.
    /// Yields `(index, bytes)` in page order and skips placeholders.
    pub fn page_stream(
        &self,
        pages: Vec<PageRef>,
        max_concurrent: usize,
    ) -> impl Stream<Item = Result<(usize, Bytes)>> + '_ {
        let max_concurrent = max_concurrent.max(1);

        async_stream::try_stream! {
            let mut downloads = stream::iter(
                pages
                    .into_iter()
                    .enumerate()
                    .filter(|(_, page)| !page.is_placeholder()),
            )
            .map(|(index, page)| async move {
                self.download_page(&page).await.map(|bytes| (index, bytes))
            })
            .buffered(max_concurrent);

            while let Some(page) = downloads.next().await {
                let (index, bytes) = page?;
                tracing::trace!("page {index} downloaded, {} bytes", bytes.len());

                yield (index, bytes);
            }
        }
    }

    /// Downloads every page of the chapter with the given `chapter_id` into
    /// `dir/{chapter_id}` and returns that directory
    #[tracing::instrument(skip(self, dir))]
    pub async fn download_chapter(
        &self,
        chapter_id: &str,
        dir: impl AsRef<Path>,
        max_concurrent: usize,
    ) -> Result<PathBuf> {
        let pages = self.chapter_pages(chapter_id).await?;
        let chapter_dir = dir.as_ref().join(chapter_id);

        self.save_pages(pages, &chapter_dir, max_concurrent, |_| ()).await?;

        Ok(chapter_dir)
    }

    /// Downloads `pages` into `dir` as `NNN.jpg`, creating `dir` first.
    /// `on_saved` is called with the page index after each file is written.
    #[tracing::instrument(skip(self, pages, on_saved))]
    pub async fn save_pages(
        &self,
        pages: Vec<PageRef>,
        dir: &Path,
        max_concurrent: usize,
        mut on_saved: impl FnMut(usize),
    ) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let skipped = pages.iter().filter(|page| page.is_placeholder()).count();
        if skipped > 0 {
            tracing::warn!(
                "{skipped} of {} pages have no encryption key and were skipped",
                pages.len()
            );
        }

        let downloads = self.page_stream(pages, max_concurrent);
        tokio::pin!(downloads);

        while let Some((index, bytes)) = downloads.try_next().await? {
            tokio::fs::write(dir.join(page_file_name(index)), &bytes).await?;
            on_saved(index);
        }

        Ok(())
    }
}
