//! Hooks run around every request the client sends.
//!
//! Outgoing requests get the `Referer` and `User-Agent` the API expects.
//! Incoming image bodies are XOR-decrypted with the key that was attached to
//! the request, either as an [`EncryptionKey`] extension or as a `#key` URL
//! fragment.

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use http::{Extensions, HeaderMap, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};

use crate::cipher;
use crate::config::ClientConfig;
use crate::requests::Result;

/// Stand-in URL for a cover that is only known by its title id
pub const COVER_PLACEHOLDER_PREFIX: &str = "imageMangaId=";

/// Thumbnails served from this endpoint are never encrypted
pub const THUMBNAIL_LIST_MARKER: &str = "title_thumbnail_portrait_list";

pub const ENCRYPTION_KEY_MARKER: &str = "encryptionKey";

/// Hex key for the body of one page request. Attach with
/// [`with_extension`](reqwest_middleware::RequestBuilder::with_extension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn cover_placeholder(title_id: &str) -> String {
    format!("{COVER_PLACEHOLDER_PREFIX}{title_id}")
}

pub fn placeholder_title_id(url: &str) -> Option<&str> {
    url.strip_prefix(COVER_PLACEHOLDER_PREFIX)
}

/// Source of cover URLs for placeholder resolution
#[async_trait]
pub trait CoverLookup: Send + Sync {
    async fn cover_url(&self, title_id: &str) -> Result<Option<String>>;
}

/// Replaces a cover placeholder with the real cover URL. Other URLs pass through.
/// A title without a cover resolves to an empty URL.
pub async fn resolve_url<L>(url: &str, lookup: &L) -> Result<String>
where
    L: CoverLookup + ?Sized,
{
    let Some(title_id) = placeholder_title_id(url) else {
        return Ok(url.to_owned());
    };

    let cover = lookup.cover_url(title_id).await?.unwrap_or_default();
    tracing::debug!("resolved cover of title {title_id} to {cover:?}");

    Ok(cover)
}

/// Substring after the last `#`, empty when there is none
pub fn key_from_url(url: &str) -> &str {
    url.rsplit_once('#').map(|(_, key)| key).unwrap_or_default()
}

fn is_jpeg(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case("image/jpeg"))
}

/// Whether a response body must go through the cipher
pub fn should_decrypt(url: &str, content_type: Option<&str>, has_key: bool) -> bool {
    let flagged = has_key || url.contains(ENCRYPTION_KEY_MARKER) || is_jpeg(content_type);

    flagged && !url.contains(THUMBNAIL_LIST_MARKER)
}

#[derive(Debug, Clone)]
pub struct Interceptor {
    referer: HeaderValue,
    user_agent: HeaderValue,
}

impl Interceptor {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            referer: HeaderValue::from_str(&config.referer())?,
            user_agent: HeaderValue::from_str(&config.user_agent)?,
        })
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(REFERER, self.referer.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());
    }

    /// Returns the body to hand to the caller. `key` takes precedence over a key in `url`.
    pub fn on_response(
        &self,
        url: &str,
        content_type: Option<&str>,
        key: Option<&EncryptionKey>,
        body: &[u8],
    ) -> Option<Vec<u8>> {
        if !should_decrypt(url, content_type, key.is_some()) {
            return None;
        }

        let key = key.map_or_else(|| key_from_url(url), EncryptionKey::as_str);
        tracing::trace!("decrypting {} bytes with a {} char key", body.len(), key.len());

        Some(cipher::decode(body, key))
    }
}

#[async_trait]
impl Middleware for Interceptor {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.apply_headers(req.headers_mut());

        let url = req.url().to_string();
        let key = extensions.get::<EncryptionKey>().cloned();

        let response = next.run(req, extensions).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        if !should_decrypt(&url, content_type.as_deref(), key.is_some()) {
            return Ok(response);
        }

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let body = self
            .on_response(&url, content_type.as_deref(), key.as_ref(), &body)
            .unwrap_or_else(|| body.to_vec());

        let mut decoded = http::Response::builder()
            .status(status)
            .version(version)
            .body(body)
            .map_err(reqwest_middleware::Error::middleware)?;
        *decoded.headers_mut() = headers;

        Ok(Response::from(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::Error;

    struct StubLookup;

    #[async_trait]
    impl CoverLookup for StubLookup {
        async fn cover_url(&self, title_id: &str) -> Result<Option<String>> {
            match title_id {
                "42" => Ok(Some("https://img/42/portrait.jpg".to_owned())),
                "0" => Err(Error::UpstreamError("Title not found.".to_owned())),
                _ => Ok(None),
            }
        }
    }

    fn interceptor() -> Interceptor {
        Interceptor::new(&ClientConfig::builder().user_agent("tests/1.0").build()).unwrap()
    }

    #[test]
    fn test_headers_are_set_unconditionally() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("other"));
        headers.insert("x-custom", HeaderValue::from_static("kept"));

        interceptor().apply_headers(&mut headers);

        assert_eq!(headers[REFERER], "https://mangaplus.shueisha.co.jp/");
        assert_eq!(headers[USER_AGENT], "tests/1.0");
        assert_eq!(headers["x-custom"], "kept");
    }

    #[tokio::test]
    async fn test_placeholder_resolves_to_cover() {
        let url = cover_placeholder("42");
        assert_eq!(url, "imageMangaId=42");

        let resolved = resolve_url(&url, &StubLookup).await.unwrap();
        assert_eq!(resolved, "https://img/42/portrait.jpg");
    }

    #[tokio::test]
    async fn test_placeholder_without_cover_resolves_to_empty() {
        let resolved = resolve_url("imageMangaId=7", &StubLookup).await.unwrap();
        assert_eq!(resolved, "");
    }

    #[tokio::test]
    async fn test_placeholder_lookup_error_propagates() {
        let err = resolve_url("imageMangaId=0", &StubLookup).await.unwrap_err();
        assert_eq!(err.to_string(), "Title not found.");
    }

    #[tokio::test]
    async fn test_regular_urls_pass_through() {
        let url = "https://img/1.jpg#a1b2";
        assert_eq!(resolve_url(url, &StubLookup).await.unwrap(), url);
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(key_from_url("https://img/1.jpg#a1b2"), "a1b2");
        assert_eq!(key_from_url("https://img/1.jpg#x#a1b2"), "a1b2");
        assert_eq!(key_from_url("https://img/1.jpg"), "");
    }

    #[test]
    fn test_should_decrypt() {
        let jpeg = Some("image/jpeg");

        assert!(should_decrypt("https://img/1.jpg", jpeg, false));
        assert!(should_decrypt("https://img/1.jpg", Some("IMAGE/JPEG; q=1"), false));
        assert!(should_decrypt("https://img/1.jpg", None, true));
        assert!(should_decrypt("https://img/1.jpg?encryptionKey", None, false));

        assert!(!should_decrypt("https://api/title_detailV3", Some("application/json"), false));
        assert!(!should_decrypt("https://img/1.png", Some("image/png"), false));
        assert!(!should_decrypt(
            "https://img/title_thumbnail_portrait_list/1.jpg",
            jpeg,
            false
        ));
        assert!(!should_decrypt(
            "https://img/title_thumbnail_portrait_list/1.jpg#a1b2",
            jpeg,
            true
        ));
    }

    #[test]
    fn test_jpeg_response_is_decrypted_with_url_key() {
        let plain = b"\xff\xd8\xff\xe0 jpeg body".to_vec();
        let encrypted = cipher::decode(&plain, "a1b2");

        let body = interceptor()
            .on_response("https://img/1.jpg#a1b2", Some("image/jpeg"), None, &encrypted)
            .unwrap();

        assert_eq!(body, cipher::decode(&encrypted, "a1b2"));
        assert_eq!(body, plain);
    }

    #[test]
    fn test_extension_key_takes_precedence() {
        let plain = b"page".to_vec();
        let encrypted = cipher::decode(&plain, "0f0f");

        let body = interceptor()
            .on_response(
                "https://img/1.jpg#ffff",
                None,
                Some(&EncryptionKey::new("0f0f")),
                &encrypted,
            )
            .unwrap();

        assert_eq!(body, plain);
    }

    #[test]
    fn test_thumbnail_list_is_left_alone() {
        let body = interceptor().on_response(
            "https://img/title_thumbnail_portrait_list/1.jpg#a1b2",
            Some("image/jpeg"),
            None,
            b"thumb",
        );

        assert_eq!(body, None);
    }

    #[test]
    fn test_json_is_left_alone() {
        let body = interceptor().on_response(
            "https://api/manga_viewer?chapter_id=1",
            Some("application/json"),
            None,
            b"{}",
        );

        assert_eq!(body, None);
    }
}
