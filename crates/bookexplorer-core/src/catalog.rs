//! Remote book catalog (Google Books `volumes` endpoint). Wraps reqwest with a simple API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::book::{Book, NO_DESCRIPTION, UNKNOWN_AUTHOR};
use crate::config::{Config, DEFAULT_CATALOG_URL, DEFAULT_TIMEOUT_SECS};

const USER_AGENT: &str = concat!("bookexplorer/", env!("CARGO_PKG_VERSION"));

/// Anything that can answer a free-text book query.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, query: &str, max_results: u32)
        -> Result<Vec<RemoteVolume>, CatalogError>;
}

/// Response body of `GET volumes`. The API omits `items` entirely when nothing matched.
///
/// Items stay raw here so one malformed volume does not sink the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeItem {
    pub volume_info: RemoteVolume,
}

/// One candidate volume as the catalog describes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVolume {
    pub title: String,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}

impl RemoteVolume {
    /// Normalize into an unsaved [`Book`]: authors joined with ", ", sentinels for gaps.
    pub fn into_book(self) -> Book {
        let author = match self.authors {
            Some(authors) if !authors.is_empty() => authors.join(", "),
            _ => UNKNOWN_AUTHOR.to_string(),
        };
        Book {
            id: None,
            title: self.title,
            author,
            description: self
                .description
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            thumbnail: self
                .image_links
                .and_then(|links| links.thumbnail)
                .unwrap_or_default(),
        }
    }
}

impl From<RemoteVolume> for Book {
    fn from(volume: RemoteVolume) -> Self {
        volume.into_book()
    }
}

/// Decode a `volumes` response body. Items that don't match [`VolumeItem`] are logged and skipped;
/// a body that isn't a volumes response at all is an error.
pub fn parse_volumes(body: &[u8]) -> Result<Vec<RemoteVolume>, CatalogError> {
    let response: VolumesResponse = serde_json::from_slice(body)?;
    let volumes = response
        .items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<VolumeItem>(item) {
            Ok(item) => Some(item.volume_info),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed catalog item");
                None
            }
        })
        .collect();
    Ok(volumes)
}

/// HTTP client for the Google Books API.
#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    inner: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl GoogleBooksClient {
    /// Create from a base URL string. Default: https://www.googleapis.com/books/v1/.
    pub fn from_url(url: &str) -> Result<Self, CatalogError> {
        Self::build(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create from the loaded config (endpoint and timeout).
    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        Self::build(&config.catalog_base_url, config.request_timeout())
    }

    /// Create against the public endpoint.
    pub fn with_defaults() -> Result<Self, CatalogError> {
        Self::from_url(DEFAULT_CATALOG_URL)
    }

    fn build(url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        // `Url::join` drops the last path segment unless the base ends with a slash.
        let mut base_url = Url::parse(url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(CatalogError::Request)?;
        Ok(Self {
            inner,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full request URL for a query, with `q` and `maxResults` set.
    pub fn volumes_url(&self, query: &str, max_results: u32) -> Result<Url, CatalogError> {
        let mut url = self.base_url.join("volumes")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string());
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for GoogleBooksClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<RemoteVolume>, CatalogError> {
        let url = self.volumes_url(query, max_results)?;
        tracing::debug!(%url, "catalog search");

        let response = self.inner.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout(self.timeout)
            } else {
                CatalogError::Request(e)
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        let volumes = parse_volumes(&body)?;
        tracing::debug!(count = volumes.len(), "catalog search done");
        Ok(volumes)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog URL: {0}")]
    ParseUrl(#[from] url::ParseError),
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog answered with HTTP {0}")]
    Status(u16),
    #[error("malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("catalog did not answer within {0:?}")]
    Timeout(Duration),
}

impl Default for GoogleBooksClient {
    fn default() -> Self {
        Self::with_defaults().expect("default catalog URL is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_sentinels() {
        let book = RemoteVolume {
            title: "Dune".into(),
            ..RemoteVolume::default()
        }
        .into_book();
        assert_eq!(book.author, "Unknown");
        assert_eq!(book.description, "No description available");
        assert_eq!(book.thumbnail, "");
        assert_eq!(book.id, None);
    }

    #[test]
    fn authors_are_joined() {
        let book: Book = RemoteVolume {
            title: "Good Omens".into(),
            authors: Some(vec!["A".into(), "B".into()]),
            description: Some("Apocalypse.".into()),
            image_links: Some(ImageLinks {
                thumbnail: Some("http://img/1".into()),
            }),
        }
        .into();
        assert_eq!(book.author, "A, B");
        assert_eq!(book.description, "Apocalypse.");
        assert_eq!(book.thumbnail, "http://img/1");
    }

    #[test]
    fn empty_author_list_is_unknown() {
        let book = RemoteVolume {
            title: "Anon".into(),
            authors: Some(vec![]),
            ..RemoteVolume::default()
        }
        .into_book();
        assert_eq!(book.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn parse_full_response() {
        let body = br#"{
            "kind": "books#volumes",
            "totalItems": 2,
            "items": [
                {"id": "x", "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "imageLinks": {"smallThumbnail": "s", "thumbnail": "t"}
                }},
                {"id": "y", "volumeInfo": {"title": "Dune Messiah", "description": "Sequel."}}
            ]
        }"#;
        let volumes = parse_volumes(body).unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].authors.as_deref(), Some(&["Frank Herbert".to_string()][..]));
        assert_eq!(
            volumes[0].image_links.as_ref().and_then(|l| l.thumbnail.as_deref()),
            Some("t")
        );
        assert_eq!(volumes[1].description.as_deref(), Some("Sequel."));
    }

    #[test]
    fn parse_response_without_items() {
        let body = br#"{"kind": "books#volumes", "totalItems": 0}"#;
        assert!(parse_volumes(body).unwrap().is_empty());
    }

    #[test]
    fn parse_skips_malformed_items() {
        let body = br#"{"items": [
            {"volumeInfo": {"authors": ["No Title"]}},
            {"volumeInfo": {"title": "Dune"}},
            {"id": "no-volume-info"},
            {"volumeInfo": {"title": "Dune Messiah"}}
        ]}"#;
        let titles: Vec<String> = parse_volumes(body)
            .unwrap()
            .into_iter()
            .map(|v| v.title)
            .collect();
        assert_eq!(titles, vec!["Dune", "Dune Messiah"]);
    }

    #[test]
    fn parse_rejects_schema_mismatch() {
        assert!(matches!(
            parse_volumes(br#"{"items": {"title": "Dune"}}"#),
            Err(CatalogError::Decode(_))
        ));
        assert!(matches!(parse_volumes(b"<html>"), Err(CatalogError::Decode(_))));
    }

    #[test]
    fn volumes_url_has_query_params() {
        let client = GoogleBooksClient::with_defaults().unwrap();
        let url = client.volumes_url("frank herbert", 10).unwrap();
        assert_eq!(url.path(), "/books/v1/volumes");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "frank herbert".to_string()),
                ("maxResults".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_without_trailing_slash() {
        let client = GoogleBooksClient::from_url("http://localhost:8080/books/v1").unwrap();
        let url = client.volumes_url("q", 5).unwrap();
        assert_eq!(url.path(), "/books/v1/volumes");
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            GoogleBooksClient::from_url("not a url"),
            Err(CatalogError::ParseUrl(_))
        ));
    }
}
