use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::Url;

use crate::config::HarvestConfig;
use crate::error::HarvestError;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// One search request against the catalog's advanced-search endpoint.
///
/// Call numbers are searched with `idx=callnum`, limited to books
/// (`mc-itype,phr:BKS`), the given language and non-fiction, sorted by call
/// number descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery<'a> {
    pub classification: &'a str,
    pub language_code: &'a str,
    pub offset: u64,
    pub page_size: u64,
}

impl SearchQuery<'_> {
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("idx", "callnum")
            .append_pair("q", self.classification)
            .append_pair("limit", "mc-itype,phr:BKS")
            .append_pair("limit", &format!("ln,rtrn:{}", self.language_code))
            .append_pair("limit", "fic:0")
            .append_pair("offset", &self.offset.to_string())
            .append_pair("sort_by", "call_number_dsc")
            .append_pair("count", &self.page_size.to_string());
        url
    }
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one result page and return its HTML body.
    async fn fetch(&self, url: &Url) -> Result<String, HarvestError>;
}

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    retries: usize,
    retry_backoff: Duration,
}

impl HttpCatalog {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.trim())
            .default_headers(headers)
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| HarvestError::config(format!("build http client: {err}")))?;

        Ok(Self {
            client,
            retries: config.retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, HarvestError> {
        let transport = |source: reqwest::Error| HarvestError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalog {
    async fn fetch(&self, url: &Url) -> Result<String, HarvestError> {
        let attempts = self.retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt + 1 < attempts => {
                    let wait = backoff(self.retry_backoff, attempt);
                    tracing::warn!(
                        %url,
                        attempt = attempt + 1,
                        attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "catalog request failed; retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn backoff(base: Duration, attempt: usize) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16) as u32);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_criterion_and_offset() {
        let base = Url::parse("https://opac.example/cgi-bin/koha/opac-search.pl").unwrap();
        let url = SearchQuery {
            classification: "636",
            language_code: "eng",
            offset: 200,
            page_size: 100,
        }
        .url(&base);

        assert_eq!(
            url.as_str(),
            "https://opac.example/cgi-bin/koha/opac-search.pl?idx=callnum&q=636\
             &limit=mc-itype%2Cphr%3ABKS&limit=ln%2Crtrn%3Aeng&limit=fic%3A0\
             &offset=200&sort_by=call_number_dsc&count=100"
        );
    }

    #[test]
    fn search_url_replaces_existing_query() {
        let base = Url::parse("http://127.0.0.1:9/search?stale=1").unwrap();
        let url = SearchQuery {
            classification: "600",
            language_code: "hin",
            offset: 0,
            page_size: 2,
        }
        .url(&base);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(!pairs.iter().any(|(k, _)| k == "stale"));
        assert!(pairs.contains(&("limit".to_owned(), "ln,rtrn:hin".to_owned())));
        assert!(pairs.contains(&("count".to_owned(), "2".to_owned())));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff(base, 0), Duration::from_millis(500));
        assert_eq!(backoff(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff(base, 3), Duration::from_millis(4000));
        assert_eq!(backoff(base, 12), MAX_BACKOFF);
    }
}
