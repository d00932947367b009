use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HarvestError;
use crate::formats::SearchCriterion;

pub const DEFAULT_BASE_URL: &str =
    "https://nationallibraryopac.nvli.in/cgi-bin/koha/opac-search.pl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Results requested per page (`count=` parameter).
    pub page_size: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            page_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCode {
    pub name: String,
    /// Catalog-side code used by the `ln,rtrn:` limit.
    pub code: String,
}

impl LanguageCode {
    fn new(name: &str, code: &str) -> Self {
        Self {
            name: name.to_owned(),
            code: code.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub catalog: CatalogConfig,
    pub user_agent: String,
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub retries: usize,
    pub retry_backoff_ms: u64,
    pub languages: Vec<LanguageCode>,
    pub classifications: Vec<String>,
    /// Explicit criterion list; replaces `languages` x `classifications`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<SearchCriterion>>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            user_agent: String::new(),
            delay_ms: 1000,
            timeout_secs: 200,
            retries: 0,
            retry_backoff_ms: 1000,
            languages: vec![
                LanguageCode::new("Hindi", "hin"),
                LanguageCode::new("Tamil", "tam"),
                LanguageCode::new("Marathi", "mar"),
                LanguageCode::new("Urdu", "urd"),
                LanguageCode::new("Kannada", "kan"),
                LanguageCode::new("Bengali", "ben"),
                LanguageCode::new("English", "eng"),
            ],
            classifications: (600..=605).map(|code| code.to_string()).collect(),
            criteria: None,
        }
    }
}

impl HarvestConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Criteria in harvest order. Without an explicit list, languages form
    /// the outer loop and classifications the inner one.
    pub fn criteria(&self) -> Vec<SearchCriterion> {
        if let Some(criteria) = &self.criteria {
            return criteria.clone();
        }

        self.languages
            .iter()
            .flat_map(|language| {
                self.classifications
                    .iter()
                    .map(|code| SearchCriterion::new(code.clone(), language.name.clone()))
            })
            .collect()
    }

    pub fn language_code(&self, name: &str) -> Option<&str> {
        self.languages
            .iter()
            .find(|language| language.name.eq_ignore_ascii_case(name))
            .map(|language| language.code.as_str())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self) -> Result<Url, HarvestError> {
        let url = Url::parse(&self.catalog.base_url).map_err(|err| {
            HarvestError::config(format!(
                "catalog.base_url is not a valid url ({}): {err}",
                self.catalog.base_url
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(HarvestError::config(format!(
                "catalog.base_url must be http/https: {url}"
            )));
        }
        Ok(url)
    }

    /// Narrow the criterion list to the given classifications and languages.
    /// Empty filters keep everything. Without an explicit criterion list the
    /// classifications replace the configured ones, so codes outside the
    /// default range can be requested.
    pub fn restrict(&mut self, classifications: &[String], languages: &[String]) {
        if self.criteria.is_none() && !classifications.is_empty() {
            self.classifications = classifications.to_vec();
        }
        let criteria = self
            .criteria()
            .into_iter()
            .filter(|c| classifications.is_empty() || classifications.contains(&c.classification))
            .filter(|c| {
                languages.is_empty()
                    || languages
                        .iter()
                        .any(|language| language.eq_ignore_ascii_case(&c.language))
            })
            .collect();
        self.criteria = Some(criteria);
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.user_agent.trim().is_empty() {
            return Err(HarvestError::config(
                "user_agent must be set (config file or --user-agent)",
            ));
        }
        if self.catalog.page_size == 0 {
            return Err(HarvestError::config("catalog.page_size must be at least 1"));
        }
        self.base_url()?;

        let criteria = self.criteria();
        if criteria.is_empty() {
            return Err(HarvestError::config("no search criteria configured"));
        }
        for criterion in &criteria {
            if criterion.classification.trim().is_empty() {
                return Err(HarvestError::config(format!(
                    "criterion {criterion} has an empty classification code"
                )));
            }
            if self.language_code(&criterion.language).is_none() {
                return Err(HarvestError::config(format!(
                    "language is not in the language table: {}",
                    criterion.language
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_agent() -> HarvestConfig {
        HarvestConfig {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_owned(),
            ..HarvestConfig::default()
        }
    }

    #[test]
    fn default_criteria_iterate_languages_outermost() {
        let config = HarvestConfig::default();
        let criteria = config.criteria();

        assert_eq!(criteria.len(), 7 * 6);
        assert_eq!(criteria[0], SearchCriterion::new("600", "Hindi"));
        assert_eq!(criteria[1], SearchCriterion::new("601", "Hindi"));
        assert_eq!(criteria[6], SearchCriterion::new("600", "Tamil"));
        assert_eq!(criteria.last(), Some(&SearchCriterion::new("605", "English")));
    }

    #[test]
    fn explicit_criteria_replace_the_product() {
        let config = HarvestConfig {
            criteria: Some(vec![SearchCriterion::new("636", "English")]),
            ..config_with_agent()
        };
        assert_eq!(config.criteria(), vec![SearchCriterion::new("636", "English")]);
        config.validate().expect("valid config");
    }

    #[test]
    fn blank_user_agent_is_rejected() {
        let config = HarvestConfig {
            user_agent: "   ".to_owned(),
            ..HarvestConfig::default()
        };
        let err = config.validate().expect_err("blank user agent");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("user_agent"));
    }

    #[test]
    fn empty_criteria_are_rejected() {
        let config = HarvestConfig {
            classifications: Vec::new(),
            ..config_with_agent()
        };
        let err = config.validate().expect_err("no criteria");
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn unknown_language_is_rejected() {
        let config = HarvestConfig {
            criteria: Some(vec![SearchCriterion::new("600", "Klingon")]),
            ..config_with_agent()
        };
        let err = config.validate().expect_err("unknown language");
        assert!(err.to_string().contains("Klingon"));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let mut config = config_with_agent();
        config.catalog.base_url = "ftp://catalog.example/search".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn restrict_filters_by_code_and_language() {
        let mut config = config_with_agent();
        config.restrict(&["603".to_owned()], &["english".to_owned()]);
        assert_eq!(config.criteria(), vec![SearchCriterion::new("603", "English")]);
    }

    #[test]
    fn restrict_accepts_codes_outside_the_default_range() {
        let mut config = config_with_agent();
        config.restrict(&["636".to_owned()], &[]);
        let criteria = config.criteria();
        assert_eq!(criteria.len(), 7);
        assert!(criteria.iter().all(|c| c.classification == "636"));
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() -> anyhow::Result<()> {
        let yaml = r#"
user_agent: test-agent/1.0
catalog:
  base_url: http://127.0.0.1:8080/cgi-bin/koha/opac-search.pl
criteria:
  - classification: "636"
    language: English
"#;
        let config: HarvestConfig = serde_yaml::from_str(yaml)?;
        assert_eq!(config.catalog.page_size, 100);
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.language_code("English"), Some("eng"));
        assert_eq!(config.criteria().len(), 1);
        config.validate()?;
        Ok(())
    }
}
