use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use url::Url;

use crate::catalog::{CatalogClient, HttpCatalog, SearchQuery};
use crate::cli::HarvestArgs;
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::formats::{CriterionSummary, HarvestResult, RunSummary, SearchCriterion};
use crate::parse::{PageParser, ParsedPage};

pub async fn run(args: HarvestArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    let summary_path = args.summary.as_ref().map(PathBuf::from);
    for path in std::iter::once(&out_path).chain(summary_path.as_ref()) {
        if path.exists() && !args.force {
            anyhow::bail!("output already exists: {}", path.display());
        }
    }

    let config = resolve_config(&args)?;
    config.validate().context("validate config")?;
    let criteria = config.criteria();

    let client = HttpCatalog::new(&config).context("build catalog client")?;
    let started_at = chrono::Utc::now().to_rfc3339();
    tracing::info!(
        base_url = %config.catalog.base_url,
        criteria = criteria.len(),
        page_size = config.catalog.page_size,
        "harvest: start"
    );

    let result = harvest(&criteria, &config, &client)
        .await
        .context("harvest")?;

    crate::export::write_result(&result, &out_path, args.format, args.force)
        .context("write harvest result")?;
    tracing::info!(out = %out_path.display(), records = result.len(), "harvest: written");

    if let Some(summary_path) = summary_path {
        let summary = RunSummary {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            records: result.len(),
            criteria: result.summaries.clone(),
        };
        crate::export::write_summary(&summary, &summary_path, args.force)
            .context("write run summary")?;
    }

    Ok(())
}

fn resolve_config(args: &HarvestArgs) -> anyhow::Result<HarvestConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => HarvestConfig::load(Path::new(path))?,
        None => HarvestConfig::default(),
    };

    if let Some(user_agent) = &args.user_agent {
        config.user_agent = user_agent.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.catalog.base_url = base_url.clone();
    }
    if let Some(delay_ms) = args.delay_ms {
        config.delay_ms = delay_ms;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if !args.classifications.is_empty() || !args.languages.is_empty() {
        config.restrict(&args.classifications, &args.languages);
    }

    Ok(config)
}

/// Visit every result page of every criterion, in order, one request at a
/// time.
///
/// Page-level failures are logged and skipped. Only configuration problems
/// (empty criteria, unknown language, bad base url) are returned as errors,
/// and they are detected before the first request.
pub async fn harvest(
    criteria: &[SearchCriterion],
    config: &HarvestConfig,
    client: &dyn CatalogClient,
) -> Result<HarvestResult, HarvestError> {
    if criteria.is_empty() {
        return Err(HarvestError::config("no search criteria configured"));
    }
    if config.catalog.page_size == 0 {
        return Err(HarvestError::config("catalog.page_size must be at least 1"));
    }
    let base_url = config.base_url()?;
    let jobs = criteria
        .iter()
        .map(|criterion| {
            config
                .language_code(&criterion.language)
                .map(|code| (criterion, code))
                .ok_or_else(|| {
                    HarvestError::config(format!(
                        "language is not in the language table: {}",
                        criterion.language
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let parser = PageParser::new()?;
    let mut harvester = Harvester {
        client,
        parser: &parser,
        base_url: &base_url,
        page_size: config.catalog.page_size,
        delay: config.delay(),
        requests: 0,
    };

    let started = Instant::now();
    let mut result = HarvestResult::default();
    for (criterion, language_code) in jobs {
        let criterion_started = Instant::now();
        let summary = harvester
            .harvest_criterion(criterion, language_code, &mut result)
            .await;
        tracing::info!(
            classification = %summary.classification,
            language = %summary.language,
            total = ?summary.total_reported,
            records = summary.records,
            pages_skipped = summary.pages_skipped,
            elapsed_ms = criterion_started.elapsed().as_millis() as u64,
            "criterion done"
        );
        result.summaries.push(summary);
    }

    tracing::info!(
        records = result.len(),
        criteria = result.summaries.len(),
        requests = harvester.requests,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "harvest done"
    );
    Ok(result)
}

struct Harvester<'a> {
    client: &'a dyn CatalogClient,
    parser: &'a PageParser,
    base_url: &'a Url,
    page_size: u64,
    delay: Duration,
    requests: usize,
}

impl Harvester<'_> {
    async fn harvest_criterion(
        &mut self,
        criterion: &SearchCriterion,
        language_code: &str,
        result: &mut HarvestResult,
    ) -> CriterionSummary {
        let mut summary = CriterionSummary::new(criterion);
        let query = |offset: u64, page_size: u64| SearchQuery {
            classification: &criterion.classification,
            language_code,
            offset,
            page_size,
        };

        let first_url = query(0, self.page_size).url(self.base_url);
        summary.pages_requested += 1;
        let first = match self.fetch_page(&first_url, criterion, false).await {
            Ok(page) => page,
            Err(err) => {
                summary.pages_skipped += 1;
                tracing::warn!(
                    %criterion,
                    url = %first_url,
                    error = %err,
                    "first page skipped; criterion contributes no records"
                );
                return summary;
            }
        };

        summary.total_reported = first.listing.total;
        let total = match first.listing.total {
            Some(total) if total > 0 => total,
            Some(_) | None if first.records.is_empty() => {
                tracing::info!(%criterion, "no results");
                return summary;
            }
            _ => {
                tracing::warn!(
                    %criterion,
                    records = first.records.len(),
                    "result count missing; keeping the first page only"
                );
                summary.records += first.records.len();
                result.records.extend(first.records);
                return summary;
            }
        };

        let page_size = first.listing.shown_len().unwrap_or(self.page_size).max(1);
        let pages = total.div_ceil(page_size);
        tracing::info!(%criterion, total, page_size, pages, "harvesting criterion");

        summary.records += first.records.len();
        result.records.extend(first.records);
        tracing::info!(%criterion, page = 1, pages, "page harvested");

        for (index, offset) in (page_size..total).step_by(page_size as usize).enumerate() {
            let page_number = index + 2;
            let url = query(offset, self.page_size).url(self.base_url);
            summary.pages_requested += 1;
            match self.fetch_page(&url, criterion, true).await {
                Ok(page) => {
                    summary.records += page.records.len();
                    result.records.extend(page.records);
                    tracing::info!(%criterion, page = page_number, pages, "page harvested");
                }
                Err(err) => {
                    summary.pages_skipped += 1;
                    tracing::warn!(
                        %criterion,
                        %url,
                        page = page_number,
                        error = %err,
                        "page skipped"
                    );
                }
            }
        }

        summary
    }

    /// Fetch and parse one page. Pages inside the reported total must carry
    /// a results table; anything else (an error or maintenance page served
    /// with 200) is a parse error.
    async fn fetch_page(
        &mut self,
        url: &Url,
        criterion: &SearchCriterion,
        expect_results: bool,
    ) -> Result<ParsedPage, HarvestError> {
        if self.requests > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests += 1;
        tracing::debug!(%url, "GET");

        let html = self.client.fetch(url).await?;
        let page = self.parser.parse_page(&html, url, criterion)?;
        if expect_results && !page.has_results {
            return Err(HarvestError::parse(
                url.as_str(),
                "no div.searchresults on a page inside the reported total",
            ));
        }
        Ok(page)
    }
}
