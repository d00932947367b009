use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::HarvestError;
use crate::formats::{BibliographicRecord, SearchCriterion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    CallNumber,
    Author,
    MaterialType,
    LiteraryForm,
    Language,
    PublicationYear,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// First non-blank text node directly under the element, title-cleaned.
    OwnText,
    /// All descendant text, whitespace collapsed.
    Text,
    /// Text after the first `:`; absent when there is no label.
    LabelValue,
    /// Text after the first `:`, or the whole text when there is no label.
    LabelValueOrText,
    /// Whole text with a literal label removed.
    StripPrefix(&'static str),
    /// An attribute value; `href` is resolved against the page url.
    Attr(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldLocator {
    pub field: Field,
    pub selector: &'static str,
    pub extraction: Extraction,
}

/// Where each field lives inside one result row of a Koha OPAC listing.
pub const FIELD_LOCATORS: &[FieldLocator] = &[
    FieldLocator {
        field: Field::Title,
        selector: "a.title",
        extraction: Extraction::OwnText,
    },
    FieldLocator {
        field: Field::CallNumber,
        selector: "span.CallNumber",
        extraction: Extraction::Text,
    },
    FieldLocator {
        field: Field::Author,
        selector: "p",
        extraction: Extraction::Text,
    },
    FieldLocator {
        field: Field::MaterialType,
        selector: "span.results_material_type",
        extraction: Extraction::StripPrefix("Material type:"),
    },
    FieldLocator {
        field: Field::LiteraryForm,
        selector: "span.results_contents_literary",
        extraction: Extraction::LabelValueOrText,
    },
    FieldLocator {
        field: Field::Language,
        selector: "span.results_summary.languages",
        extraction: Extraction::LabelValue,
    },
    FieldLocator {
        field: Field::PublicationYear,
        selector: "span.publisher_date",
        extraction: Extraction::Text,
    },
    FieldLocator {
        field: Field::Link,
        selector: "a",
        extraction: Extraction::Attr("href"),
    },
];

/// Pagination facts read from a result page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Listing {
    /// Total hits reported by the catalog; `None` when it reports none.
    pub total: Option<u64>,
    /// 1-based `(first, last)` range from "showing X-Y of Z" text.
    pub shown: Option<(u64, u64)>,
}

impl Listing {
    pub fn shown_len(&self) -> Option<u64> {
        self.shown
            .filter(|(first, last)| last >= first)
            .map(|(first, last)| last - first + 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub listing: Listing,
    /// Whether the page carried a `div.searchresults` table at all.
    pub has_results: bool,
    /// Number of record rows detected on the page.
    pub fragments: usize,
    pub records: Vec<BibliographicRecord>,
}

/// Selectors and patterns compiled once per run.
#[derive(Debug)]
pub struct PageParser {
    results: Selector,
    row: Selector,
    cell: Selector,
    count_headings: Vec<Selector>,
    pagination: Selector,
    fields: Vec<(Field, Selector, Extraction)>,
    showing: Regex,
    no_results: Regex,
}

fn selector(css: &str) -> Result<Selector, HarvestError> {
    Selector::parse(css)
        .map_err(|err| HarvestError::config(format!("invalid css selector {css:?}: {err}")))
}

fn regex(pattern: &str) -> Result<Regex, HarvestError> {
    Regex::new(pattern)
        .map_err(|err| HarvestError::config(format!("invalid pattern {pattern:?}: {err}")))
}

impl PageParser {
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_locators(FIELD_LOCATORS)
    }

    pub fn with_locators(locators: &[FieldLocator]) -> Result<Self, HarvestError> {
        let fields = locators
            .iter()
            .map(|locator| Ok((locator.field, selector(locator.selector)?, locator.extraction)))
            .collect::<Result<Vec<_>, HarvestError>>()?;

        Ok(Self {
            results: selector("div.searchresults")?,
            row: selector("tr")?,
            cell: selector("td")?,
            count_headings: vec![selector("#numresults")?, selector("h1")?],
            pagination: selector(".pagination, .results-pagination, #numresults, h1")?,
            fields,
            showing: regex(r"(?i)(\d[\d,]*)\s*(?:-|–|—|to)\s*(\d[\d,]*)\s+of\s+(\d[\d,]*)")?,
            no_results: regex(r"(?i)\bno results\b")?,
        })
    }

    /// Parse one result page.
    ///
    /// A page that reports hits but has no results table is a parse error.
    /// A page reporting no hits parses to an empty page.
    pub fn parse_page(
        &self,
        html: &str,
        page_url: &Url,
        criterion: &SearchCriterion,
    ) -> Result<ParsedPage, HarvestError> {
        let document = Html::parse_document(html);
        let listing = self.listing(&document);

        let Some(table) = document.select(&self.results).next() else {
            if listing.total.unwrap_or(0) > 0 {
                return Err(HarvestError::parse(
                    page_url.as_str(),
                    "result count present but no div.searchresults",
                ));
            }
            return Ok(ParsedPage {
                listing,
                ..ParsedPage::default()
            });
        };

        let records = table
            .select(&self.row)
            .filter(|row| row.select(&self.cell).next().is_some())
            .map(|row| self.record(row, page_url, criterion))
            .collect::<Vec<_>>();

        Ok(ParsedPage {
            listing,
            has_results: true,
            fragments: records.len(),
            records,
        })
    }

    fn listing(&self, document: &Html) -> Listing {
        for element in document.select(&self.pagination) {
            let text = collapse_ws(&element.text().collect::<String>());
            if let Some(caps) = self.showing.captures(&text) {
                let first = caps.get(1).and_then(|m| parse_count(m.as_str()));
                let last = caps.get(2).and_then(|m| parse_count(m.as_str()));
                let total = caps.get(3).and_then(|m| parse_count(m.as_str()));
                return Listing {
                    total,
                    shown: first.zip(last),
                };
            }
        }

        for heading in &self.count_headings {
            let Some(element) = document.select(heading).next() else {
                continue;
            };
            let text = element.text().collect::<String>();
            if self.no_results.is_match(&text) {
                return Listing::default();
            }
            if let Some(total) = digits_of(&text) {
                return Listing {
                    total: Some(total),
                    shown: None,
                };
            }
        }

        Listing::default()
    }

    fn record(
        &self,
        row: ElementRef<'_>,
        page_url: &Url,
        criterion: &SearchCriterion,
    ) -> BibliographicRecord {
        let mut record = BibliographicRecord::tagged(criterion);
        for (field, selector, extraction) in &self.fields {
            let value = row
                .select(selector)
                .next()
                .and_then(|element| extract(element, *extraction, page_url));
            let slot = match field {
                Field::Title => &mut record.title,
                Field::CallNumber => &mut record.call_number,
                Field::Author => &mut record.author,
                Field::MaterialType => &mut record.material_type,
                Field::LiteraryForm => &mut record.literary_form,
                Field::Language => &mut record.language,
                Field::PublicationYear => &mut record.publication_year,
                Field::Link => &mut record.link,
            };
            *slot = value;
        }
        record
    }
}

fn extract(element: ElementRef<'_>, extraction: Extraction, page_url: &Url) -> Option<String> {
    let text = || collapse_ws(&element.text().collect::<String>());
    let value = match extraction {
        Extraction::OwnText => element
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| clean_title(text))
            .find(|text| !text.is_empty())?,
        Extraction::Text => text(),
        Extraction::LabelValue => text().split_once(':')?.1.trim().to_owned(),
        Extraction::LabelValueOrText => {
            let text = text();
            match text.split_once(':') {
                Some((_, value)) => value.trim().to_owned(),
                None => text,
            }
        }
        Extraction::StripPrefix(label) => text().replace(label, "").trim().to_owned(),
        Extraction::Attr(name) => {
            let raw = element.value().attr(name)?.trim();
            if name == "href" {
                page_url
                    .join(raw)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| raw.to_owned())
            } else {
                raw.to_owned()
            }
        }
    };

    if value.is_empty() { None } else { Some(value) }
}

/// Drop newlines, tabs and the `/` statement-of-responsibility separator.
pub fn clean_title(raw: &str) -> String {
    raw.replace(['\n', '\t', '/'], "").trim().to_owned()
}

/// Every digit in `text`, joined: "returned 1,234 results" is 1234.
pub fn digits_of(text: &str) -> Option<u64> {
    let digits = text.chars().filter(char::is_ascii_digit).collect::<String>();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn parse_count(text: &str) -> Option<u64> {
    text.replace(',', "").parse().ok()
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
