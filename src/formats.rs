use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCriterion {
    /// Dewey Decimal code searched in the call-number index.
    pub classification: String,
    /// Language name as listed in the language table (e.g. "English").
    pub language: String,
}

impl SearchCriterion {
    pub fn new(classification: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            classification: classification.into(),
            language: language.into(),
        }
    }
}

impl std::fmt::Display for SearchCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.classification, self.language)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographicRecord {
    pub classification: String,
    pub search_language: String,
    pub title: Option<String>,
    pub call_number: Option<String>,
    pub author: Option<String>,
    pub material_type: Option<String>,
    pub literary_form: Option<String>,
    pub language: Option<String>,
    pub publication_year: Option<String>,
    pub link: Option<String>,
}

impl BibliographicRecord {
    pub const COLUMNS: [&'static str; 10] = [
        "classification",
        "search_language",
        "title",
        "call_number",
        "author",
        "material_type",
        "literary_form",
        "language",
        "publication_year",
        "link",
    ];

    pub fn tagged(criterion: &SearchCriterion) -> Self {
        Self {
            classification: criterion.classification.clone(),
            search_language: criterion.language.clone(),
            ..Self::default()
        }
    }

    /// Row in [`Self::COLUMNS`] order; absent fields become empty cells.
    pub fn to_row(&self) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            self.classification.clone(),
            self.search_language.clone(),
            opt(&self.title),
            opt(&self.call_number),
            opt(&self.author),
            opt(&self.material_type),
            opt(&self.literary_form),
            opt(&self.language),
            opt(&self.publication_year),
            opt(&self.link),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionSummary {
    pub classification: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reported: Option<u64>,
    pub pages_requested: usize,
    pub pages_skipped: usize,
    pub records: usize,
}

impl CriterionSummary {
    pub fn new(criterion: &SearchCriterion) -> Self {
        Self {
            classification: criterion.classification.clone(),
            language: criterion.language.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestResult {
    pub records: Vec<BibliographicRecord>,
    pub summaries: Vec<CriterionSummary>,
}

impl HarvestResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub records: usize,
    pub criteria: Vec<CriterionSummary>,
}
