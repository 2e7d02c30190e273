use outlay_core::Transaction;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Reserved category for transactions no keyword matched.
pub const OTHER_CATEGORY: &str = "Other";

/// One keyword-to-category mapping. Keywords are matched as
/// case-insensitive substrings of the transaction description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub category: String,
}

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("classification file has no categories")]
    NoCategories,
}

#[derive(Debug, Clone)]
pub struct Categorized {
    pub transaction: Transaction,
    pub category: String,
}

/// Keyword lookup table built from the classification CSV, where each
/// column is a category and each cell under it a keyword.
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    /// Keywords are lowercased on the way in. A keyword listed more than
    /// once keeps its original position but maps to the last category that
    /// lists it.
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let mut deduped: Vec<KeywordRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            let keyword = rule.keyword.to_lowercase();
            match deduped.iter_mut().find(|r| r.keyword == keyword) {
                Some(existing) => existing.category = rule.category,
                None => deduped.push(KeywordRule {
                    keyword,
                    category: rule.category,
                }),
            }
        }
        Self { rules: deduped }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, RulesError> {
        Self::from_csv(std::fs::File::open(path)?)
    }

    /// Loads the table column-major: every keyword of the first category,
    /// then every keyword of the second, and so on. Earlier entries win
    /// when more than one keyword matches a description.
    pub fn from_csv<R: Read>(data: R) -> Result<Self, RulesError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(data);

        let categories: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if categories.is_empty() {
            return Err(RulesError::NoCategories);
        }

        let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;

        let mut rules = Vec::new();
        for (column, category) in categories.iter().enumerate() {
            for record in &records {
                let Some(keyword) = record.get(column) else {
                    continue;
                };
                if keyword.is_empty() {
                    continue;
                }
                rules.push(KeywordRule {
                    keyword: keyword.to_string(),
                    category: category.clone(),
                });
            }
        }

        Ok(Self::new(rules))
    }

    /// First rule (in table order) whose keyword occurs in the description,
    /// or the reserved `Other` category.
    pub fn categorize(&self, description: &str) -> &str {
        let description = description.to_lowercase();
        self.rules
            .iter()
            .find(|r| description.contains(&r.keyword))
            .map(|r| r.category.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }

    pub fn classify(&self, transactions: &[Transaction]) -> Vec<Categorized> {
        transactions
            .iter()
            .map(|t| Categorized {
                transaction: t.clone(),
                category: self.categorize(&t.description).to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
