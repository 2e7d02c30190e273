pub mod csv;
pub mod monthly;
pub mod rules;

pub use self::csv::{CsvError, CsvProfile, ReadOutcome};
pub use monthly::{CombineOutcome, DiscoveryError, COMBINED_FILENAME};
pub use rules::{Categorized, KeywordClassifier, KeywordRule, RulesError, OTHER_CATEGORY};
