use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;

/// Options for the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Seed for every resolution; absent means fresh entropy per call.
    pub seed: Option<u64>,
    /// Date treated as "today"; absent means the local date.
    pub today: Option<NaiveDate>,
    /// Default window for past dates, in days.
    pub past_days: u32,
    /// Default window for future dates, in days.
    pub future_days: u32,
    /// Fail on overrides naming undeclared fields instead of skipping them.
    pub strict: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            seed: None,
            today: None,
            past_days: 365,
            future_days: 365,
            strict: true,
        }
    }
}

impl ResolveOptions {
    pub fn from_toml_str(contents: &str) -> Result<Self, GenerationError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

/// Report for one resolved instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub schema: String,
    pub keyword: Option<String>,
    /// Seed of the rng, when the engine created it.
    pub seed: Option<u64>,
    pub today: NaiveDate,
    pub fields: usize,
    pub plan_rebuilt: bool,
    pub generator_usage: BTreeMap<String, u64>,
    /// Branch taken per conditional field, `"default"` for the fallback.
    pub branches: BTreeMap<String, String>,
    pub overridden: Vec<String>,
    pub skipped_overrides: Vec<String>,
}

impl ResolutionReport {
    pub fn new(schema: &str, seed: Option<u64>, today: NaiveDate) -> Self {
        Self {
            schema: schema.to_string(),
            keyword: None,
            seed,
            today,
            fields: 0,
            plan_rebuilt: false,
            generator_usage: BTreeMap::new(),
            branches: BTreeMap::new(),
            overridden: Vec::new(),
            skipped_overrides: Vec::new(),
        }
    }

    pub fn record_generator_usage(&mut self, id: &str) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Record the outermost branch decision for a field.
    pub fn record_branch(&mut self, field: &str, branch: String) {
        self.branches.entry(field.to_string()).or_insert(branch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = ResolveOptions::from_toml_str(
            r#"
seed = 42
today = "2024-05-10"
strict = false
"#,
        )
        .expect("parse options");

        assert_eq!(options.seed, Some(42));
        assert_eq!(options.today, NaiveDate::from_ymd_opt(2024, 5, 10));
        assert_eq!(options.past_days, 365);
        assert!(!options.strict);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = ResolveOptions::from_toml_str("seed = \"many\"");
        assert!(matches!(result, Err(GenerationError::Config(_))));
    }
}
