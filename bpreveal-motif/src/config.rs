//! JSON configuration for the cutoff and scan steps.
//!
//! Every struct rejects unknown keys and fills in defaults while
//! deserializing. Call `validate()` before starting any work.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use bpreveal_core::utils::parse_verbosity;

use crate::errors::ConfigError;

/// How far background probabilities may stray from summing to one.
pub const BACKGROUND_TOLERANCE: f64 = 1e-3;

fn default_verbosity() -> String {
    "INFO".to_string()
}

fn default_trim_threshold() -> f64 {
    0.3
}

fn default_trim_padding() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SeqletCutoffConfig {
    #[serde(default = "default_verbosity")]
    pub verbosity: String,
    pub modisco_h5: PathBuf,
    #[serde(default)]
    pub modisco_contrib_h5: Option<PathBuf>,
    pub patterns: PatternSelection,
    #[serde(default)]
    pub seq_match_quantile: Option<f64>,
    #[serde(default)]
    pub contrib_match_quantile: Option<f64>,
    #[serde(default)]
    pub contrib_magnitude_quantile: Option<f64>,
    #[serde(default = "default_trim_threshold")]
    pub trim_threshold: f64,
    #[serde(default = "default_trim_padding")]
    pub trim_padding: usize,
    pub background_probs: BackgroundProbs,
    #[serde(default)]
    pub seqlets_tsv: Option<PathBuf>,
    #[serde(default)]
    pub quantile_json: Option<PathBuf>,
}

impl SeqletCutoffConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        Ok(parse_verbosity(&self.verbosity)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;
        if self.modisco_contrib_h5.is_some() {
            // seqlet indices are reset upstream, so coordinates can't be recovered
            return Err(ConfigError::Unsupported(
                "Recovering genomic coordinates through modisco-contrib-h5".to_string(),
            ));
        }
        for (name, value) in [
            ("seq-match-quantile", self.seq_match_quantile),
            ("contrib-match-quantile", self.contrib_match_quantile),
            ("contrib-magnitude-quantile", self.contrib_magnitude_quantile),
        ] {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::InvalidQuantile {
                        name: name.to_string(),
                        value,
                    });
                }
            }
        }
        if !(0.0..=1.0).contains(&self.trim_threshold) {
            return Err(ConfigError::InvalidTrimThreshold(self.trim_threshold));
        }
        self.background_probs.resolve()?;
        self.patterns.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScanSettings {
    pub scan_contrib_h5: PathBuf,
    pub hits_tsv: PathBuf,
    pub num_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MotifScanConfig {
    #[serde(default = "default_verbosity")]
    pub verbosity: String,
    #[serde(default)]
    pub seqlet_cutoff_settings: Option<SeqletCutoffConfig>,
    #[serde(default)]
    pub seqlet_cutoff_json: Option<PathBuf>,
    pub scan_settings: ScanSettings,
}

impl MotifScanConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        Ok(parse_verbosity(&self.verbosity)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;
        match (&self.seqlet_cutoff_settings, &self.seqlet_cutoff_json) {
            (Some(_), Some(_)) => return Err(ConfigError::BothCutoffSources),
            (None, None) => return Err(ConfigError::NoCutoffSource),
            (Some(settings), None) => settings.validate()?,
            (None, Some(_)) => {}
        }
        if self.scan_settings.num_threads < 3 {
            return Err(ConfigError::TooFewThreads(self.scan_settings.num_threads));
        }
        Ok(())
    }
}

/// `[A, C, G, T]` frequencies, or a genome whose frequencies are built in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BackgroundProbs {
    Probs([f64; 4]),
    Genome(String),
}

impl BackgroundProbs {
    pub fn resolve(&self) -> Result<[f64; 4], ConfigError> {
        let probs = match self {
            BackgroundProbs::Probs(probs) => *probs,
            BackgroundProbs::Genome(name) => genome_background(name)
                .ok_or_else(|| ConfigError::UnknownGenome(name.clone()))?,
        };
        let total: f64 = probs.iter().sum();
        if probs.iter().any(|p| !(*p >= 0.0)) || (total - 1.0).abs() > BACKGROUND_TOLERANCE {
            return Err(ConfigError::InvalidBackground(probs));
        }
        Ok(probs)
    }
}

/// Base composition of the genomes bpreveal ships defaults for.
pub fn genome_background(name: &str) -> Option<[f64; 4]> {
    match name {
        "hg38" => Some([0.2951, 0.2049, 0.2049, 0.2951]),
        "mm10" => Some([0.2909, 0.2091, 0.2091, 0.2909]),
        "dm6" => Some([0.2906, 0.2094, 0.2094, 0.2906]),
        "sacCer3" => Some([0.3085, 0.1915, 0.1915, 0.3085]),
        "danRer11" => Some([0.3173, 0.1827, 0.1827, 0.3173]),
        _ => None,
    }
}

/// The patterns to calibrate: `"all"` or a list of per-metacluster specs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PatternSelection {
    Keyword(String),
    Specs(Vec<PatternSpec>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PatternNames {
    Keyword(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PatternSpec {
    pub metacluster_name: String,
    #[serde(default)]
    pub pattern_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub pattern_names: Option<PatternNames>,
    #[serde(default)]
    pub short_names: Option<Vec<String>>,
}

/// A pattern picked out of the artifact, with the name used in outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRef {
    pub metacluster_name: String,
    pub pattern_name: String,
    pub short_name: String,
}

impl PatternRef {
    pub fn new(metacluster_name: &str, pattern_name: &str, short_name: Option<&str>) -> Self {
        PatternRef {
            metacluster_name: metacluster_name.to_string(),
            pattern_name: pattern_name.to_string(),
            short_name: short_name
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}_{}", metacluster_name, pattern_name)),
        }
    }
}

fn is_all(keyword: &str) -> bool {
    keyword == "all"
}

impl PatternSpec {
    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::InvalidPatternSpec {
            metacluster: self.metacluster_name.clone(),
            reason: reason.to_string(),
        }
    }

    /// True when this spec takes every pattern of its metacluster.
    pub fn is_catch_all(&self) -> bool {
        matches!(&self.pattern_names, Some(PatternNames::Keyword(k)) if is_all(k))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.pattern_name, &self.pattern_names) {
            (Some(_), Some(_)) => Err(self.invalid("give pattern-name or pattern-names, not both")),
            (None, None) => Err(self.invalid("one of pattern-name or pattern-names is required")),
            (Some(_), None) => {
                if self.short_names.is_some() {
                    return Err(self.invalid("short-names goes with pattern-names"));
                }
                Ok(())
            }
            (None, Some(PatternNames::Keyword(keyword))) => {
                if !is_all(keyword) {
                    return Err(self.invalid(&format!("unknown keyword {:?}", keyword)));
                }
                if self.short_name.is_some() || self.short_names.is_some() {
                    return Err(self.invalid("\"all\" patterns take default short names"));
                }
                Ok(())
            }
            (None, Some(PatternNames::List(names))) => {
                if self.short_name.is_some() {
                    return Err(self.invalid("short-name goes with pattern-name"));
                }
                match &self.short_names {
                    Some(short) if short.len() != names.len() => {
                        Err(self.invalid("short-names and pattern-names differ in length"))
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    ///
    /// The explicit patterns this spec names. A catch-all spec names none;
    /// its patterns come from the artifact.
    ///
    pub fn explicit_refs(&self) -> Vec<PatternRef> {
        let metacluster = &self.metacluster_name;
        match (&self.pattern_name, &self.pattern_names) {
            (Some(name), _) => vec![PatternRef::new(metacluster, name, self.short_name.as_deref())],
            (None, Some(PatternNames::List(names))) => names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let short = self.short_names.as_ref().and_then(|s| s.get(i));
                    PatternRef::new(metacluster, name, short.map(String::as_str))
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl PatternSelection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PatternSelection::Keyword(keyword) if is_all(keyword) => Ok(()),
            PatternSelection::Keyword(keyword) => Err(ConfigError::InvalidPatternSpec {
                metacluster: "*".to_string(),
                reason: format!("unknown keyword {:?}", keyword),
            }),
            PatternSelection::Specs(specs) => {
                let mut catch_all = HashSet::new();
                let mut explicit = HashSet::new();
                for spec in specs {
                    spec.validate()?;
                    if spec.is_catch_all() {
                        catch_all.insert(spec.metacluster_name.as_str());
                    } else {
                        explicit.insert(spec.metacluster_name.as_str());
                    }
                }
                let mut both: Vec<&&str> = catch_all.intersection(&explicit).collect();
                both.sort();
                match both.first() {
                    Some(metacluster) => {
                        Err(ConfigError::PatternSpecAmbiguous(metacluster.to_string()))
                    }
                    None => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    fn cutoff_config(extra: serde_json::Value) -> SeqletCutoffConfig {
        let mut base = json!({
            "modisco-h5": "modisco.json",
            "patterns": "all",
            "seq-match-quantile": 0.2,
            "contrib-match-quantile": 0.2,
            "contrib-magnitude-quantile": null,
            "background-probs": "hg38"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[rstest]
    fn test_defaults_applied() {
        let config = cutoff_config(json!({}));
        assert_eq!(config.trim_threshold, 0.3);
        assert_eq!(config.trim_padding, 1);
        assert_eq!(config.verbosity, "INFO");
        assert_eq!(config.contrib_magnitude_quantile, None);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn test_unknown_key_rejected() {
        let result: Result<SeqletCutoffConfig, _> = serde_json::from_value(json!({
            "modisco-h5": "m.json",
            "patterns": "all",
            "background-probs": "hg38",
            "trim-treshold": 0.5
        }));
        assert!(result.is_err());
    }

    #[rstest]
    fn test_bad_quantile() {
        let config = cutoff_config(json!({"seq-match-quantile": 1.5}));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuantile { value, .. }) if value == 1.5
        ));
    }

    #[rstest]
    fn test_modisco_contrib_unsupported() {
        let config = cutoff_config(json!({"modisco-contrib-h5": "contrib.h5"}));
        assert!(matches!(config.validate(), Err(ConfigError::Unsupported(_))));
    }

    #[rstest]
    #[case(json!("hg38"), true)]
    #[case(json!("sacCer3"), true)]
    #[case(json!([0.25, 0.25, 0.25, 0.25]), true)]
    #[case(json!([0.3, 0.2, 0.2, 0.2]), false)]
    #[case(json!([1.2, -0.2, 0.0, 0.0]), false)]
    #[case(json!("hg19"), false)]
    fn test_background(#[case] background: serde_json::Value, #[case] ok: bool) {
        let probs: BackgroundProbs = serde_json::from_value(background).unwrap();
        assert_eq!(probs.resolve().is_ok(), ok);
    }

    #[rstest]
    fn test_all_builtin_backgrounds_resolve() {
        for genome in ["danRer11", "hg38", "mm10", "dm6", "sacCer3"] {
            assert!(BackgroundProbs::Genome(genome.to_string()).resolve().is_ok());
        }
    }

    #[rstest]
    fn test_catch_all_and_explicit_is_ambiguous() {
        let config = cutoff_config(json!({"patterns": [
            {"metacluster-name": "pos_patterns", "pattern-names": "all"},
            {"metacluster-name": "neg_patterns", "pattern-name": "pattern_0"},
            {"metacluster-name": "pos_patterns", "pattern-name": "pattern_1", "short-name": "Sox"}
        ]}));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PatternSpecAmbiguous(m)) if m == "pos_patterns"
        ));
    }

    #[rstest]
    fn test_explicit_refs_and_short_names() {
        let spec: PatternSpec = serde_json::from_value(json!({
            "metacluster-name": "pos_patterns",
            "pattern-names": ["pattern_0", "pattern_3"],
            "short-names": ["Oct4", "Klf"]
        }))
        .unwrap();
        assert!(spec.validate().is_ok());
        let short: Vec<String> = spec.explicit_refs().into_iter().map(|r| r.short_name).collect();
        assert_eq!(short, vec!["Oct4", "Klf"]);

        let spec: PatternSpec = serde_json::from_value(json!({
            "metacluster-name": "neg_patterns",
            "pattern-name": "pattern_2"
        }))
        .unwrap();
        assert_eq!(spec.explicit_refs()[0].short_name, "neg_patterns_pattern_2");
    }

    #[rstest]
    #[case(json!({"metacluster-name": "m"}))]
    #[case(json!({"metacluster-name": "m", "pattern-name": "p", "pattern-names": ["q"]}))]
    #[case(json!({"metacluster-name": "m", "pattern-names": ["p", "q"], "short-names": ["a"]}))]
    #[case(json!({"metacluster-name": "m", "pattern-names": "some"}))]
    fn test_invalid_specs(#[case] spec: serde_json::Value) {
        let spec: PatternSpec = serde_json::from_value(spec).unwrap();
        assert!(matches!(spec.validate(), Err(ConfigError::InvalidPatternSpec { .. })));
    }

    fn scan_config(extra: serde_json::Value) -> MotifScanConfig {
        let mut base = json!({
            "scan-settings": {
                "scan-contrib-h5": "contrib.jsonl",
                "hits-tsv": "hits.tsv",
                "num-threads": 4
            }
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[rstest]
    fn test_scan_cutoff_sources() {
        let settings = serde_json::to_value(cutoff_config(json!({}))).unwrap();

        let both = scan_config(json!({
            "seqlet-cutoff-settings": settings.clone(),
            "seqlet-cutoff-json": "cutoffs.json"
        }));
        assert!(matches!(both.validate(), Err(ConfigError::BothCutoffSources)));

        let neither = scan_config(json!({}));
        assert!(matches!(neither.validate(), Err(ConfigError::NoCutoffSource)));

        let nested = scan_config(json!({"seqlet-cutoff-settings": settings}));
        assert!(nested.validate().is_ok());
    }

    #[rstest]
    fn test_scan_needs_three_threads() {
        let mut config = scan_config(json!({"seqlet-cutoff-json": "cutoffs.json"}));
        config.scan_settings.num_threads = 2;
        assert!(matches!(config.validate(), Err(ConfigError::TooFewThreads(2))));
        config.scan_settings.num_threads = 3;
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn test_unknown_verbosity() {
        let config = scan_config(json!({"seqlet-cutoff-json": "c.json", "verbosity": "LOUD"}));
        assert!(matches!(config.validate(), Err(ConfigError::Region(_))));
    }
}
