//! TOML configuration of an evaluation run
//!
//! Every section is optional and falls back to the engine defaults. Sections
//! hold plain values; [`EvalConfig::scorer`] turns them into validated
//! engines, so a bad value surfaces as the same [`MetricError`] the builders
//! report.

use crate::error::{MetricError, Result};
use crate::metrics::bleu::{DEFAULT_MAX_NGRAM_ORDER, Smoothing};
use crate::metrics::chrf::{DEFAULT_BETA, DEFAULT_CHAR_ORDER, DEFAULT_WORD_ORDER};
use crate::metrics::clseval::{DEFAULT_F_BETA, DEFAULT_SMOOTH_VALUE};
use crate::metrics::{AverageType, BleuConfig, ChrfConfig, ClassEvalConfig, TerConfig};
use crate::metrics::{Bleu, Chrf, ClassEval, Ter};
use crate::score::SignatureMode;
use crate::scorer::{MetricKind, Scorer};
use crate::significance::{Seed, DEFAULT_AR_TRIALS, DEFAULT_BOOTSTRAP_SAMPLES};
use crate::tokenizer::{TercomOptions, TokenizerKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of an evaluation run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Metrics computed when none are requested explicitly
    pub metrics: Vec<MetricKind>,

    /// BLEU settings
    pub bleu: BleuSection,

    /// chrF settings
    pub chrf: ChrfSection,

    /// TER settings
    pub ter: TercomOptions,

    /// MacroF / MicroF settings
    pub classeval: ClassEvalSection,

    /// Resampling settings
    pub significance: SignificanceSection,

    /// Presentation settings
    pub output: OutputSection,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            metrics: vec![MetricKind::Bleu],
            bleu: BleuSection::default(),
            chrf: ChrfSection::default(),
            ter: TercomOptions::default(),
            classeval: ClassEvalSection::default(),
            significance: SignificanceSection::default(),
            output: OutputSection::default(),
        }
    }
}

/// `[bleu]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BleuSection {
    /// Tokenizer name
    pub tokenize: TokenizerKind,
    /// Lowercase inputs
    pub lowercase: bool,
    /// Highest n-gram order
    pub max_ngram_order: usize,
    /// One of none, floor, add-k, exp
    pub smooth_method: String,
    /// Value for floor and add-k; their defaults apply when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth_value: Option<f64>,
    /// Use the effective order for corpus scores
    pub effective_order: bool,
    /// Suppress the tokenized-input warning
    pub force: bool,
}

impl Default for BleuSection {
    fn default() -> Self {
        Self {
            tokenize: TokenizerKind::Mteval13a,
            lowercase: false,
            max_ngram_order: DEFAULT_MAX_NGRAM_ORDER,
            smooth_method: "exp".to_string(),
            smooth_value: None,
            effective_order: false,
            force: false,
        }
    }
}

impl BleuSection {
    /// Engine configuration for this section
    pub fn to_config(&self) -> Result<BleuConfig> {
        Ok(BleuConfig {
            tokenizer: self.tokenize,
            lowercase: self.lowercase,
            max_ngram_order: self.max_ngram_order,
            smoothing: Smoothing::from_parts(&self.smooth_method, self.smooth_value)?,
            effective_order: self.effective_order,
            force: self.force,
            test_set: None,
        })
    }
}

/// `[chrf]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChrfSection {
    /// Character n-gram order
    pub char_order: usize,
    /// Word n-gram order (2 for chrF++)
    pub word_order: usize,
    /// Recall weight
    pub beta: f64,
    /// Keep whitespace in character n-grams
    pub whitespace: bool,
    /// Lowercase inputs
    pub lowercase: bool,
    /// Epsilon smoothing for orders without n-grams
    pub eps_smoothing: bool,
}

impl Default for ChrfSection {
    fn default() -> Self {
        Self {
            char_order: DEFAULT_CHAR_ORDER,
            word_order: DEFAULT_WORD_ORDER,
            beta: DEFAULT_BETA,
            whitespace: false,
            lowercase: false,
            eps_smoothing: true,
        }
    }
}

impl ChrfSection {
    /// Engine configuration for this section
    pub fn to_config(&self) -> ChrfConfig {
        ChrfConfig {
            char_order: self.char_order,
            word_order: self.word_order,
            beta: self.beta,
            whitespace: self.whitespace,
            lowercase: self.lowercase,
            eps_smoothing: self.eps_smoothing,
            test_set: None,
        }
    }
}

/// `[classeval]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassEvalSection {
    /// F-measure β
    pub beta: f64,
    /// Added to reference counts for micro weights
    pub smooth_value: f64,
    /// Tokenizer name
    pub tokenize: TokenizerKind,
    /// Lowercase inputs
    pub lowercase: bool,
}

impl Default for ClassEvalSection {
    fn default() -> Self {
        Self {
            beta: DEFAULT_F_BETA,
            smooth_value: DEFAULT_SMOOTH_VALUE,
            tokenize: TokenizerKind::Mteval13a,
            lowercase: false,
        }
    }
}

impl ClassEvalSection {
    /// Engine configuration for this section and averaging type
    pub fn to_config(&self, average: AverageType) -> ClassEvalConfig {
        ClassEvalConfig {
            average,
            beta: self.beta,
            smooth_value: self.smooth_value,
            tokenizer: self.tokenize,
            lowercase: self.lowercase,
            force: false,
            test_set: None,
        }
    }
}

/// `[significance]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignificanceSection {
    /// RNG seed, or `"none"` for OS entropy
    pub seed: Seed,
    /// Bootstrap resamples
    pub bootstrap_samples: usize,
    /// Approximate randomization trials
    pub ar_trials: usize,
}

impl Default for SignificanceSection {
    fn default() -> Self {
        Self {
            seed: Seed::default(),
            bootstrap_samples: DEFAULT_BOOTSTRAP_SAMPLES,
            ar_trials: DEFAULT_AR_TRIALS,
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Output format name (text, json or markdown)
    pub format: String,
    /// Decimal places
    pub width: usize,
    /// Print only the numbers
    pub score_only: bool,
    /// Signature rendering: hidden, full or short
    pub signature: SignatureMode,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            width: 2,
            score_only: false,
            signature: SignatureMode::Hidden,
        }
    }
}

impl EvalConfig {
    /// Parses and validates a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Builds every engine once to surface invalid values early
    pub fn validate(&self) -> Result<()> {
        for kind in MetricKind::ALL {
            self.scorer(kind)?;
        }
        if self.significance.bootstrap_samples == 0 || self.significance.ar_trials == 0 {
            return Err(MetricError::InvalidConfig(
                "bootstrap_samples and ar_trials must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Engine for `kind` configured from the matching section
    pub fn scorer(&self, kind: MetricKind) -> Result<Scorer> {
        Ok(match kind {
            MetricKind::Bleu => Scorer::Bleu(Bleu::new(self.bleu.to_config()?)?),
            MetricKind::Chrf => Scorer::Chrf(Chrf::new(self.chrf.to_config())?),
            MetricKind::Ter => Scorer::Ter(Ter::new(TerConfig {
                options: self.ter,
                test_set: None,
            })?),
            MetricKind::MacroF => {
                Scorer::ClassEval(ClassEval::new(self.classeval.to_config(AverageType::Macro))?)
            }
            MetricKind::MicroF => {
                Scorer::ClassEval(ClassEval::new(self.classeval.to_config(AverageType::Micro))?)
            }
        })
    }

    /// Engines for every metric listed in `metrics`
    pub fn scorers(&self) -> Result<Vec<Scorer>> {
        self.metrics.iter().map(|&kind| self.scorer(kind)).collect()
    }
}

/// Commented configuration file listing every option with its default
pub fn default_template() -> String {
    format!(
        r#"# mteval configuration
# Every key is optional; the values below are the defaults.

# Metrics computed when none are given on the command line:
# bleu, chrf, ter, macrof, microf
metrics = ["bleu"]

[bleu]
# Tokenizer: none, 13a, intl, char
tokenize = "13a"
lowercase = false
max_ngram_order = {order}
# Smoothing: none, floor, add-k, exp
smooth_method = "exp"
# smooth_value = 0.1
effective_order = false
# Do not warn about tokenized input
force = false

[chrf]
char_order = {char_order}
# 2 gives chrF++
word_order = {word_order}
beta = {beta:.1}
whitespace = false
lowercase = false
eps_smoothing = true

[ter]
normalized = false
no_punct = false
asian_support = false
case_sensitive = false

[classeval]
beta = {f_beta:.1}
# Added to reference counts when micro-averaging
smooth_value = {smooth:.1}
tokenize = "13a"
lowercase = false

[significance]
# Integer seed, or "none" for a fresh random seed on every run
seed = 12345
bootstrap_samples = {bootstrap}
ar_trials = {ar}

[output]
# text, json or markdown
format = "text"
width = 2
score_only = false
# hidden, full or short
signature = "hidden"
"#,
        order = DEFAULT_MAX_NGRAM_ORDER,
        char_order = DEFAULT_CHAR_ORDER,
        word_order = DEFAULT_WORD_ORDER,
        beta = DEFAULT_BETA,
        f_beta = DEFAULT_F_BETA,
        smooth = DEFAULT_SMOOTH_VALUE,
        bootstrap = DEFAULT_BOOTSTRAP_SAMPLES,
        ar = DEFAULT_AR_TRIALS,
    )
}
