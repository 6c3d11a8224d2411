//! Score command implementation

use crate::error::CliError;
use crate::input::{resolve_patterns, FileReader};
use crate::output::{create_formatter, format_from_config, Comparison, OutputFormat, OutputFormatter};
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use clap::Args;
use mteval_core::metrics::Smoothing;
use mteval_core::significance::SEED_ENV_VAR;
use mteval_core::{
    CorpusStatistics, EvalConfig, FormatOptions, MetricKind, PairedMethod, Score, Scorer, Seed,
    SignatureMode, TokenizerKind,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Arguments for the score command
#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Reference files, one per reference stream (supports glob)
    #[arg(short, long, value_name = "FILE/PATTERN", required = true, num_args = 1..)]
    pub reference: Vec<String>,

    /// System output files (supports glob); the first one is the baseline of paired tests
    #[arg(short, long, value_name = "FILE/PATTERN", required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Metrics to compute, comma separated (default: from the configuration)
    #[arg(short, long, value_name = "METRIC", value_delimiter = ',')]
    pub metrics: Vec<MetricKind>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Lowercase inputs for BLEU, chrF and the class-based metrics
    #[arg(short, long)]
    pub lowercase: bool,

    /// Also score every segment on its own
    #[arg(long)]
    pub sentence_level: bool,

    #[command(flatten, next_help_heading = "BLEU")]
    pub bleu: BleuArgs,

    #[command(flatten, next_help_heading = "chrF")]
    pub chrf: ChrfArgs,

    #[command(flatten, next_help_heading = "TER")]
    pub ter: TerArgs,

    #[command(flatten, next_help_heading = "MacroF / MicroF")]
    pub classeval: ClassEvalArgs,

    #[command(flatten, next_help_heading = "Significance")]
    pub significance: SignificanceArgs,

    #[command(flatten, next_help_heading = "Output")]
    pub format: FormatArgs,

    /// Number of worker threads for resampling (default: all cores)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Suppress progress output and logging
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// BLEU options
#[derive(Debug, Default, Args)]
pub struct BleuArgs {
    /// Tokenizer: none, 13a, intl or char
    #[arg(long, value_name = "TOKENIZER")]
    pub tokenize: Option<TokenizerKind>,

    /// Smoothing method
    #[arg(long, value_name = "METHOD", value_parser = clap::builder::PossibleValuesParser::new(Smoothing::NAMES))]
    pub smooth_method: Option<String>,

    /// Value for floor and add-k smoothing
    #[arg(long, value_name = "VALUE")]
    pub smooth_value: Option<f64>,

    /// Highest n-gram order
    #[arg(long, value_name = "N")]
    pub max_ngram_order: Option<usize>,

    /// Use the effective order for corpus scores
    #[arg(long)]
    pub effective_order: bool,

    /// Do not warn about tokenized input
    #[arg(long)]
    pub force: bool,
}

/// chrF options
#[derive(Debug, Default, Args)]
pub struct ChrfArgs {
    /// Character n-gram order
    #[arg(long, value_name = "N")]
    pub chrf_char_order: Option<usize>,

    /// Word n-gram order (2 gives chrF++)
    #[arg(long, value_name = "N")]
    pub chrf_word_order: Option<usize>,

    /// Recall weight β
    #[arg(long, value_name = "BETA")]
    pub chrf_beta: Option<f64>,

    /// Keep whitespace in character n-grams
    #[arg(long)]
    pub chrf_whitespace: bool,

    /// Epsilon smoothing for orders without n-grams
    #[arg(long, value_name = "BOOL")]
    pub chrf_eps_smoothing: Option<bool>,
}

/// TER options
#[derive(Debug, Default, Args)]
pub struct TerArgs {
    /// Apply tercom punctuation normalization
    #[arg(long)]
    pub ter_normalized: bool,

    /// Remove punctuation
    #[arg(long)]
    pub ter_no_punct: bool,

    /// Split CJK characters
    #[arg(long)]
    pub ter_asian_support: bool,

    /// Keep the original casing
    #[arg(long)]
    pub ter_case_sensitive: bool,
}

/// MacroF / MicroF options
#[derive(Debug, Default, Args)]
pub struct ClassEvalArgs {
    /// F-measure β
    #[arg(long, value_name = "BETA")]
    pub f_beta: Option<f64>,

    /// Added to reference counts when micro-averaging
    #[arg(long, value_name = "VALUE")]
    pub f_smooth_value: Option<f64>,
}

/// Significance options
#[derive(Debug, Default, Args)]
pub struct SignificanceArgs {
    /// Attach a bootstrap 95% confidence interval to every score
    #[arg(long)]
    pub confidence: bool,

    /// Paired bootstrap test of every system against the first
    #[arg(long, conflicts_with = "paired_ar")]
    pub paired_bs: bool,

    /// Paired approximate randomization test of every system against the first
    #[arg(long)]
    pub paired_ar: bool,

    /// Resamples or trials for the significance tests
    #[arg(long, value_name = "N")]
    pub n_samples: Option<usize>,

    /// RNG seed, or "none" for a random seed
    #[arg(long, value_name = "SEED", env = SEED_ENV_VAR)]
    pub seed: Option<Seed>,
}

/// Output options
#[derive(Debug, Default, Args)]
pub struct FormatArgs {
    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Decimal places
    #[arg(short, long, value_name = "N")]
    pub width: Option<usize>,

    /// Print only the numbers
    #[arg(long)]
    pub score_only: bool,

    /// Show the full signature next to each score
    #[arg(long, conflicts_with = "short")]
    pub signature: bool,

    /// Show the abbreviated signature next to each score
    #[arg(long)]
    pub short: bool,
}

/// A system output read into memory
struct System {
    label: String,
    lines: Vec<String>,
}

impl ScoreArgs {
    /// Execute the score command
    pub fn execute(&self) -> Result<()> {
        self.init_logging()?;

        log::info!("Starting evaluation");
        log::debug!("Arguments: {:?}", self);

        let config = self.load_config()?;
        let format = match self.format.format {
            Some(format) => format,
            None => format_from_config(&config.output.format)?,
        };
        let options = FormatOptions {
            width: config.output.width,
            score_only: config.output.score_only,
            signature: config.output.signature,
        };
        self.configure_threads();

        let paired = self.paired_method();
        let references = self.read_references()?;
        let systems = self.read_systems()?;
        if paired.is_some() && systems.len() < 2 {
            return Err(CliError::InvalidArguments(
                "paired significance tests need at least two system outputs".to_string(),
            )
            .into());
        }

        let scorers = config
            .scorers()
            .context("Invalid metric configuration")?;
        log::info!(
            "Scoring {} system(s) against {} reference stream(s) with {}",
            systems.len(),
            references.len(),
            scorers
                .iter()
                .map(Scorer::name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let writer: Box<dyn Write + Send + Sync> = match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
                format!("Failed to create output file: {}", path.display())
            })?)),
            None => Box::new(io::stdout()),
        };
        let mut formatter = create_formatter(format, options, systems.len() > 1, writer);

        let comparisons = if paired.is_some() {
            (systems.len() - 1) * scorers.len()
        } else {
            0
        };
        let mut progress = ProgressReporter::new(self.quiet);
        progress.init_steps((systems.len() * scorers.len() + comparisons) as u64);

        let mut rng = config.significance.seed.rng();
        let mut cached: Vec<Vec<CorpusStatistics>> = Vec::with_capacity(systems.len());

        for system in &systems {
            let mut scores = Vec::with_capacity(scorers.len());
            let mut statistics = Vec::with_capacity(scorers.len());

            for scorer in &scorers {
                let step = format!("{} {}", scorer.name(), system.label);
                progress.started(&step);

                let stats = scorer
                    .corpus_statistics(system.lines.as_slice(), references.as_slice())
                    .with_context(|| format!("Failed to score {}", system.label))?;
                let score = if self.significance.confidence {
                    scorer.bootstrap(&stats, config.significance.bootstrap_samples, &mut rng)?
                } else {
                    scorer.score(&stats)?
                };
                log::info!("{}: {} = {:.4}", system.label, score.name(), score.value());

                scores.push(score);
                statistics.push(stats);
                progress.step_completed(&step);
            }

            formatter.format_system(&system.label, &scores)?;

            if self.sentence_level {
                self.write_segments(&scorers, system, &references, formatter.as_mut())?;
            }
            cached.push(statistics);
        }

        if let Some(method) = paired {
            let baseline = &systems[0];
            for (i, system) in systems.iter().enumerate().skip(1) {
                for (m, scorer) in scorers.iter().enumerate() {
                    let step = format!("{} {} vs. {}", scorer.name(), system.label, baseline.label);
                    progress.started(&step);

                    let result = match method {
                        PairedMethod::Bootstrap => scorer.paired_bootstrap(
                            &cached[0][m],
                            &cached[i][m],
                            config.significance.bootstrap_samples,
                            &mut rng,
                        )?,
                        PairedMethod::ApproximateRandomization => scorer.approximate_randomization(
                            &cached[0][m],
                            &cached[i][m],
                            config.significance.ar_trials,
                            &mut rng,
                        )?,
                    };

                    formatter.format_comparison(&Comparison {
                        metric: scorer.name(),
                        baseline: baseline.label.clone(),
                        system: system.label.clone(),
                        result,
                    })?;
                    progress.step_completed(&step);
                }
            }
        }

        progress.finish();
        formatter.finish()?;

        log::info!("Evaluation complete");
        Ok(())
    }

    /// The configuration file (or the defaults) with command-line overrides applied
    pub fn load_config(&self) -> Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
            None => EvalConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut EvalConfig) {
        if !self.metrics.is_empty() {
            config.metrics = self.metrics.clone();
        }

        if self.lowercase {
            config.bleu.lowercase = true;
            config.chrf.lowercase = true;
            config.classeval.lowercase = true;
        }

        let bleu = &self.bleu;
        if let Some(kind) = bleu.tokenize {
            config.bleu.tokenize = kind;
        }
        if let Some(method) = &bleu.smooth_method {
            config.bleu.smooth_method = method.clone();
        }
        if bleu.smooth_value.is_some() {
            config.bleu.smooth_value = bleu.smooth_value;
        }
        if let Some(order) = bleu.max_ngram_order {
            config.bleu.max_ngram_order = order;
        }
        config.bleu.effective_order |= bleu.effective_order;
        config.bleu.force |= bleu.force;

        let chrf = &self.chrf;
        if let Some(order) = chrf.chrf_char_order {
            config.chrf.char_order = order;
        }
        if let Some(order) = chrf.chrf_word_order {
            config.chrf.word_order = order;
        }
        if let Some(beta) = chrf.chrf_beta {
            config.chrf.beta = beta;
        }
        if let Some(eps) = chrf.chrf_eps_smoothing {
            config.chrf.eps_smoothing = eps;
        }
        config.chrf.whitespace |= chrf.chrf_whitespace;

        config.ter.normalized |= self.ter.ter_normalized;
        config.ter.no_punct |= self.ter.ter_no_punct;
        config.ter.asian_support |= self.ter.ter_asian_support;
        config.ter.case_sensitive |= self.ter.ter_case_sensitive;

        if let Some(beta) = self.classeval.f_beta {
            config.classeval.beta = beta;
        }
        if let Some(value) = self.classeval.f_smooth_value {
            config.classeval.smooth_value = value;
        }

        let significance = &self.significance;
        if let Some(n) = significance.n_samples {
            config.significance.bootstrap_samples = n;
            config.significance.ar_trials = n;
        }
        if let Some(seed) = significance.seed {
            config.significance.seed = seed;
        }

        let format = &self.format;
        if let Some(width) = format.width {
            config.output.width = width;
        }
        config.output.score_only |= format.score_only;
        if format.signature {
            config.output.signature = SignatureMode::Full;
        } else if format.short {
            config.output.signature = SignatureMode::Short;
        }
    }

    fn paired_method(&self) -> Option<PairedMethod> {
        if self.significance.paired_bs {
            Some(PairedMethod::Bootstrap)
        } else if self.significance.paired_ar {
            Some(PairedMethod::ApproximateRandomization)
        } else {
            None
        }
    }

    fn read_references(&self) -> Result<Vec<Vec<String>>> {
        resolve_patterns(&self.reference)?
            .iter()
            .map(|path| FileReader::read_lines(path))
            .collect()
    }

    fn read_systems(&self) -> Result<Vec<System>> {
        resolve_patterns(&self.input)?
            .iter()
            .map(|path| {
                Ok(System {
                    label: path.display().to_string(),
                    lines: FileReader::read_lines(path)?,
                })
            })
            .collect()
    }

    fn write_segments(
        &self,
        scorers: &[Scorer],
        system: &System,
        references: &[Vec<String>],
        formatter: &mut dyn OutputFormatter,
    ) -> Result<()> {
        let per_metric = scorers
            .iter()
            .map(|scorer| scorer.sentence_scores(system.lines.as_slice(), references))
            .collect::<mteval_core::Result<Vec<Vec<Score>>>>()
            .with_context(|| format!("Failed to score segments of {}", system.label))?;

        for segment in 0..system.lines.len() {
            let row: Vec<Score> = per_metric
                .iter()
                .map(|scores| scores[segment].clone())
                .collect();
            formatter.format_segment(&system.label, segment + 1, &row)?;
        }
        Ok(())
    }

    /// Size the global rayon pool used for resampling
    fn configure_threads(&self) {
        let threads = self.threads.unwrap_or_else(num_cpus::get);
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            log::debug!("Global thread pool already initialized: {e}");
            return;
        }
        log::debug!("Using {threads} worker threads");
    }

    /// Initialize logging based on verbosity level
    fn init_logging(&self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        if !self.quiet {
            // A logger may already be installed when running inside tests
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(log_level),
            )
            .try_init();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ScoreArgs,
    }

    fn parse(extra: &[&str]) -> ScoreArgs {
        let mut argv = vec!["mteval", "-r", "ref.txt", "-i", "sys.txt"];
        argv.extend_from_slice(extra);
        TestCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_defaults_without_config() {
        let config = parse(&[]).load_config().unwrap();
        assert_eq!(config, EvalConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        let args = parse(&[
            "-m",
            "chrf,ter",
            "-l",
            "--tokenize",
            "intl",
            "--smooth-method",
            "floor",
            "--smooth-value",
            "0.01",
            "--chrf-word-order",
            "2",
            "--chrf-eps-smoothing",
            "false",
            "--ter-no-punct",
            "--n-samples",
            "50",
            "--seed",
            "none",
            "--short",
            "-w",
            "4",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.metrics, vec![MetricKind::Chrf, MetricKind::Ter]);
        assert!(config.bleu.lowercase && config.chrf.lowercase && config.classeval.lowercase);
        assert_eq!(config.bleu.tokenize, TokenizerKind::Intl);
        assert_eq!(config.bleu.smooth_method, "floor");
        assert_eq!(config.bleu.smooth_value, Some(0.01));
        assert_eq!(config.chrf.word_order, 2);
        assert!(!config.chrf.eps_smoothing);
        assert!(config.ter.no_punct);
        assert_eq!(config.significance.bootstrap_samples, 50);
        assert_eq!(config.significance.ar_trials, 50);
        assert_eq!(config.significance.seed, Seed::Random);
        assert_eq!(config.output.signature, SignatureMode::Short);
        assert_eq!(config.output.width, 4);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mteval.toml");
        fs::write(&path, "metrics = [\"ter\"]\n\n[bleu]\nmax_ngram_order = 3\n").unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let config = parse(&["-c", &path_arg, "--max-ngram-order", "2"])
            .load_config()
            .unwrap();
        assert_eq!(config.metrics, vec![MetricKind::Ter]);
        assert_eq!(config.bleu.max_ngram_order, 2);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let err = parse(&["--chrf-beta", "0"]).load_config().unwrap_err();
        assert!(format!("{err:#}").contains("Invalid configuration"));
    }

    #[test]
    fn test_paired_flags_conflict() {
        let argv = ["mteval", "-r", "r", "-i", "a", "b", "--paired-bs", "--paired-ar"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_paired_method_selection() {
        assert_eq!(parse(&[]).paired_method(), None);
        assert_eq!(
            parse(&["--paired-bs"]).paired_method(),
            Some(PairedMethod::Bootstrap)
        );
        assert_eq!(
            parse(&["--paired-ar"]).paired_method(),
            Some(PairedMethod::ApproximateRandomization)
        );
    }

    #[test]
    fn test_execute_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("ref.txt");
        let system = dir.path().join("sys.txt");
        let output = dir.path().join("scores.json");
        fs::write(&reference, "The dog bit the man.\nIt was not unexpected.\n").unwrap();
        fs::write(&system, "The dog bit the man.\nIt wasn't surprising.\n").unwrap();

        let argv = [
            "mteval".to_string(),
            "-r".to_string(),
            reference.to_string_lossy().into_owned(),
            "-i".to_string(),
            system.to_string_lossy().into_owned(),
            "-m".to_string(),
            "bleu,chrf".to_string(),
            "-f".to_string(),
            "json".to_string(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "-q".to_string(),
        ];
        TestCli::try_parse_from(argv).unwrap().args.execute().unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let scores = json["systems"][0]["scores"].as_array().unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0]["name"], "BLEU");
        assert_eq!(scores[1]["name"], "chrF2");
    }
}
