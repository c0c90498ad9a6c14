//! unifuzz: uniform fuzzy hashing from the command line
//!
//! Commands:
//!   hash <file>...            - print the fuzzy hash of each file
//!   compare <a> <b>           - score two hashes (or two files with --files)
//!   scan <hash> <file>...     - find files similar to a hash
//!   parse <hash>              - validate a hash and print its blocks
//!   config show               - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use unifuzz_core::UnifuzzConfig;
use unifuzz_hash::{
    check_factor, compare_many, compare_similarity, compute, compute_file, parse_hash, SimilarityType,
    UniformFuzzyHash,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "unifuzz",
    version,
    about = "Uniform fuzzy hashing",
    long_about = "unifuzz: content-defined fuzzy hashes and similarity scores"
)]
struct Cli {
    /// Path to unifuzz.toml configuration file
    #[arg(long, short = 'c', env = "UNIFUZZ_CONFIG", default_value = "unifuzz.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "UNIFUZZ_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "UNIFUZZ_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the fuzzy hash of each file
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Chunking factor (odd, >= 3)
        #[arg(long, short = 'f', env = "UNIFUZZ_FACTOR")]
        factor: Option<i64>,
        /// Print one JSON object per file
        #[arg(long)]
        json: bool,
    },

    /// Score two fuzzy hashes
    Compare {
        /// First hash (or file with --files)
        a: String,
        /// Second hash (or file with --files)
        b: String,
        /// Similarity mode
        #[arg(long, short = 'm')]
        mode: Option<String>,
        /// Treat both arguments as files and hash them first
        #[arg(long)]
        files: bool,
        /// Chunking factor used with --files
        #[arg(long, short = 'f', env = "UNIFUZZ_FACTOR")]
        factor: Option<i64>,
    },

    /// Hash files with the factor of HASH and report the similar ones
    Scan {
        /// Reference hash
        hash: String,
        /// Files to scan
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Similarity mode
        #[arg(long, short = 'm')]
        mode: Option<String>,
        /// Minimum score to report
        #[arg(long, short = 't')]
        threshold: Option<f64>,
    },

    /// Validate a hash and print its block table
    Parse {
        hash: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = UnifuzzConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    init_logging(&cli, &config);
    debug!(config = %cli.config.display(), "unifuzz starting");

    match cli.command {
        Commands::Hash { files, factor, json } => {
            cmd_hash(&files, resolve_factor(&config, factor)?, json)
        }
        Commands::Compare { a, b, mode, files, factor } => {
            let mode = resolve_mode(&config, mode.as_deref())?;
            let file_factor = if files { Some(resolve_factor(&config, factor)?) } else { None };
            cmd_compare(&a, &b, mode, file_factor)
        }
        Commands::Scan { hash, files, mode, threshold } => {
            let mode = resolve_mode(&config, mode.as_deref())?;
            let threshold = threshold.unwrap_or(config.compare.threshold);
            cmd_scan(&hash, &files, mode, threshold)
        }
        Commands::Parse { hash } => cmd_parse(&hash),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(cli: &Cli, config: &UnifuzzConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = match &cli.log_format {
        Some(LogFormat::Json) => true,
        Some(LogFormat::Text) => false,
        None => config.log.format == "json",
    };

    // stdout carries hashes and scores; logs go to stderr
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// ── Setting resolution: flag/env > config file > default ──────────────────────

fn resolve_factor(config: &UnifuzzConfig, flag: Option<i64>) -> Result<i64> {
    let factor = flag.unwrap_or(config.hash.factor);
    check_factor(factor).context("invalid chunking factor")?;
    Ok(factor)
}

fn resolve_mode(config: &UnifuzzConfig, flag: Option<&str>) -> Result<SimilarityType> {
    flag.unwrap_or(&config.compare.mode)
        .parse()
        .context("invalid similarity mode")
}

fn parse_hash_arg(hash: &str) -> Result<UniformFuzzyHash> {
    parse_hash(hash).map_err(|e| {
        let context = if e.is_parse_error() {
            format!("malformed hash {hash:?} (expected factor:hash/size-hash/size-...)")
        } else {
            format!("unusable hash {hash:?}")
        };
        anyhow::Error::new(e).context(context)
    })
}

// ── `unifuzz hash` ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HashReport<'a> {
    path: &'a Path,
    size: u64,
    blake3: String,
    fuzzy: UniformFuzzyHash,
}

fn cmd_hash(files: &[PathBuf], factor: i64, json: bool) -> Result<()> {
    for path in files {
        let data = std::fs::read(path)
            .with_context(|| format!("reading file for hashing: {}", path.display()))?;
        let fuzzy = compute(&data, factor)
            .with_context(|| format!("hashing {}", path.display()))?;

        if json {
            let report = HashReport {
                path,
                size: data.len() as u64,
                blake3: blake3::hash(&data).to_hex().to_string(),
                fuzzy,
            };
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}  {}", fuzzy, path.display());
        }
    }
    Ok(())
}

// ── `unifuzz compare` ─────────────────────────────────────────────────────────

fn cmd_compare(a: &str, b: &str, mode: SimilarityType, file_factor: Option<i64>) -> Result<()> {
    let (ha, hb) = match file_factor {
        Some(factor) => {
            let load = |p: &str| {
                compute_file(Path::new(p), factor)
                    .with_context(|| format!("hashing {p}"))
            };
            (load(a)?, load(b)?)
        }
        None => (parse_hash_arg(a)?, parse_hash_arg(b)?),
    };

    let score = compare_similarity(&ha, &hb, mode).context("comparing hashes")?;
    info!(%mode, score, "compared");
    println!("{score:.6}");
    Ok(())
}

// ── `unifuzz scan` ────────────────────────────────────────────────────────────

fn cmd_scan(hash: &str, files: &[PathBuf], mode: SimilarityType, threshold: f64) -> Result<()> {
    let needle = parse_hash_arg(hash)?;
    let factor = i64::from(needle.factor());

    let hashed: Vec<(&PathBuf, unifuzz_hash::UfhResult<UniformFuzzyHash>)> = files
        .par_iter()
        .map(|path| (path, compute_file(path, factor)))
        .collect();

    let mut paths = Vec::with_capacity(hashed.len());
    let mut candidates = Vec::with_capacity(hashed.len());
    for (path, result) in hashed {
        match result {
            Ok(candidate) => {
                paths.push(path);
                candidates.push(candidate);
            }
            Err(e) => warn!(path = %path.display(), "skipping: {e}"),
        }
    }

    let mut matches: Vec<(f64, &PathBuf)> = compare_many(&needle, &candidates, mode)
        .into_iter()
        .zip(paths)
        .filter_map(|(score, path)| match score {
            Ok(score) if score >= threshold => Some((score, path)),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), "skipping: {e}");
                None
            }
        })
        .collect();
    matches.sort_by(|a, b| b.0.total_cmp(&a.0));

    info!(scanned = files.len(), matched = matches.len(), %mode, threshold, "scan complete");
    for (score, path) in matches {
        println!("{score:.6}  {}", path.display());
    }
    Ok(())
}

// ── `unifuzz parse` ───────────────────────────────────────────────────────────

fn cmd_parse(hash: &str) -> Result<()> {
    let parsed = parse_hash_arg(hash)?;

    println!("factor:    {}", parsed.factor());
    println!("data size: {}", fmt_bytes(parsed.data_size()));
    println!("blocks:    {}", parsed.blocks().len());
    println!();
    println!("{:>6}  {:>12}  {:>12}  {:>10}  {}", "#", "start", "end", "size", "hash");
    for (i, block) in parsed.blocks().iter().enumerate() {
        println!(
            "{:>6}  {:>12}  {:>12}  {:>10}  {}",
            i,
            block.start(),
            block.end(),
            block.size(),
            block.hash()
        );
    }
    Ok(())
}

// ── `unifuzz config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &UnifuzzConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn factor_flag_overrides_config() {
        let config = UnifuzzConfig::default();
        assert_eq!(resolve_factor(&config, None).unwrap(), 251);
        assert_eq!(resolve_factor(&config, Some(7)).unwrap(), 7);
        assert!(resolve_factor(&config, Some(8)).is_err());
    }

    #[test]
    fn mode_falls_back_to_config() {
        let mut config = UnifuzzConfig::default();
        assert_eq!(resolve_mode(&config, None).unwrap(), SimilarityType::Maximum);
        assert_eq!(resolve_mode(&config, Some("min")).unwrap(), SimilarityType::Minimum);

        config.compare.mode = "bogus".into();
        assert!(resolve_mode(&config, None).is_err());
    }

    #[test]
    fn parses_scan_arguments() {
        let cli = Cli::try_parse_from(["unifuzz", "scan", "3:a/1", "x.bin", "y.bin", "-t", "0.4"]).unwrap();
        match cli.command {
            Commands::Scan { hash, files, threshold, mode } => {
                assert_eq!(hash, "3:a/1");
                assert_eq!(files.len(), 2);
                assert_eq!(threshold, Some(0.4));
                assert!(mode.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn compare_files_scores_identical_files_as_one() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"identical content in two files").unwrap();
        std::fs::write(&b, b"identical content in two files").unwrap();

        let ha = compute_file(&a, 5).unwrap();
        let hb = compute_file(&b, 5).unwrap();
        assert_eq!(compare_similarity(&ha, &hb, SimilarityType::Minimum).unwrap(), 1.0);
    }

    #[test]
    fn hash_argument_errors_name_the_problem() {
        let malformed = parse_hash_arg("3:a/1-").unwrap_err();
        assert!(malformed.to_string().starts_with("malformed hash"));

        let bad_factor = parse_hash_arg("4:a/1").unwrap_err();
        assert!(bad_factor.to_string().starts_with("unusable hash"));
        assert!(bad_factor.root_cause().to_string().contains("factor"));

        assert_eq!(parse_hash_arg("3:a/1-b/2").unwrap().data_size(), 3);
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
