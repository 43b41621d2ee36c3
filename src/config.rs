//! Ingest driver configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::INGEST_SETTINGS_FILE;

/// Configuration for an ingest run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory holding one play-by-play file per game
    pub input_dir: PathBuf,
    /// SQLite database the derived events are written to
    pub db_path: PathBuf,
    /// File extension of event files (without the dot)
    pub extension: String,
    /// Worker threads (0 = rayon default)
    pub parallel: usize,
    /// Suppress the end-of-run report
    pub quiet: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("output/pbp_data"),
            db_path: PathBuf::from("pbp.db"),
            extension: "json".to_string(),
            parallel: 0,
            quiet: false,
        }
    }
}

impl IngestConfig {
    /// Load configuration from a TOML settings file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
        Self::from_toml(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
    }

    /// Parse configuration from TOML content; missing keys keep their defaults
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load the default settings file, or built-in defaults if it is absent
    pub fn from_config_files() -> Self {
        Self::from_file(INGEST_SETTINGS_FILE).unwrap_or_default()
    }

    /// Parse configuration from command line arguments
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_arg_list(&args)
    }

    /// Build configuration from an argument list (first entry is the program name)
    pub fn from_arg_list(args: &[String]) -> Self {
        let mut config = Self::from_config_files();

        // Explicit settings file replaces the defaults before overrides apply
        if let Some(pos) = args.iter().position(|a| a == "--settings") {
            if let Some(path) = args.get(pos + 1) {
                match Self::from_file(path) {
                    Ok(loaded) => config = loaded,
                    Err(e) => eprintln!("Warning: {}", e),
                }
            }
        }

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--settings" => {
                    i += 1;
                }
                "--input" => {
                    if i + 1 < args.len() {
                        config.input_dir = PathBuf::from(&args[i + 1]);
                        i += 1;
                    }
                }
                "--db" => {
                    if i + 1 < args.len() {
                        config.db_path = PathBuf::from(&args[i + 1]);
                        i += 1;
                    }
                }
                "--ext" => {
                    if i + 1 < args.len() {
                        config.extension = args[i + 1].trim_start_matches('.').to_string();
                        i += 1;
                    }
                }
                "--parallel" => {
                    if i + 1 < args.len() {
                        config.parallel = args[i + 1].parse().unwrap_or(0);
                        i += 1;
                    }
                }
                "--quiet" | "-q" => {
                    config.quiet = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        config
    }
}

fn print_help() {
    println!(
        r#"Play-by-play ingest - derive game context timelines from provider event files

USAGE:
    cargo run -- [OPTIONS]

OPTIONS:
    --settings <FILE>   Load settings from TOML file (CLI args override file settings)
    --input <DIR>       Directory of event files (default: output/pbp_data)
    --db <FILE>         SQLite database to write to (default: pbp.db)
    --ext <EXT>         Event file extension (default: json)
    --parallel <N>      Worker threads (default: 0 = one per core)
    --quiet, -q         Suppress the end-of-run report
    --help, -h          Show this help

SETTINGS FILE FORMAT (TOML):
    input_dir = "output/pbp_data"
    db_path = "pbp.db"
    parallel = 8

LOGGING:
    Set RUST_LOG (e.g. RUST_LOG=pbp_engine=debug) to control log output.
"#
    );
}
