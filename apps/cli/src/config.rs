//! Generator configuration
//!
//! Layered: built-in defaults, an optional TOML file,
//! `.env` and environment variables (`COLLECTION_*`, plus `FHIR_BASE_URL`),
//! then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://hl7int-server.com/server/fhir";
pub const DEFAULT_CONFIG_FILE: &str = "postman-to-curl.toml";

#[derive(Parser, Debug, Default)]
#[command(name = "postman-to-curl")]
#[command(about = "Convert a Postman FHIR collection into curl scripts")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Postman collection (v2 JSON)
    #[arg(long)]
    pub collection: Option<PathBuf>,

    /// JSON document whose `extension` array replaces Patient extensions
    #[arg(long)]
    pub extensions: Option<PathBuf>,

    /// Directory receiving one script per request
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// FHIR server base URL baked into the scripts
    #[arg(long, env = "FHIR_BASE_URL")]
    pub base_url: Option<String>,

    /// Request ids to skip (repeatable)
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

impl Args {
    /// Parse the command line after loading `.env`, so flags backed by
    /// environment variables (`--base-url`) see values from it.
    pub fn parse_with_dotenv() -> Self {
        // a missing .env is fine
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL substituted for `{{host}}` / `{{host_ips}}`
    pub base_url: String,

    pub collection_file: PathBuf,

    pub extension_file: PathBuf,

    /// Scripts go here; `run-all.sh` and `run.sh` go to its parent
    pub output_dir: PathBuf,

    #[serde(default)]
    pub exclude_ids: Vec<String>,

    /// Case-insensitive pattern picking the script id out of a request name
    pub slug_pattern: String,

    /// Removed from a matched id
    pub slug_strip_prefix: String,

    /// Resource type whose extensions get replaced
    pub subject_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            collection_file: PathBuf::from("FHIR-INTERMEDIATE_TESTS_SETUP.postman_collection.json"),
            extension_file: PathBuf::from("new_extension.json"),
            output_dir: PathBuf::from("curl"),
            exclude_ids: vec![
                "req_047".to_string(),
                "req_044".to_string(),
                "req_045".to_string(),
            ],
            slug_pattern: r"U02[_\w]*?T\d+[ab]?".to_string(),
            slug_strip_prefix: "U02_".to_string(),
            subject_type: "Patient".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, file, environment and arguments
    pub fn load(args: &Args) -> Result<Self> {
        // a missing .env is fine
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();

        builder = builder.add_source(
            config::Config::try_from(&Self::default())
                .context("Failed to build default configuration")?,
        );

        builder = match &args.config {
            Some(path) => builder.add_source(config::File::from(path.clone())),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("COLLECTION")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("exclude_ids")
                .try_parsing(true),
        );

        let mut config: Config = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.apply_args(args);
        Ok(config)
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(path) = &args.collection {
            self.collection_file = path.clone();
        }
        if let Some(path) = &args.extensions {
            self.extension_file = path.clone();
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(base_url) = &args.base_url {
            self.base_url = base_url.clone();
        }
        self.exclude_ids.extend(args.exclude.iter().cloned());
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("Base URL must not be empty");
        }
        if self.subject_type.trim().is_empty() {
            bail!("Subject resource type must not be empty");
        }
        self.slug_regex()?;
        Ok(())
    }

    pub fn slug_regex(&self) -> Result<Regex> {
        RegexBuilder::new(&self.slug_pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid slug pattern '{}'", self.slug_pattern))
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Directory holding `run-all.sh` / `run.sh`.
    pub fn runner_dir(&self) -> &Path {
        match self.output_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Output directory name as seen from [`Config::runner_dir`].
    pub fn output_dir_name(&self) -> String {
        self.output_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "curl".to_string())
    }
}
