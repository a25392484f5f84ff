//! Collection → curl script generation

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ferrum_xmljson::{ensure_narrative, xml_to_value, ExtensionSubstituter, ReadOptions};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collection::{content_type, with_content_type, Collection, Header, DEFAULT_CONTENT_TYPE};
use crate::config::Config;
use crate::script::{relative_path, render_run_all, render_run_one, slug_from_name, RequestScript};

pub const RUN_ALL_SCRIPT: &str = "run-all.sh";
pub const RUN_ONE_SCRIPT: &str = "run.sh";

/// Outcome of a generator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Script ids in collection order
    pub ids: Vec<String>,
    pub skipped: usize,
    pub excluded: usize,
    /// XML bodies that failed to convert and were sent as-is
    pub conversion_failures: usize,
}

/// A request body after conversion and post-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBody {
    pub body: String,
    pub headers: Vec<Header>,
    pub converted: bool,
}

pub struct Generator {
    config: Config,
    substituter: ExtensionSubstituter,
    slug: Regex,
}

impl Generator {
    pub fn new(config: Config) -> Result<Self> {
        let substituter = ExtensionSubstituter::from_file(&config.extension_file)
            .context("Failed to load replacement extensions")?
            .with_subject_type(config.subject_type.clone());
        let slug = config.slug_regex()?;
        Ok(Self {
            config,
            substituter,
            slug,
        })
    }

    pub fn with_substituter(config: Config, substituter: ExtensionSubstituter) -> Result<Self> {
        let slug = config.slug_regex()?;
        Ok(Self {
            config,
            substituter,
            slug,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read the collection and write one script per request, plus the
    /// `run-all.sh` / `run.sh` runners.
    pub fn run(&self) -> Result<Summary> {
        let collection = Collection::from_file(&self.config.collection_file)?;
        self.generate(&collection)
    }

    pub fn generate(&self, collection: &Collection) -> Result<Summary> {
        let base_url = self.config.base_url();
        let vars = collection.variables(base_url);
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let mut summary = Summary::default();
        let mut seen = HashSet::new();

        for (index, item) in collection.item.iter().enumerate() {
            let Some(request) = &item.request else {
                summary.skipped += 1;
                continue;
            };
            let name = item
                .name
                .clone()
                .unwrap_or_else(|| format!("Request {index}"));
            let op_id = slug_from_name(&name, index, &self.slug, &self.config.slug_strip_prefix);
            if self.config.exclude_ids.contains(&op_id) {
                debug!(op_id = %op_id, "excluded");
                summary.excluded += 1;
                continue;
            }
            if !seen.insert(op_id.clone()) {
                warn!(op_id = %op_id, "duplicate request id, overwriting earlier script");
            }

            let method = request.method();
            let url = request.resolved_url(&vars);
            let prepared = self.prepare_body(&op_id, request.raw_body(), &request.header);
            if !prepared.converted && is_xml(content_type(&request.header)) && !prepared.body.is_empty() {
                summary.conversion_failures += 1;
            }

            let body_file = (!prepared.body.is_empty() && RequestScript::sends_body(&method))
                .then(|| format!("{op_id}.json"));
            if let Some(file) = &body_file {
                write_file(&output_dir.join(file), &prepared.body, false)?;
            }

            let path = relative_path(&url, base_url);
            let script = RequestScript {
                op_id: &op_id,
                description: &name,
                method: &method,
                path: &path,
                headers: &prepared.headers,
                body_file: body_file.as_deref(),
            }
            .render(base_url);
            write_file(&script_path(output_dir, &op_id), &script, true)?;

            summary.ids.push(op_id);
        }

        let runner_dir = self.config.runner_dir();
        let dir_name = self.config.output_dir_name();
        write_file(
            &runner_dir.join(RUN_ALL_SCRIPT),
            &render_run_all(&summary.ids, &dir_name),
            true,
        )?;
        write_file(
            &runner_dir.join(RUN_ONE_SCRIPT),
            &render_run_one(&summary.ids, &dir_name),
            true,
        )?;

        info!(
            scripts = summary.ids.len(),
            output_dir = %output_dir.display(),
            "generated curl scripts"
        );
        Ok(summary)
    }

    /// Convert an XML body to FHIR JSON, then replace subject extensions and
    /// add missing narratives to any JSON body. Bodies that are neither are
    /// passed through.
    pub fn prepare_body(&self, op_id: &str, raw: &str, headers: &[Header]) -> PreparedBody {
        let mut prepared = PreparedBody {
            body: raw.to_string(),
            headers: headers.to_vec(),
            converted: false,
        };
        if raw.is_empty() {
            return prepared;
        }

        let parsed = if is_xml(content_type(headers)) {
            match xml_to_value(raw, &ReadOptions::default()) {
                Ok(value) => {
                    prepared.headers = with_content_type(headers, DEFAULT_CONTENT_TYPE);
                    prepared.converted = true;
                    Some(value)
                }
                Err(e) => {
                    warn!(op_id = %op_id, error = %e, "XML conversion failed, keeping original body");
                    None
                }
            }
        } else {
            serde_json::from_str::<Value>(raw).ok()
        };

        if let Some(document) = parsed {
            let document = ensure_narrative(&self.substituter.apply_document(&document));
            match serde_json::to_string_pretty(&document) {
                Ok(body) => prepared.body = body,
                Err(e) => warn!(op_id = %op_id, error = %e, "failed to serialize body"),
            }
        }
        prepared
    }
}

fn is_xml(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("xml")
}

fn write_file(path: &Path, contents: &str, executable: bool) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    if executable {
        make_executable(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Script path for a request id inside `output_dir`.
pub fn script_path(output_dir: &Path, op_id: &str) -> PathBuf {
    output_dir.join(format!("{op_id}.sh"))
}
