//! Shell script rendering

use regex::Regex;
use url::Url;

use crate::collection::{content_type, Header};

/// Path prefixes of the FHIR endpoint stripped from request URLs.
const FHIR_PATH_PREFIXES: &[&str] = &["/server/fhir", "/fhir"];

/// Methods that send the request body.
const BODY_METHODS: &[&str] = &["POST", "PUT", "PATCH"];

/// Derive a script id from a request name, falling back to `req_NNN`.
pub fn slug_from_name(name: &str, index: usize, pattern: &Regex, strip_prefix: &str) -> String {
    match pattern.find(name) {
        Some(m) => {
            let id = m.as_str().replace(strip_prefix, "").replace(':', "_");
            id.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
                .collect()
        }
        None => format!("req_{index:03}"),
    }
}

/// Path and query of `url` relative to the FHIR base endpoint.
pub fn relative_path(url: &str, base_url: &str) -> String {
    if url.starts_with("http") {
        if let Ok(parsed) = Url::parse(url) {
            let mut path = parsed.path().trim_end_matches('/').to_string();
            if let Some(query) = parsed.query() {
                path.push('?');
                path.push_str(query);
            }
            for prefix in FHIR_PATH_PREFIXES {
                if let Some(rest) = path.strip_prefix(prefix) {
                    return rest.trim_start_matches('/').to_string();
                }
            }
            return path;
        }
    }
    url.replace(base_url, "").trim_matches('/').to_string()
}

/// Escape text for use inside a double-quoted shell word.
fn shell_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Everything needed to render one request script.
#[derive(Debug, Clone)]
pub struct RequestScript<'a> {
    pub op_id: &'a str,
    pub description: &'a str,
    pub method: &'a str,
    /// Path relative to the base URL (may be empty)
    pub path: &'a str,
    pub headers: &'a [Header],
    /// Companion file holding the request body, if one is sent
    pub body_file: Option<&'a str>,
}

impl RequestScript<'_> {
    pub fn sends_body(method: &str) -> bool {
        BODY_METHODS.contains(&method)
    }

    pub fn render(&self, default_base_url: &str) -> String {
        let mut curl = vec![
            "curl".to_string(),
            "-s".to_string(),
            "-w".to_string(),
            "%{http_code}".to_string(),
            "-o".to_string(),
            "\"$RESP\"".to_string(),
            "-X".to_string(),
            self.method.to_string(),
        ];
        for header in self.headers {
            let Some(value) = header.value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            if header.key.is_empty() || header.key.eq_ignore_ascii_case("content-type") {
                continue;
            }
            curl.push(format!("-H \"{}: {}\"", shell_escape(&header.key), shell_escape(value)));
        }
        if let Some(body_file) = self.body_file {
            curl.push(format!(
                "-H \"Content-Type: {}\"",
                shell_escape(content_type(self.headers))
            ));
            curl.push("-H \"Accept: application/fhir+json\"".to_string());
            curl.push(format!("-d @\"{}\"", shell_escape(body_file)));
        }
        // trailing slash on an empty path avoids a redirect from many servers
        curl.push(format!("\"${{BASE_URL}}/{}\"", shell_escape(self.path)));

        let lines = [
            "#!/usr/bin/env bash".to_string(),
            format!("# {}: {}", self.op_id, self.description.replace('\n', " ")),
            "# Generated from Postman collection".to_string(),
            String::new(),
            format!("BASE_URL=\"${{FHIR_BASE_URL:-{}}}\"", shell_escape(default_base_url)),
            String::new(),
            "RESP=$(mktemp)".to_string(),
            "trap \"rm -f $RESP\" EXIT".to_string(),
            format!("HTTP_CODE=$({})", curl.join(" ")),
            "if [[ \"$HTTP_CODE\" =~ ^2 ]]; then".to_string(),
            "  echo \"[OK] HTTP $HTTP_CODE\"".to_string(),
            "  exit 0".to_string(),
            "else".to_string(),
            "  echo \"[FAIL] HTTP $HTTP_CODE\"".to_string(),
            "  cat \"$RESP\" 2>/dev/null | head -20".to_string(),
            "  exit 1".to_string(),
            "fi".to_string(),
            String::new(),
        ];
        lines.join("\n")
    }
}

/// `run-all.sh`: every script, in collection order.
pub fn render_run_all(ids: &[String], output_dir_name: &str) -> String {
    let mut lines = vec![
        "#!/usr/bin/env bash".to_string(),
        "# Run all FHIR setup operations in order".to_string(),
        format!("cd \"$(dirname \"$0\")/{}\"", shell_escape(output_dir_name)),
        String::new(),
    ];
    for id in ids {
        lines.push(format!("echo \">>> Running {id}\""));
        lines.push(format!("./{id}.sh"));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// `run.sh <ID>`: a single script, listing the known ids on misuse.
pub fn render_run_one(ids: &[String], output_dir_name: &str) -> String {
    let mut lines = vec![
        "#!/usr/bin/env bash".to_string(),
        "# Run a single operation by ID: ./run.sh L00_1_T02".to_string(),
        format!("cd \"$(dirname \"$0\")/{}\"", shell_escape(output_dir_name)),
        "ID=\"${1:-}\"".to_string(),
        "if [ -z \"$ID\" ]; then".to_string(),
        "  echo \"Usage: ./run.sh <ID>\"".to_string(),
        "  echo \"Available IDs:\"".to_string(),
    ];
    for id in ids {
        lines.push(format!("  echo \"  {id}\""));
    }
    lines.extend(
        [
            "  exit 1",
            "fi",
            "SCRIPT=\"${ID}.sh\"",
            "if [ ! -f \"$SCRIPT\" ]; then",
            "  echo \"Unknown ID: $ID\"",
            "  exit 1",
            "fi",
            "./\"$SCRIPT\"",
        ]
        .map(String::from),
    );
    lines.join("\n")
}
