//! Session-cookie credentials
//!
//! Cookies arrive as Netscape cookie-file text, either base64-encoded or verbatim.
//! The encoded form takes precedence.

use base64::Engine;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::SubtitleError;

/// Cookie file contents resolved once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialBundle {
    text: String,
}

impl CredentialBundle {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parse the Netscape cookie lines, skipping comments and malformed lines
    pub fn cookies(&self) -> Vec<CookieRecord> {
        self.text.lines().filter_map(CookieRecord::parse).collect()
    }

    /// Render a `Cookie` header value for requests to `host`
    pub fn cookie_header(&self, host: &str) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies()
            .into_iter()
            .filter(|cookie| cookie.matches_host(host))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

/// One line of a Netscape cookie file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieRecord {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expires: i64,
    pub name: String,
    pub value: String,
}

impl CookieRecord {
    /// Parse a single line; `None` for comments, blank lines and lines with fewer than 7 fields
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        // `#HttpOnly_` is a cookie, not a comment
        let (line, http_only) = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.trim().is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            return None;
        }

        Some(Self {
            domain: fields[0].to_string(),
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            http_only,
            expires: fields[4].trim().parse().unwrap_or(0),
            name: fields[5].to_string(),
            value: fields[6].to_string(),
        })
    }

    fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }
}

/// Resolve the credential bundle from a base64-encoded value and a plain value.
///
/// The encoded value wins when it decodes to non-empty UTF-8; a decode failure is
/// logged and the plain value is used instead.
pub fn resolve(encoded: Option<&str>, plain: Option<&str>) -> CredentialBundle {
    if let Some(encoded) = encoded.map(str::trim).filter(|s| !s.is_empty()) {
        match decode_base64(encoded) {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!("Using base64-encoded cookie bundle");
                return CredentialBundle::new(text);
            }
            Ok(_) => tracing::debug!("Encoded cookie bundle is empty, trying plain value"),
            Err(e) => tracing::warn!("Failed to decode base64 cookie bundle: {}", e),
        }
    }

    match plain.filter(|s| !s.trim().is_empty()) {
        Some(text) => {
            tracing::info!("Using plain cookie bundle");
            CredentialBundle::new(text)
        }
        None => CredentialBundle::empty(),
    }
}

fn decode_base64(encoded: &str) -> Result<String, SubtitleError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SubtitleError::Credentials(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SubtitleError::Credentials(e.to_string()))
}

/// Cookie bundle written to a uniquely named temporary file, removed on drop
pub struct CookieFile {
    file: NamedTempFile,
}

impl CookieFile {
    /// Write the bundle out, or return `None` when there are no credentials
    pub fn materialize(bundle: &CredentialBundle) -> Result<Option<Self>, SubtitleError> {
        if bundle.is_empty() {
            return Ok(None);
        }

        let mut file = tempfile::Builder::new()
            .prefix("subtitle-api-cookies-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| SubtitleError::Credentials(e.to_string()))?;

        file.write_all(bundle.as_str().as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| SubtitleError::Credentials(e.to_string()))?;

        tracing::debug!("Wrote cookie file: {}", file.path().display());
        Ok(Some(Self { file }))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
