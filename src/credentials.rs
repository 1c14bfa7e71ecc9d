//! Token resolution and API host derivation.
//!
//! Each side resolves its token in priority order: an explicit personal
//! access token, the shared `GITHUB_TOKEN`, then the `gh` CLI session.

use std::fmt;
use std::process::Command;

use crate::client::DEFAULT_BASE_URL;
use crate::error::Error;
use crate::types::Side;

/// Hostname of the public platform.
pub const DEFAULT_HOSTNAME: &str = "github.com";

/// Label of a token taken from the shared `GITHUB_TOKEN`.
pub const SHARED_TOKEN_LABEL: &str = "GITHUB_TOKEN";

/// Label of a token taken from the `gh` CLI session.
pub const CLI_SESSION_LABEL: &str = "GitHub CLI";

/// A resolved bearer token and where it came from.
#[derive(Clone)]
pub struct Credential {
    pub token: String,
    pub label: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            label: label.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("label", &self.label)
            .finish()
    }
}

/// Raw token inputs gathered from flags and the environment.
#[derive(Debug, Default, Clone)]
pub struct TokenInputs {
    pub source_pat: Option<String>,
    pub target_pat: Option<String>,
    pub shared: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn resolve_side(explicit: Option<&String>, shared: Option<&String>, side: Side) -> Option<Credential> {
    if let Some(token) = non_empty(explicit) {
        let label = match side {
            Side::Source => "SOURCE_PAT",
            Side::Target => "TARGET_PAT",
        };
        return Some(Credential::new(token, label));
    }
    non_empty(shared).map(|token| Credential::new(token, SHARED_TOKEN_LABEL))
}

/// Resolve the source and target credentials.
///
/// `session` is asked for a token per hostname only when neither side has an
/// explicit or shared token.
///
/// # Errors
///
/// Returns `Error::Credential` if exactly one side resolves a token, or if
/// the CLI session cannot supply one.
pub fn resolve_tokens<F>(
    inputs: &TokenInputs,
    source_host: Option<&str>,
    target_host: Option<&str>,
    session: F,
) -> Result<(Credential, Credential), Error>
where
    F: Fn(&str) -> Result<String, Error>,
{
    let source = resolve_side(inputs.source_pat.as_ref(), inputs.shared.as_ref(), Side::Source);
    let target = resolve_side(inputs.target_pat.as_ref(), inputs.shared.as_ref(), Side::Target);

    match (source, target) {
        (Some(source), Some(target)) => Ok((source, target)),
        (None, None) => {
            let source = session(source_host.unwrap_or(DEFAULT_HOSTNAME))?;
            let target = session(target_host.unwrap_or(DEFAULT_HOSTNAME))?;
            Ok((
                Credential::new(source, CLI_SESSION_LABEL),
                Credential::new(target, CLI_SESSION_LABEL),
            ))
        }
        (Some(_), None) => Err(Error::Credential(
            "a source token was provided but no target token; set TARGET_PAT or GITHUB_TOKEN"
                .to_string(),
        )),
        (None, Some(_)) => Err(Error::Credential(
            "a target token was provided but no source token; set SOURCE_PAT or GITHUB_TOKEN"
                .to_string(),
        )),
    }
}

/// Resolve a single credential: explicit token, shared token, then `session`.
///
/// # Errors
///
/// Returns the error of `session` when neither token is set.
pub fn resolve_single<F>(
    explicit: Option<&String>,
    shared: Option<&String>,
    hostname: Option<&str>,
    session: F,
) -> Result<Credential, Error>
where
    F: Fn(&str) -> Result<String, Error>,
{
    if let Some(token) = non_empty(explicit) {
        return Ok(Credential::new(token, "--pat"));
    }
    if let Some(token) = non_empty(shared) {
        return Ok(Credential::new(token, SHARED_TOKEN_LABEL));
    }
    let token = session(hostname.unwrap_or(DEFAULT_HOSTNAME))?;
    Ok(Credential::new(token, CLI_SESSION_LABEL))
}

/// Read the token of the `gh` CLI session for a host.
///
/// # Errors
///
/// Returns `Error::Credential` if `gh` is not installed, not logged in to
/// the host, or prints nothing.
pub fn gh_cli_token(hostname: &str) -> Result<String, Error> {
    let output = Command::new("gh")
        .args(["auth", "token", "--hostname", hostname])
        .output()
        .map_err(|e| Error::Credential(format!("failed to run gh: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Credential(format!(
            "no GitHub CLI session for {hostname}: {}. Please authenticate using: gh auth login --hostname {hostname}",
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Credential(format!(
            "GitHub CLI returned an empty token for {hostname}"
        )));
    }
    Ok(token)
}

/// Derive the REST API root for a hostname.
///
/// - none or `github.com`: the public API
/// - `*.ghe.com`: data residency, `https://api.<host>`
/// - anything else: enterprise server, `https://<host>/api/v3`
/// - an explicit `http(s)://` URL is used as is
#[must_use]
pub fn api_base_url(hostname: Option<&str>) -> String {
    let Some(host) = hostname.map(str::trim).filter(|h| !h.is_empty()) else {
        return DEFAULT_BASE_URL.to_string();
    };

    if host.starts_with("http://") || host.starts_with("https://") {
        return host.trim_end_matches('/').to_string();
    }

    let host = host.trim_end_matches('/').to_lowercase();
    if host == DEFAULT_HOSTNAME {
        DEFAULT_BASE_URL.to_string()
    } else if host.ends_with(".ghe.com") {
        format!("https://api.{host}")
    } else {
        format!("https://{host}/api/v3")
    }
}
