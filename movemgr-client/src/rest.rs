//! Challenge-response HTTP client for the device's bundle-download channel.
//!
//! Authorization is a two-step out-of-band flow: `get_challenge` makes the
//! device display a one-time code on its own screen, and
//! `submit_challenge_response` trades the user-entered code for a session
//! cookie. The cookie then authorizes per-set `.abl` bundle downloads.
//!
//! State machine: Idle → ChallengeSent → Authorized | Failed. "Failed" is
//! simply the stored cookie being cleared; callers detect "not authorized"
//! by the absence of a cookie rather than by a thrown error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::RestError;

/// Cookie the device sets on a successful challenge response.
pub const CHALLENGE_COOKIE_NAME: &str = "Ableton-Challenge-Response-Token";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The two-call auth contract plus the bundle download it authorizes.
/// Implemented by [`RestApiClient`]; faked in orchestrator tests.
pub trait BundleClient {
    /// Ask the device to display a one-time code. No payload comes back.
    fn get_challenge(&mut self) -> Result<(), RestError>;

    /// Submit the user-entered code. Returns the stored cookie on success,
    /// `None` when the device answered 2xx without the expected token.
    fn submit_challenge_response(&mut self, secret: &str) -> Result<Option<String>, RestError>;

    /// Download one set's `.abl` bundle into `target_dir`, returning the
    /// written path.
    fn download_set_abl_bundle(
        &mut self,
        set_id: &str,
        target_dir: &Path,
    ) -> Result<PathBuf, RestError>;

    /// Point the client at a different device base URL (re-hydration after
    /// a settings change). Clears nothing; the cookie may outlive this.
    fn set_base_url(&mut self, base_url: &str);
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Blocking HTTP client holding the device base URL and the session cookie.
pub struct RestApiClient {
    base_url: String,
    cookie: Option<String>,
    agent: ureq::Agent,
}

impl RestApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            cookie: None,
            agent: ureq::agent(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The stored `name=value` cookie, if authorized.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

impl BundleClient for RestApiClient {
    fn get_challenge(&mut self) -> Result<(), RestError> {
        let url = format!("{}/api/v1/challenge", self.base_url);
        self.agent
            .post(&url)
            .call()
            .map_err(|e| http_err(&url, e))?;
        log::info!("challenge requested; check the device screen for the code");
        Ok(())
    }

    fn submit_challenge_response(&mut self, secret: &str) -> Result<Option<String>, RestError> {
        let url = format!("{}/api/v1/challenge-response", self.base_url);
        let response = self
            .agent
            .post(&url)
            .send_json(serde_json::json!({ "secret": secret }))
            .map_err(|e| {
                // A rejected secret must not leave a stale cookie behind.
                self.cookie = None;
                http_err(&url, e)
            })?;

        let headers: Vec<&str> = response.all("set-cookie");
        match extract_token_cookie(&headers) {
            Some(cookie) => {
                log::info!("challenge response accepted; cookie stored");
                self.cookie = Some(cookie.clone());
                Ok(Some(cookie))
            }
            None => {
                log::warn!(
                    "challenge response succeeded but {CHALLENGE_COOKIE_NAME} was not in Set-Cookie"
                );
                Ok(None)
            }
        }
    }

    fn download_set_abl_bundle(
        &mut self,
        set_id: &str,
        target_dir: &Path,
    ) -> Result<PathBuf, RestError> {
        let url = format!("{}/api/v1/data/Sets/{set_id}", self.base_url);
        let mut request = self.agent.get(&url);
        if let Some(cookie) = &self.cookie {
            request = request.set("Cookie", cookie);
        }
        let response = request.call().map_err(|e| http_err(&url, e))?;

        let filename = response
            .header("content-disposition")
            .and_then(content_disposition_filename)
            .unwrap_or_else(|| format!("{set_id}.abl"));

        fs::create_dir_all(target_dir).map_err(|e| io_err(target_dir, e))?;
        let local_path = target_dir.join(filename);
        let mut file = fs::File::create(&local_path).map_err(|e| io_err(&local_path, e))?;
        io::copy(&mut response.into_reader(), &mut file).map_err(|e| io_err(&local_path, e))?;
        log::info!("bundle downloaded to {}", local_path.display());
        Ok(local_path)
    }

    fn set_base_url(&mut self, base_url: &str) {
        self.base_url = normalize_base_url(base_url);
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Find the challenge token among `Set-Cookie` headers and reduce it to its
/// `name=value` prefix.
fn extract_token_cookie(headers: &[&str]) -> Option<String> {
    headers
        .iter()
        .find(|h| h.starts_with(&format!("{CHALLENGE_COOKIE_NAME}=")))
        .map(|h| h.split(';').next().unwrap_or(h).to_string())
}

/// Filename from a `Content-Disposition` header, quotes stripped.
fn content_disposition_filename(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let value = rest.split(';').next().unwrap_or(rest).trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn http_err(url: &str, source: ureq::Error) -> RestError {
    match source {
        ureq::Error::Status(status, _) => RestError::Status {
            url: url.to_string(),
            status,
        },
        other => RestError::Http {
            url: url.to_string(),
            source: Box::new(other),
        },
    }
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RestError {
    RestError::Io {
        path: path.into(),
        source,
    }
}
