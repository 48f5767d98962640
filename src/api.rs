// API client module: a small blocking HTTP client that talks to the Habitica
// v3 REST API. Every call is authenticated with the user's API credentials
// and returns the parsed JSON body.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, HttpCache};
use crate::config::Auth;
use crate::error::{HabitsError, Result};
use crate::ui;

pub use reqwest::Method;

/// Sent as `User-Agent` on every request.
pub const CLIENT_AGENT: &str = concat!(
    "habits/",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_REPOSITORY"),
    ")"
);

/// Anything that can answer Habitica API calls. Commands only talk to this
/// trait, so they can be driven by canned responses in tests.
pub trait Api {
    /// Perform `method` on `path` (relative to the API root) and return the
    /// parsed JSON body.
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value>;

    fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::POST, path, body)
    }

    fn put(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::PUT, path, body)
    }

    fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None)
    }
}

/// Authenticated session against one Habitica endpoint.
pub struct Habitica {
    client: Client,
    base_url: String,
    api_user: String,
    cache: Option<HttpCache>,
    spinner: bool,
}

impl Habitica {
    /// Build a session from the `[auth]` section of the config file.
    pub fn new(auth: &Auth) -> Result<Self> {
        let client = Client::builder()
            .user_agent(CLIENT_AGENT)
            .default_headers(auth_headers(auth)?)
            .build()?;
        Ok(Habitica {
            client,
            base_url: auth.base_url.trim_end_matches('/').to_string(),
            api_user: auth.api_user.clone(),
            cache: None,
            spinner: false,
        })
    }

    /// Serve repeated GETs from `cache` when the server says nothing changed.
    pub fn with_cache(mut self, cache: HttpCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Show a spinner on stderr while requests are in flight.
    pub fn with_spinner(mut self, on: bool) -> Self {
        self.spinner = on;
        self
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn cached(&self, path: &str) -> Option<CacheEntry> {
        let cache = self.cache.as_ref()?;
        match cache.read(&self.api_user, path) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("ignoring HTTP cache entry: {e:#}");
                None
            }
        }
    }

    fn store(&self, path: &str, etag: String, body: &Value) {
        if let Some(cache) = &self.cache {
            let entry = CacheEntry::new(etag, body.clone());
            if let Err(e) = cache.write(&self.api_user, path, &entry) {
                warn!("could not update HTTP cache: {e:#}");
            }
        }
    }
}

impl Api for Habitica {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        let is_get = method == Method::GET;
        let cached = if is_get { self.cached(path) } else { None };

        let mut req = self.client.request(method.clone(), &url);
        req = match body {
            Some(body) => req.json(body),
            // Habitica wants an explicit empty body on bodiless POSTs
            None if method == Method::POST || method == Method::PUT => req.body(""),
            None => req,
        };
        if let Some(entry) = &cached {
            req = req.header(IF_NONE_MATCH, entry.etag.as_str());
        }

        debug!(%method, %url, "sending request");
        let progress = self
            .spinner
            .then(|| ui::spinner(format!("{method} {path}")));
        let sent = req.send();
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        let res = sent?;
        let status = res.status();
        debug!(%method, %url, status = status.as_u16(), "received response");

        if status == StatusCode::NOT_MODIFIED {
            if let Some(entry) = cached {
                debug!(%url, "served from HTTP cache");
                return Ok(entry.body);
            }
        }

        let final_url = res.url().to_string();
        if !status.is_success() {
            let text = res.text().unwrap_or_default();
            return Err(error_from_response(status, final_url, &text));
        }

        let etag = res
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = res.text()?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            HabitsError::InvalidResponse(format!("{final_url} did not return JSON: {e}"))
        })?;
        if let (true, Some(etag)) = (is_get, etag) {
            self.store(path, etag, &value);
        }
        Ok(value)
    }
}

/// Headers identifying the user and this client to Habitica.
fn auth_headers(auth: &Auth) -> Result<HeaderMap> {
    let invalid = |field: &str| HabitsError::config(format!("auth.{field} contains invalid characters"));
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-api-user",
        HeaderValue::from_str(&auth.api_user).map_err(|_| invalid("api-user"))?,
    );
    let mut key = HeaderValue::from_str(&auth.api_key).map_err(|_| invalid("api-key"))?;
    key.set_sensitive(true);
    headers.insert("x-api-key", key);
    headers.insert(
        "x-client",
        HeaderValue::from_str(&format!("{}-habits", auth.api_user))
            .map_err(|_| invalid("api-user"))?,
    );
    Ok(headers)
}

/// Longest raw error body kept in a message.
const MAX_BODY_CHARS: usize = 200;

/// Squash a raw body (often an HTML error page) into a single short line.
fn one_line(body: &str) -> Option<String> {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }
    if flat.chars().count() > MAX_BODY_CHARS {
        let cut: String = flat.chars().take(MAX_BODY_CHARS).collect();
        return Some(format!("{cut}..."));
    }
    Some(flat)
}

/// Turn a non-2xx response into an error carrying the service's own message
/// when it sent one.
pub fn error_from_response(status: StatusCode, url: String, body: &str) -> HabitsError {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(Value::as_str)
            .map(str::to_owned),
        Err(_) => one_line(body),
    };
    HabitsError::Http {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        url,
        message,
    }
}
