//! Request client
//!
//! A [`Client`] holds reusable configuration (headers, engine option
//! overrides, auth, cookie jar, redirect and retry policy) and issues
//! blocking requests. Every call builds its own engine handle, so the handle
//! never outlives the request and a client with settled configuration can be
//! shared freely.

use std::collections::BTreeMap;
use std::path::PathBuf;

use curl::easy::Easy;

use crate::error::Error;
use crate::request::{append_query, Method, Params};
use crate::response::Response;
use crate::transport::{self, Plan, TransportOpt};

const USER_AGENT: &str = concat!(
    "curlew/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/curlew-rs/curlew)"
);

/// A blocking, verb-oriented HTTP client.
///
/// Configuration is applied through chainable setters and is read-only while
/// a request runs. Redirect following is on by default (capped at 10 hops);
/// retries are off by default and, when enabled, only fire for operation
/// timeouts — every other failure is terminal on the first try.
#[derive(Debug, Clone)]
pub struct Client {
    cookie_file: Option<PathBuf>,
    follow_redirects: bool,
    headers: BTreeMap<String, String>,
    options: Vec<TransportOpt>,
    referer: Option<String>,
    retry_attempts: u32,
    user_agent: String,
    auth: Option<(String, String)>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with default settings.
    pub fn new() -> Self {
        Self {
            cookie_file: None,
            follow_redirects: true,
            headers: BTreeMap::new(),
            options: Vec::new(),
            referer: None,
            retry_attempts: 0,
            user_agent: USER_AGENT.to_string(),
            auth: None,
        }
    }

    /// Make an HTTP GET request.
    ///
    /// Non-empty `params` are serialized as a query string and appended to
    /// the URL (`&` when the URL already carries a query, `?` otherwise); a
    /// GET never carries a body.
    pub fn get<'a>(&self, url: &str, params: impl Into<Params<'a>>) -> Result<Response, Error> {
        let params = params.into();
        if params.is_empty() {
            return self.request(Method::Get, url, Params::None, None);
        }
        let url = append_query(url, &params.to_query_string()?);
        self.request(Method::Get, &url, Params::None, None)
    }

    /// Make an HTTP POST request.
    ///
    /// `Form` params are url-encoded into the body unless `content_type` is
    /// `multipart/form-data`, in which case they are handed to the engine as
    /// native multipart parts.
    pub fn post<'a>(
        &self,
        url: &str,
        params: impl Into<Params<'a>>,
        content_type: Option<&str>,
    ) -> Result<Response, Error> {
        self.request(Method::Post, url, params, content_type)
    }

    /// Make an HTTP PUT request.
    pub fn put<'a>(&self, url: &str, params: impl Into<Params<'a>>) -> Result<Response, Error> {
        self.request(Method::Put, url, params, None)
    }

    /// Make an HTTP DELETE request.
    pub fn delete<'a>(&self, url: &str, params: impl Into<Params<'a>>) -> Result<Response, Error> {
        self.request(Method::Delete, url, params, None)
    }

    /// Make an HTTP HEAD request.
    pub fn head<'a>(&self, url: &str, params: impl Into<Params<'a>>) -> Result<Response, Error> {
        self.request(Method::Head, url, params, None)
    }

    /// Make an HTTP request with any method, the generic entry point behind
    /// all of the verb conveniences.
    pub fn request<'a>(
        &self,
        method: impl Into<Method>,
        url: &str,
        params: impl Into<Params<'a>>,
        content_type: Option<&str>,
    ) -> Result<Response, Error> {
        let method = method.into();
        let params = params.into();
        tracing::debug!("{} {}", method, url);

        let mut easy = Easy::new();
        transport::configure(
            &mut easy,
            &Plan {
                method: &method,
                url,
                params: &params,
                content_type,
                headers: &self.headers,
                options: &self.options,
                user_agent: &self.user_agent,
                cookie_file: self.cookie_file.as_deref(),
                follow_redirects: self.follow_redirects,
                referer: self.referer.as_deref(),
                auth: self.auth.as_ref().map(|(user, pass)| (user.as_str(), pass.as_str())),
            },
        )?;

        let raw = perform_with_retry(self.retry_attempts, || transport::collect(&mut easy))?;
        let info = transport::snapshot(&mut easy);

        let mut response = Response::parse(raw, info);
        // Not-found responses come back bodiless, a deliberate convention.
        if response.header("Status-Code") == Some("404") {
            response.clear_body();
        }
        Ok(response)
    }

    /// Set the basic-auth credential pair. Chainable.
    pub fn set_auth(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Clear the basic-auth credential pair. Chainable.
    pub fn clear_auth(&mut self) -> &mut Self {
        self.auth = None;
        self
    }

    /// Set one custom request header. Chainable.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// File the engine reads and writes cookies to across requests. Chainable.
    pub fn cookie_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Whether the engine follows redirects transparently (on by default,
    /// capped at 10 hops). Chainable.
    pub fn follow_redirects(&mut self, follow: bool) -> &mut Self {
        self.follow_redirects = follow;
        self
    }

    /// Referer header to send along with requests. Chainable.
    pub fn referer(&mut self, referer: impl Into<String>) -> &mut Self {
        self.referer = Some(referer.into());
        self
    }

    /// How many extra tries a timed-out request gets. Only operation
    /// timeouts are retried; any other failure is terminal. Chainable.
    pub fn retry_attempts(&mut self, attempts: u32) -> &mut Self {
        self.retry_attempts = attempts;
        self
    }

    /// Replace the default user agent. Chainable.
    pub fn user_agent(&mut self, agent: impl Into<String>) -> &mut Self {
        self.user_agent = agent.into();
        self
    }

    /// Add an engine option override, applied after the defaults. Chainable.
    pub fn option(&mut self, opt: TransportOpt) -> &mut Self {
        self.options.push(opt);
        self
    }
}

/// Run one transfer attempt, retrying only while the failure is an operation
/// timeout and the budget allows: `retries` of 3 means at most 4 tries.
fn perform_with_retry<F>(retries: u32, mut attempt: F) -> Result<Vec<u8>, Error>
where
    F: FnMut() -> Result<Vec<u8>, curl::Error>,
{
    let mut tried = 0u32;
    loop {
        match attempt() {
            Ok(raw) => return Ok(raw),
            Err(err) if err.is_operation_timedout() && tried < retries => {
                tried += 1;
                tracing::debug!("operation timed out, retrying ({}/{})", tried, retries);
            }
            Err(err) => {
                tracing::warn!("Http transport error: {}", err);
                return Err(err.into());
            }
        }
    }
}
