//! libcurl invocation glue
//!
//! Everything that touches the engine directly lives here: building the
//! per-call easy handle from a [`Plan`], running the transfer into an
//! in-memory buffer, and snapshotting diagnostic metadata afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use curl::easy::{Auth, Easy, Form, List};

use crate::error::Error;
use crate::request::{Method, Params};

/// Redirect hop cap applied whenever redirect following is enabled.
pub(crate) const MAX_REDIRECTS: u32 = 10;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Everything one invocation needs, borrowed from the client configuration.
pub(crate) struct Plan<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    pub params: &'a Params<'a>,
    pub content_type: Option<&'a str>,
    pub headers: &'a BTreeMap<String, String>,
    pub options: &'a [TransportOpt],
    pub user_agent: &'a str,
    pub cookie_file: Option<&'a Path>,
    pub follow_redirects: bool,
    pub referer: Option<&'a str>,
    pub auth: Option<(&'a str, &'a str)>,
}

/// Configure an easy handle for one invocation: method, url, body, the
/// defaults, then caller overrides so an override always wins.
pub(crate) fn configure(easy: &mut Easy, plan: &Plan<'_>) -> Result<(), Error> {
    match plan.method {
        Method::Head => easy.nobody(true)?,
        Method::Get => easy.get(true)?,
        Method::Post => easy.post(true)?,
        other => easy.custom_request(other.as_str())?,
    }
    easy.url(plan.url)?;
    apply_body(easy, plan.params, plan.content_type)?;

    // Header-echo is what makes the raw result parseable again.
    easy.show_header(true)?;
    easy.useragent(plan.user_agent)?;
    if let Some(path) = plan.cookie_file {
        easy.cookie_file(path)?;
        easy.cookie_jar(path)?;
    }
    if plan.follow_redirects {
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
    }
    if let Some(referer) = plan.referer {
        easy.referer(referer)?;
    }
    match plan.auth {
        Some((username, password)) => {
            easy.http_auth(Auth::new().basic(true))?;
            easy.username(username)?;
            easy.password(password)?;
        }
        None => easy.http_auth(&Auth::new())?,
    }
    for opt in plan.options {
        opt.apply(easy)?;
    }
    let mut list = List::new();
    for (name, value) in plan.headers {
        list.append(&format!("{name}: {value}"))?;
    }
    easy.http_headers(list)?;
    Ok(())
}

fn apply_body(easy: &mut Easy, params: &Params<'_>, content_type: Option<&str>) -> Result<(), Error> {
    match params {
        Params::None => Ok(()),
        Params::Form(pairs) if content_type == Some(MULTIPART_FORM_DATA) => {
            let mut form = Form::new();
            for (name, value) in pairs.iter() {
                form.part(name).contents(value.as_bytes()).add()?;
            }
            easy.httppost(form)?;
            Ok(())
        }
        Params::Form(pairs) => {
            let encoded = serde_urlencoded::to_string(pairs)?;
            if !encoded.is_empty() {
                easy.post_fields_copy(encoded.as_bytes())?;
            }
            Ok(())
        }
        Params::Raw(body) => {
            if !body.is_empty() {
                easy.post_fields_copy(body.as_bytes())?;
            }
            Ok(())
        }
    }
}

/// Run the transfer, buffering the raw header-echoed result in memory.
pub(crate) fn collect(easy: &mut Easy) -> Result<Vec<u8>, curl::Error> {
    let mut raw = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            raw.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    Ok(raw)
}

/// Capture the diagnostic metadata of a completed invocation.
pub(crate) fn snapshot(easy: &mut Easy) -> TransportInfo {
    TransportInfo {
        effective_url: easy.effective_url().ok().flatten().map(String::from),
        response_code: easy.response_code().unwrap_or(0),
        content_type: easy.content_type().ok().flatten().map(String::from),
        total_time: easy.total_time().unwrap_or_default(),
        redirect_count: easy.redirect_count().unwrap_or(0),
    }
}

/// Diagnostic metadata captured from the transport after a completed request.
///
/// The handle itself is torn down before the response is returned, so this
/// snapshot is the introspection surface for a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportInfo {
    /// Final URL, after any redirects the transport followed.
    pub effective_url: Option<String>,
    /// Status code as reported by the transport (0 when unavailable).
    pub response_code: u32,
    /// Content type reported by the transport, if any.
    pub content_type: Option<String>,
    /// Total time the transfer took.
    pub total_time: Duration,
    /// Number of redirect hops the transport followed.
    pub redirect_count: u32,
}

/// Per-request engine option overrides.
///
/// Applied after the defaults, in the order they were added, so an override
/// always wins over a default and a later override wins over an earlier one.
#[derive(Debug, Clone)]
pub enum TransportOpt {
    /// Maximum time the whole request may take.
    Timeout(Duration),
    /// Maximum time the connection phase may take.
    ConnectTimeout(Duration),
    /// Override the redirect-following default.
    FollowRedirects(bool),
    /// Override the redirect hop cap.
    MaxRedirects(u32),
    /// Route the request through a proxy.
    Proxy(String),
    /// Replace the configured user agent for this option set.
    UserAgent(String),
    /// Content encodings to offer; an empty string offers everything the
    /// engine supports.
    AcceptEncoding(String),
    /// Toggle peer certificate verification.
    SslVerifyPeer(bool),
    /// Toggle host name verification.
    SslVerifyHost(bool),
    /// Engine-level debug output on stderr.
    Verbose(bool),
}

impl TransportOpt {
    fn apply(&self, easy: &mut Easy) -> Result<(), curl::Error> {
        match self {
            TransportOpt::Timeout(timeout) => easy.timeout(*timeout),
            TransportOpt::ConnectTimeout(timeout) => easy.connect_timeout(*timeout),
            TransportOpt::FollowRedirects(follow) => easy.follow_location(*follow),
            TransportOpt::MaxRedirects(max) => easy.max_redirections(*max),
            TransportOpt::Proxy(proxy) => easy.proxy(proxy),
            TransportOpt::UserAgent(agent) => easy.useragent(agent),
            TransportOpt::AcceptEncoding(encoding) => easy.accept_encoding(encoding),
            TransportOpt::SslVerifyPeer(verify) => easy.ssl_verify_peer(*verify),
            TransportOpt::SslVerifyHost(verify) => easy.ssl_verify_host(*verify),
            TransportOpt::Verbose(verbose) => easy.verbose(*verbose),
        }
    }
}
