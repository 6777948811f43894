//! Request shaping: verbs and parameters

use std::fmt;

use crate::error::Error;

/// HTTP request method.
///
/// The five simple verbs map onto the transport's built-in method flags;
/// anything else is carried as a literal token and sent as a custom request
/// method, which is how PATCH or WebDAV verbs go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// HTTP HEAD.
    Head,
    /// Any other verb, sent over the wire as-is.
    Custom(String),
}

impl Method {
    /// Map a verb string onto a method, case-insensitively.
    ///
    /// Unrecognized verbs keep their original casing.
    pub fn from_verb(verb: &str) -> Method {
        match verb.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            _ => Method::Custom(verb.to_string()),
        }
    }

    /// The verb token sent over the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Custom(verb) => verb,
        }
    }
}

impl From<&str> for Method {
    fn from(verb: &str) -> Self {
        Method::from_verb(verb)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request parameters.
///
/// `Form` pairs are url-encoded into a query string (GET) or request body
/// (everything else), unless the request declares `multipart/form-data`, in
/// which case the pairs become native multipart parts. `Raw` passes a
/// preassembled string through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub enum Params<'a> {
    /// No parameters.
    #[default]
    None,
    /// Structured key/value pairs.
    Form(&'a [(&'a str, &'a str)]),
    /// A preassembled query/body string, passed through unencoded.
    Raw(&'a str),
}

impl Params<'_> {
    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Form(pairs) => pairs.is_empty(),
            Params::Raw(body) => body.is_empty(),
        }
    }

    /// Encode into a single query/body string.
    pub(crate) fn to_query_string(&self) -> Result<String, Error> {
        match self {
            Params::None => Ok(String::new()),
            Params::Form(pairs) => Ok(serde_urlencoded::to_string(pairs)?),
            Params::Raw(body) => Ok((*body).to_string()),
        }
    }
}

impl<'a> From<&'a [(&'a str, &'a str)]> for Params<'a> {
    fn from(pairs: &'a [(&'a str, &'a str)]) -> Self {
        Params::Form(pairs)
    }
}

impl<'a, const N: usize> From<&'a [(&'a str, &'a str); N]> for Params<'a> {
    fn from(pairs: &'a [(&'a str, &'a str); N]) -> Self {
        Params::Form(pairs.as_slice())
    }
}

impl<'a> From<&'a str> for Params<'a> {
    fn from(body: &'a str) -> Self {
        Params::Raw(body)
    }
}

/// Append an encoded query string to a URL, joining with `&` when the URL
/// already carries a query and `?` otherwise.
pub(crate) fn append_query(url: &str, query: &str) -> String {
    let join = if url.contains('?') { '&' } else { '?' };
    format!("{url}{join}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_map_case_insensitively() {
        assert_eq!(Method::from_verb("get"), Method::Get);
        assert_eq!(Method::from_verb("GET"), Method::Get);
        assert_eq!(Method::from_verb("Post"), Method::Post);
        assert_eq!(Method::from_verb("put"), Method::Put);
        assert_eq!(Method::from_verb("delete"), Method::Delete);
        assert_eq!(Method::from_verb("HEAD"), Method::Head);
    }

    #[test]
    fn unrecognized_verbs_keep_their_casing() {
        assert_eq!(
            Method::from_verb("patch"),
            Method::Custom("patch".to_string())
        );
        assert_eq!(Method::from_verb("PATCH").as_str(), "PATCH");
        assert_eq!(Method::from_verb("PROPFIND").as_str(), "PROPFIND");
    }

    #[test]
    fn append_query_joins_on_question_mark_or_ampersand() {
        assert_eq!(
            append_query("http://example.com/a", "q=1"),
            "http://example.com/a?q=1"
        );
        assert_eq!(
            append_query("http://example.com/a?q=1", "page=2"),
            "http://example.com/a?q=1&page=2"
        );
    }

    #[test]
    fn params_emptiness() {
        assert!(Params::None.is_empty());
        assert!(Params::Form(&[]).is_empty());
        assert!(Params::Raw("").is_empty());
        assert!(!Params::Form(&[("a", "b")]).is_empty());
        assert!(!Params::Raw("a=b").is_empty());
    }

    #[test]
    fn form_params_url_encode() {
        let params = Params::Form(&[("q", "rust lang"), ("page", "2")]);
        assert_eq!(
            params.to_query_string().expect("encoding should succeed"),
            "q=rust+lang&page=2"
        );
    }

    #[test]
    fn raw_params_pass_through_unencoded() {
        let params = Params::Raw("already=encoded&x=%20");
        assert_eq!(
            params.to_query_string().expect("encoding should succeed"),
            "already=encoded&x=%20"
        );
    }
}
