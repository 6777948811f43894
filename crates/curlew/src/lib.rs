//! A thin, blocking, verb-oriented HTTP client over libcurl.
//!
//! The engine does the heavy lifting (network I/O, TLS, redirect following,
//! cookie persistence); this crate configures it per request and parses the
//! raw header-echoed result back into a structured [`Response`] — including
//! multi-hop results where every redirect hop's header block is echoed ahead
//! of the final body.
//!
//! # Example
//!
//! ```no_run
//! use curlew::Client;
//!
//! fn main() -> Result<(), curlew::Error> {
//!     let mut client = Client::new();
//!     client.set_auth("user", "secret").set_header("Accept", "text/html");
//!
//!     let response = client.get("https://example.com/search", &[("q", "rust")])?;
//!     println!("{} -> {}", response.header("Status").unwrap_or("?"), response.text());
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod request;
mod response;
mod transport;

pub use client::Client;
pub use error::Error;
pub use request::{Method, Params};
pub use response::Response;
pub use transport::{TransportInfo, TransportOpt};
