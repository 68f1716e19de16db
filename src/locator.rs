use std::fmt;
use std::str::FromStr;

use url::Url;

/// Query key under which attribution prefixes are appended to a locator.
pub const ATTRIBUTION_PARAM: &str = "attribution";

/// Older spelling of [`ATTRIBUTION_PARAM`]. A locator carrying it is
/// considered annotated already.
pub const LEGACY_ATTRIBUTION_PARAM: &str = "stacktrace.app.packages";

/// Raised when a connection string is not a usable locator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorParseError {
    /// raised on completely invalid urls
    #[error("no valid url provided")]
    InvalidUrl,
    /// raised if the scheme is not http or https
    #[error("unsupported scheme `{0}`")]
    InvalidScheme(String),
    /// raised if the username (public key) portion is missing
    #[error("username is empty")]
    NoUsername,
    /// raised if the host portion is missing
    #[error("host is empty")]
    NoHost,
    /// raised if the path (project) portion is missing
    #[error("empty path")]
    NoPath,
}

/// A validated sink locator: scheme, credentials, host and path, plus any
/// query options the remote client understands.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Locator {
    url: Url,
}

impl Locator {
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The public key.
    pub fn username(&self) -> &str {
        self.url.username()
    }

    pub fn password(&self) -> Option<&str> {
        self.url.password()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// Path without the surrounding slashes, i.e. the project identifier.
    pub fn path(&self) -> &str {
        self.url.path().trim_matches('/')
    }

    /// Value of the first query option named `key`.
    pub fn option(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.url.query_pairs().any(|(k, _)| k == key)
    }

    /// Whether the locator already names the attribution prefixes, under
    /// either spelling.
    pub fn has_attribution(&self) -> bool {
        self.has_option(ATTRIBUTION_PARAM) || self.has_option(LEGACY_ATTRIBUTION_PARAM)
    }

    /// Append `attribution=<p1,p2,...>` unless the locator already carries
    /// an attribution option.
    ///
    /// Prefixes keep their order and are joined by a literal comma; each one
    /// is percent-encoded on its own. An empty list yields an empty value.
    /// Applying this to an already annotated locator is a no-op.
    pub fn annotate_attribution<S: AsRef<str>>(&mut self, prefixes: &[S]) {
        if self.has_attribution() {
            return;
        }

        let joined = prefixes
            .iter()
            .map(|p| urlencoding::encode(p.as_ref()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let pair = format!("{}={}", ATTRIBUTION_PARAM, joined);

        let query = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{}&{}", existing, pair),
            _ => pair,
        };
        self.url.set_query(Some(&query));
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl FromStr for Locator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Locator, LocatorParseError> {
        let url = Url::parse(s.trim()).map_err(|_| LocatorParseError::InvalidUrl)?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(LocatorParseError::InvalidScheme(other.to_string())),
        }

        if url.username().is_empty() {
            return Err(LocatorParseError::NoUsername);
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(LocatorParseError::NoHost),
        }

        if url.path().trim_matches('/').is_empty() {
            return Err(LocatorParseError::NoPath);
        }

        Ok(Locator { url })
    }
}
