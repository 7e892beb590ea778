/*!
 * Resource addresses.
 *
 * Notes are addressed with `obsidian://open?vault=<collection>&file=<path>`.
 * Parsing is pure; validation of the collection and the path happens before
 * the pipeline performs any I/O.
 */

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use std::borrow::Cow;
use url::Url;

use crate::errors::PipelineError;

/// URL scheme accepted by [`ResourceAddress::parse`]
pub const ADDRESS_SCHEME: &str = "obsidian";

/// The only action an address may target
pub const OPEN_ACTION: &str = "open";

/// Bytes escaped in query values. `+` is escaped so it never reads as a space.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Drive-letter prefix (`C:` / `c:\`)
static DRIVE_LETTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]:").unwrap());

/// A parsed `(collection, path)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    /// Collection (vault) name, case-sensitive
    pub collection: String,
    /// Percent-decoded, forward-slash path inside the collection
    pub path: String,
}

impl ResourceAddress {
    /// Parse an address string.
    ///
    /// Fails with `MalformedAddress` when the scheme or action is wrong or
    /// either query parameter is missing or empty.
    pub fn parse(address: &str) -> Result<Self, PipelineError> {
        let url = Url::parse(address.trim())
            .map_err(|e| PipelineError::MalformedAddress(format!("{}: {}", address, e)))?;

        if url.scheme() != ADDRESS_SCHEME {
            return Err(PipelineError::MalformedAddress(format!(
                "unsupported scheme '{}', expected '{}'",
                url.scheme(),
                ADDRESS_SCHEME
            )));
        }

        // `obsidian://open?...` puts the action in the host slot
        let action = url.host_str().unwrap_or_default();
        if action != OPEN_ACTION || !matches!(url.path(), "" | "/") {
            return Err(PipelineError::MalformedAddress(format!(
                "unsupported action in '{}', expected '{}'",
                address, OPEN_ACTION
            )));
        }

        let mut collection = None;
        let mut path = None;
        for (key, value) in query_pairs(url.query().unwrap_or_default()) {
            match key.as_ref() {
                "vault" if collection.is_none() => collection = Some(value.into_owned()),
                "file" if path.is_none() => path = Some(value.into_owned()),
                _ => {}
            }
        }

        let collection = collection
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PipelineError::MalformedAddress(format!("missing 'vault' parameter in '{}'", address)))?;
        let path = path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PipelineError::MalformedAddress(format!("missing 'file' parameter in '{}'", address)))?;

        Ok(Self {
            collection,
            path: path.replace('\\', "/"),
        })
    }

    /// Build the address string for a collection-relative path
    pub fn to_url(&self) -> String {
        format!(
            "{}://{}?vault={}&file={}",
            ADDRESS_SCHEME,
            OPEN_ACTION,
            utf8_percent_encode(&self.collection, QUERY_VALUE),
            utf8_percent_encode(&self.path, QUERY_VALUE)
        )
    }

    /// Check the collection against configuration, then the path for safety
    pub fn validate(&self, configured_collection: &str) -> Result<(), PipelineError> {
        validate_collection(&self.collection, configured_collection)?;
        validate_path(&self.path)
    }
}

/// Split a raw query into percent-decoded pairs. `+` stays a literal plus.
fn query_pairs(query: &str) -> impl Iterator<Item = (Cow<'_, str>, Cow<'_, str>)> {
    query.split('&').filter(|pair| !pair.is_empty()).map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (
            percent_decode_str(key).decode_utf8_lossy(),
            percent_decode_str(value).decode_utf8_lossy(),
        )
    })
}

/// Exact, case-sensitive collection match
pub fn validate_collection(requested: &str, configured: &str) -> Result<(), PipelineError> {
    if requested != configured {
        return Err(PipelineError::CollectionMismatch {
            requested: requested.to_string(),
            configured: configured.to_string(),
        });
    }
    Ok(())
}

/// Reject traversal, absolute and hidden paths.
///
/// Checks run in that order and the first violation is reported.
pub fn validate_path(path: &str) -> Result<(), PipelineError> {
    let unsafe_path = |reason| PipelineError::UnsafePath {
        path: path.to_string(),
        reason,
    };

    if path.contains("..") || path.contains('~') {
        return Err(unsafe_path("parent or home directory reference"));
    }

    if path.starts_with('/') || path.starts_with('\\') || DRIVE_LETTER_REGEX.is_match(path) {
        return Err(unsafe_path("absolute path"));
    }

    if path.split(['/', '\\']).any(|segment| segment.starts_with('.')) {
        return Err(unsafe_path("hidden path segment"));
    }

    Ok(())
}
