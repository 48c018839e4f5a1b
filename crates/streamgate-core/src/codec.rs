//! ============================================================================
//! Token Codec - Link obfuscation for content identifiers
//! ============================================================================
//! Turns an internal content identifier into a URL-safe public token and back.
//! This is obfuscation only: there is no key, anyone can decode a token. It
//! keeps raw identifiers out of URLs and out of search indexes.
//!
//! Token layout: base64url-nopad( "LP_" + identifier + "_VID" )
//! ============================================================================

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use tracing::debug;
use url::Url;

/// Marker prepended to every identifier before encoding
pub const TOKEN_PREFIX: &str = "LP_";

/// Marker appended to every identifier before encoding
pub const TOKEN_SUFFIX: &str = "_VID";

/// Public routes a token can be mounted under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRoute {
    /// `/v/{token}`
    Video,
    /// `/dorama/{token}`
    Dorama,
}

impl ContentRoute {
    pub fn path_prefix(&self) -> &'static str {
        match self {
            ContentRoute::Video => "/v/",
            ContentRoute::Dorama => "/dorama/",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "v" | "video" => Some(Self::Video),
            "dorama" => Some(Self::Dorama),
            _ => None,
        }
    }
}

/// Encode an identifier into a public token.
///
/// Deterministic. The output only contains `[A-Za-z0-9_-]`, so it can be used
/// as a path segment without percent-encoding.
pub fn encode(identifier: &str) -> String {
    let wrapped = format!("{}{}{}", TOKEN_PREFIX, identifier, TOKEN_SUFFIX);
    URL_SAFE_NO_PAD.encode(wrapped.as_bytes())
}

/// Decode a public token back into its identifier.
///
/// Returns `None` for anything that was not produced by [`encode`]: bad
/// alphabet, impossible length, non-UTF-8 payload, or missing markers.
/// Never panics.
pub fn decode(token: &str) -> Option<String> {
    // A trailing group of one character can never be padded back into base64
    if token.is_empty() || token.len() % 4 == 1 {
        debug!("Rejecting token with unrecoverable length {}", token.len());
        return None;
    }

    let bytes = match URL_SAFE_NO_PAD.decode(token.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Token failed base64 reversal: {}", e);
            return None;
        }
    };

    let text = String::from_utf8(bytes).ok()?;

    let body = text
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_suffix(TOKEN_SUFFIX))?;

    if body.is_empty() {
        return None;
    }

    Some(body.to_string())
}

/// Build a shareable link, e.g. `https://linkproibido.com/v/TFBfYWJj...`
pub fn shareable_link(base_url: &Url, route: ContentRoute, identifier: &str) -> String {
    let mut link = base_url.clone();
    link.set_path(&format!("{}{}", route.path_prefix(), encode(identifier)));
    link.set_query(None);
    link.set_fragment(None);
    link.to_string()
}
