//! Parsing of the provider's redirect response.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::types::OidcError;

/// Encode set for query values: everything but unreserved characters.
const QUERY_VALUE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a query component.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, QUERY_VALUE_SET).to_string()
}

/// Decodes a form-encoded component (`+` is a space).
pub fn decode_component(input: &str) -> String {
    percent_decode_str(&input.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Appends `params` to `endpoint`, keeping any query it already has.
pub fn build_url(endpoint: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        return endpoint.to_string();
    }
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}{}", endpoint, sep, query)
}

/// Splits a `k=v&k=v` string. Later duplicates win.
pub fn parse_params(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(k), decode_component(v));
    }
    params
}

/// Fields the provider puts on the redirect URI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SigninResponse {
    pub state: Option<String>,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<i64>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl SigninResponse {
    /// Reads the response from the fragment, or from the query when there is no fragment.
    pub fn from_url(url: &str) -> Result<Self, OidcError> {
        let (before_fragment, fragment) = match url.split_once('#') {
            Some((b, f)) => (b, Some(f)),
            None => (url, None),
        };
        let raw = match fragment.filter(|f| !f.is_empty()) {
            Some(f) => f,
            None => before_fragment.split_once('?').map(|(_, q)| q).unwrap_or(""),
        };
        if raw.is_empty() {
            return Err(OidcError::State("no response parameters in callback url".into()));
        }
        let mut params = parse_params(raw);
        let expires_in = match params.remove("expires_in") {
            Some(v) => {
                let secs = v
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| OidcError::InvalidToken(format!("expires_in is not a number: {}", v)))?;
                if secs < 0 {
                    return Err(OidcError::InvalidToken(format!("expires_in is negative: {}", v)));
                }
                Some(secs)
            }
            None => None,
        };
        Ok(SigninResponse {
            state: params.remove("state"),
            id_token: params.remove("id_token"),
            access_token: params.remove("access_token"),
            token_type: params.remove("token_type"),
            scope: params.remove("scope"),
            expires_in,
            error: params.remove("error"),
            error_description: params.remove("error_description"),
        })
    }

    /// The provider's error, if the response is one.
    pub fn provider_error(&self) -> Option<OidcError> {
        self.error.as_ref().map(|error| OidcError::Provider {
            error: error.clone(),
            description: self.error_description.clone(),
        })
    }
}
