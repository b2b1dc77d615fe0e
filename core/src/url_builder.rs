//! Request URL composition.
//!
//! Every URL has the shape `{base}/{customer_id}/vm/{route}[?{query}]`, where
//! `route` is a template such as `instances/{name}/start` whose placeholders
//! are filled from path parameters.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped inside a path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Builds request URLs for one customer. Pure: no I/O, no state beyond the
/// prefix computed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    prefix: String,
}

impl UrlBuilder {
    pub fn new(customer_id: &str, base_api_url: &str) -> Self {
        let base = base_api_url.strip_suffix('/').unwrap_or(base_api_url);
        Self {
            prefix: format!("{base}/{customer_id}/vm/"),
        }
    }

    /// Substitute `params` into `template` and append `query` verbatim.
    ///
    /// Parameter values are percent-encoded as path segments. A placeholder
    /// with no matching parameter is kept as-is.
    pub fn build_url(&self, template: &str, params: &[(&str, &str)], query: Option<&str>) -> String {
        let mut url = self.prefix.clone();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            url.push_str(&rest[..open]);
            let token = &rest[open..];
            let Some(close) = token.find('}') else {
                rest = token;
                break;
            };
            let key = &token[1..close];
            match params.iter().find(|(name, _)| *name == key) {
                Some((_, value)) => url.extend(utf8_percent_encode(value, SEGMENT)),
                None => url.push_str(&token[..=close]),
            }
            rest = &token[close + 1..];
        }
        url.push_str(rest);

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

/// Encode key/value pairs as an `application/x-www-form-urlencoded` query.
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
