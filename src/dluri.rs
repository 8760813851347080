//! GS1 Digital Link URI parsing and generation.
//!
//! A DL URI carries AI data in its path (`/01/09506000134352/10/LOT`) and
//! query (`?99=ABC`). Parsing recovers the equivalent AI element string;
//! generation renders the encoder's extracted AIs back into a URI.
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::aidata::{self, AiValue, Validation, Validations};
use crate::error::Gs1Error;

/// Stem used when the caller does not supply one.
pub(crate) const DEFAULT_STEM: &str = "https://id.gs1.org";

// RFC 3986 unreserved characters stay literal in DL path and query
// components; everything else is percent-encoded.
const DL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// AIs that may serve as the primary key of a DL URI path.
const DL_PRIMARY_KEYS: &[&str] = &[
    "00", "01", "253", "255", "401", "402", "414", "417", "8003", "8004", "8006", "8010",
    "8013", "8017", "8018",
];

/// Path qualifier sequence permitted after each primary key.
const DL_QUALIFIERS: &[(&str, &[&str])] = &[
    ("01", &["22", "10", "21"]),
    ("8006", &["22", "10", "21"]),
    ("414", &["254"]),
];

/// Result of extracting AI data from a DL URI.
#[derive(Debug, Clone)]
pub(crate) struct DlExtract {
    /// AI element string equivalent of the URI's data content.
    pub element_string: String,
    /// Query entries that do not carry AI data.
    pub ignored_query_params: Vec<String>,
}

/// Exact-case URI scheme prefixes recognised as potential DL URIs.
/// Mixed-case schemes are deliberately not matched.
pub(crate) fn has_dl_scheme(data: &str) -> bool {
    ["http://", "HTTP://", "https://", "HTTPS://"]
        .iter()
        .any(|scheme| data.starts_with(scheme))
}

fn is_ai_key(s: &str) -> bool {
    (2..=4).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Extracts the AI element string from a DL URI.
///
/// AI pairs anchor to the end of the path and everything to their left is
/// the stem; the leftmost pair must carry a DL primary key.
pub(crate) fn parse_dl_uri(
    uri: &str,
    permit_zero_suppressed_gtin: bool,
) -> Result<DlExtract, Gs1Error> {
    let url = Url::parse(uri)?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(Iterator::collect)
        .unwrap_or_default();
    let mut end = segments.len();
    if end > 0 && segments[end - 1].is_empty() {
        end -= 1; // tolerate a trailing slash
    }
    let mut first = end;
    while first >= 2 && is_ai_key(segments[first - 2]) {
        first -= 2;
    }
    if first == end || !DL_PRIMARY_KEYS.contains(&segments[first]) {
        return Err(Gs1Error::DlMissingPrimaryKey);
    }
    let mut pairs = Vec::new();
    for pair in segments[first..end].chunks_exact(2) {
        let ai = pair[0].to_string();
        let mut value = percent_decode_str(pair[1]).decode_utf8_lossy().into_owned();
        if ai == "01" {
            value = normalise_dl_gtin(value, permit_zero_suppressed_gtin)?;
        }
        pairs.push((ai, value));
    }
    let mut ignored = Vec::new();
    if let Some(query) = url.query() {
        for entry in query.split('&').filter(|entry| !entry.is_empty()) {
            match entry.split_once('=') {
                Some((key, value)) if is_ai_key(key) => {
                    let decoded = percent_decode_str(value).decode_utf8_lossy().into_owned();
                    pairs.push((key.to_string(), decoded));
                }
                _ => ignored.push(entry.to_string()),
            }
        }
    }
    debug!("extracted {} AI pairs from DL URI", pairs.len());
    Ok(DlExtract {
        element_string: element_string_from_pairs(&pairs),
        ignored_query_params: ignored,
    })
}

fn normalise_dl_gtin(value: String, permit_zero_suppressed: bool) -> Result<String, Gs1Error> {
    match value.len() {
        14 => Ok(value),
        8 | 12 | 13 if permit_zero_suppressed => Ok(format!("{value:0>14}")),
        _ => Err(Gs1Error::DlGtinNotFourteenDigits),
    }
}

fn element_string_from_pairs(pairs: &[(String, String)]) -> String {
    let mut out = String::from("^");
    for (i, (ai, value)) in pairs.iter().enumerate() {
        out.push_str(ai);
        out.push_str(value);
        if i + 1 < pairs.len() && aidata::ai_is_variable(ai) {
            out.push('^');
        }
    }
    out
}

/// Renders extracted AIs as a DL URI under `stem`.
///
/// The primary key leads the path, followed by its permitted qualifier
/// sequence; everything else becomes a query parameter.
pub(crate) fn generate_dl_uri(
    ais: &[AiValue],
    stem: Option<&str>,
    validations: &Validations,
) -> Result<String, Gs1Error> {
    let primary = ais
        .iter()
        .find(|v| DL_PRIMARY_KEYS.contains(&v.ai.as_str()))
        .ok_or(Gs1Error::DlNoPrimaryKeyAi)?;
    if validations.enabled(Validation::UnknownAiNotDlAttr) {
        if let Some(unknown) = ais.iter().find(|v| aidata::lookup_ai(&v.ai).is_none()) {
            return Err(Gs1Error::UnknownAiNotDlAttribute(unknown.ai.clone()));
        }
    }
    let mut uri = stem.unwrap_or(DEFAULT_STEM).trim_end_matches('/').to_string();
    let mut in_path = vec![primary.ai.as_str()];
    uri.push('/');
    uri.push_str(&primary.ai);
    uri.push('/');
    uri.push_str(&utf8_percent_encode(&primary.value, DL_COMPONENT).to_string());
    let qualifiers = DL_QUALIFIERS
        .iter()
        .find(|(key, _)| *key == primary.ai)
        .map(|(_, qualifiers)| *qualifiers)
        .unwrap_or_default();
    for qualifier in qualifiers {
        if let Some(v) = ais.iter().find(|v| v.ai == *qualifier) {
            uri.push('/');
            uri.push_str(&v.ai);
            uri.push('/');
            uri.push_str(&utf8_percent_encode(&v.value, DL_COMPONENT).to_string());
            in_path.push(qualifier);
        }
    }
    let query: Vec<String> = ais
        .iter()
        .filter(|v| !in_path.contains(&v.ai.as_str()))
        .map(|v| format!("{}={}", v.ai, utf8_percent_encode(&v.value, DL_COMPONENT)))
        .collect();
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query.join("&"));
    }
    Ok(uri)
}
