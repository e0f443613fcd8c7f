//! Share-link encoding for playlists.
//!
//! Current links carry the whole playlist in one query parameter: a JSON array
//! of `{url, startTime}` objects, base64 encoded with the URL-safe alphabet.
//! Older links used one `videoN=<url>|<startTime>` parameter per entry; those
//! are still read when the token is missing or unreadable.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use log::{debug, info};
use url::Url;

use crate::{config::ShareConfig, start_time_input::parse_leading_seconds};

/// Persisted projection of an entry. Field names match the JSON wire form.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SavedEntry {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "startTime", default)]
    pub start_time: f64,
}

/// Which decode tier produced the initial playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSource {
    Token,
    Legacy,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPlaylist {
    pub entries: Vec<SavedEntry>,
    pub source: DecodeSource,
}

/// Reasons a playlist token could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ShareLinkError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token payload is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("token payload is not a playlist: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid page url: {0}")]
    Url(#[from] url::ParseError),
}

/// Writes the current query string without reloading the page.
pub trait AddressBar {
    /// `query` includes the leading `?`.
    fn replace_query(&mut self, query: &str);
}

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes entries as a URL-safe token.
pub fn encode_token(entries: &[SavedEntry]) -> Result<String, ShareLinkError> {
    let json = serde_json::to_string(entries)?;
    Ok(URL_SAFE_LENIENT.encode(json.as_bytes()))
}

/// Decodes a token. Both base64 alphabets are accepted, padded or not.
pub fn decode_token(token: &str) -> Result<Vec<SavedEntry>, ShareLinkError> {
    // A raw `+` from the standard alphabet arrives as a space after query decoding.
    let token = token.trim().replace(' ', "+");
    let bytes = match URL_SAFE_LENIENT.decode(&token) {
        Ok(bytes) => bytes,
        Err(_) => STANDARD_LENIENT.decode(&token)?,
    };
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str::<Vec<SavedEntry>>(&json)?)
}

/// Decoded `key=value` pairs of a query string, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses `?a=1&b=2` (leading `?` optional). Pairs that fail percent
    /// decoding are dropped.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Some((decode_component(key)?, decode_component(value)?))
            })
            .collect();
        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

fn decode_component(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Splits a legacy `<url><delimiter><startTime>` value on the first delimiter.
/// The start time is the numeric prefix of the tail, so `1.5s` reads as 1.5;
/// a missing or unreadable start time reads as zero.
pub fn parse_legacy_value(value: &str, delimiter: char) -> SavedEntry {
    let (url, tail) = value.split_once(delimiter).unwrap_or((value, ""));
    let start_time = parse_leading_seconds(tail).unwrap_or(0.0);
    SavedEntry {
        url: url.to_string(),
        start_time,
    }
}

/// Reads `video0`, `video1`, ... until the first missing index.
pub fn decode_legacy(params: &QueryParams, share: &ShareConfig) -> Vec<SavedEntry> {
    (0..)
        .map(|index| params.get(&format!("{}{}", share.legacy_param_prefix, index)))
        .take_while(Option::is_some)
        .flatten()
        .map(|value| parse_legacy_value(value, share.legacy_delimiter))
        .collect()
}

/// Restores a playlist from a query string: token first, then the legacy
/// parameters, then empty.
pub fn decode_query(query: &str, share: &ShareConfig) -> DecodedPlaylist {
    let params = QueryParams::parse(query);

    if let Some(token) = params.get(&share.token_param) {
        match decode_token(token) {
            Ok(entries) => {
                info!("ShareLink: restored {} entries from token", entries.len());
                return DecodedPlaylist {
                    entries,
                    source: DecodeSource::Token,
                };
            }
            Err(err) => debug!("ShareLink: ignoring unreadable token: {}", err),
        }
    }

    let legacy = decode_legacy(&params, share);
    if !legacy.is_empty() {
        info!("ShareLink: restored {} entries from legacy parameters", legacy.len());
        return DecodedPlaylist {
            entries: legacy,
            source: DecodeSource::Legacy,
        };
    }

    DecodedPlaylist {
        entries: Vec::new(),
        source: DecodeSource::Empty,
    }
}

/// Builds the `?<token_param>=<token>` query for a save.
pub fn encode_query(entries: &[SavedEntry], share: &ShareConfig) -> Result<String, ShareLinkError> {
    Ok(format!(
        "?{}={}",
        urlencoding::encode(&share.token_param),
        encode_token(entries)?
    ))
}

/// Replaces the query of `base_url` with the encoded playlist. Any fragment is dropped.
pub fn share_url(
    base_url: &str,
    entries: &[SavedEntry],
    share: &ShareConfig,
) -> Result<String, ShareLinkError> {
    let mut url = Url::parse(base_url)?;
    let query = encode_query(entries, share)?;
    url.set_fragment(None);
    url.set_query(Some(query.trim_start_matches('?')));
    Ok(url.to_string())
}

/// Query part of an absolute url, including the `?`. Empty when the url has
/// no query or does not parse.
pub fn query_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(url) => url
            .query()
            .map(|query| format!("?{}", query))
            .unwrap_or_default(),
        Err(err) => {
            debug!("ShareLink: cannot read query of {:?}: {}", url, err);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_query, decode_token, encode_query, encode_token, parse_legacy_value, query_of,
        share_url, DecodeSource, QueryParams, SavedEntry, ShareLinkError,
    };
    use crate::config::ShareConfig;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn saved(url: &str, start_time: f64) -> SavedEntry {
        SavedEntry {
            url: url.to_string(),
            start_time,
        }
    }

    #[test]
    fn test_token_round_trip_preserves_order_and_offsets() {
        let entries = vec![
            saved("https://cdn.example.com/a.mp4?x=1&y=2", 12.35),
            saved("https://cdn.example.com/ü.webm", 0.0),
            saved("", -1.5),
        ];
        let query = encode_query(&entries, &ShareConfig::default()).expect("encode should succeed");
        let decoded = decode_query(&query, &ShareConfig::default());
        assert_eq!(decoded.source, DecodeSource::Token);
        assert_eq!(decoded.entries, entries);
    }

    #[test]
    fn test_token_is_query_safe() {
        let entries = vec![saved("https://cdn.example.com/??>>~~", 3.0)];
        let token = encode_token(&entries).expect("encode should succeed");
        assert!(token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn test_token_uses_start_time_field_name() {
        let token = encode_token(&[saved("http://a", 1.5)]).expect("encode should succeed");
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .expect("token should be url-safe base64");
        let json = String::from_utf8(bytes).expect("payload should be utf-8");
        assert_eq!(json, r#"[{"url":"http://a","startTime":1.5}]"#);
    }

    #[test]
    fn test_standard_padded_token_is_accepted() {
        let token = STANDARD.encode(r#"[{"url":"http://a","startTime":2}]"#);
        let entries = decode_token(&token).expect("standard token should decode");
        assert_eq!(entries, vec![saved("http://a", 2.0)]);
    }

    #[test]
    fn test_percent_encoded_standard_token_is_accepted() {
        let token = STANDARD.encode(r#"[{"url":"http://a?>>","startTime":4}]"#);
        let query = format!("?id={}", urlencoding::encode(&token));
        let decoded = decode_query(&query, &ShareConfig::default());
        assert_eq!(decoded.source, DecodeSource::Token);
        assert_eq!(decoded.entries, vec![saved("http://a?>>", 4.0)]);
    }

    #[test]
    fn test_legacy_parameters_are_read_in_order() {
        let decoded = decode_query(
            "?video0=http%3A%2F%2Fa%7C1.5&video1=http://b|0",
            &ShareConfig::default(),
        );
        assert_eq!(decoded.source, DecodeSource::Legacy);
        assert_eq!(
            decoded.entries,
            vec![saved("http://a", 1.5), saved("http://b", 0.0)]
        );
    }

    #[test]
    fn test_legacy_scan_stops_at_first_gap() {
        let decoded = decode_query("video0=http://a|1&video2=http://c|3", &ShareConfig::default());
        assert_eq!(decoded.entries, vec![saved("http://a", 1.0)]);
    }

    #[test]
    fn test_malformed_token_falls_back_to_legacy() {
        let decoded = decode_query("?id=%%%not-a-token&video0=http://a|2", &ShareConfig::default());
        assert_eq!(decoded.source, DecodeSource::Legacy);
        assert_eq!(decoded.entries, vec![saved("http://a", 2.0)]);

        let not_a_list = STANDARD.encode(r#"{"url":"http://a"}"#);
        let decoded = decode_query(&format!("?id={}", not_a_list), &ShareConfig::default());
        assert_eq!(decoded.source, DecodeSource::Empty);
        assert!(decoded.entries.is_empty());
    }

    #[test]
    fn test_empty_query_decodes_to_empty_playlist() {
        let decoded = decode_query("", &ShareConfig::default());
        assert_eq!(decoded.source, DecodeSource::Empty);
        assert!(decoded.entries.is_empty());
    }

    #[test]
    fn test_legacy_value_splits_on_first_delimiter() {
        assert_eq!(parse_legacy_value("http://a|7.25", '|'), saved("http://a", 7.25));
        assert_eq!(parse_legacy_value("http://a|x|3", '|'), saved("http://a", 0.0));
        assert_eq!(parse_legacy_value("http://a", '|'), saved("http://a", 0.0));
    }

    #[test]
    fn test_legacy_value_reads_numeric_prefix_of_start_time() {
        assert_eq!(parse_legacy_value("http://a|1.5s", '|'), saved("http://a", 1.5));
        assert_eq!(parse_legacy_value("http://a| 12abc", '|'), saved("http://a", 12.0));
        assert_eq!(parse_legacy_value("http://a|x", '|'), saved("http://a", 0.0));
    }

    #[test]
    fn test_query_params_decode_plus_and_percent() {
        let params = QueryParams::parse("?a=one+two&b=%2F%7C&flag");
        assert_eq!(params.get("a"), Some("one two"));
        assert_eq!(params.get("b"), Some("/|"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_share_url_replaces_query_and_fragment() {
        let entries = vec![saved("http://a", 1.0)];
        let url = share_url(
            "https://sync.example.com/view?old=1#top",
            &entries,
            &ShareConfig::default(),
        )
        .expect("share url should build");
        assert!(url.starts_with("https://sync.example.com/view?id="));
        assert!(!url.contains('#'));
        let decoded = decode_query(&query_of(&url), &ShareConfig::default());
        assert_eq!(decoded.entries, entries);
    }

    #[test]
    fn test_share_url_rejects_unparseable_base() {
        let result = share_url("not a url", &[saved("http://a", 1.0)], &ShareConfig::default());
        assert!(matches!(result, Err(ShareLinkError::Url(_))));
    }

    #[test]
    fn test_query_of_handles_missing_query() {
        assert_eq!(query_of("https://sync.example.com/view"), "");
        assert_eq!(query_of("https://sync.example.com/view?id=x#frag"), "?id=x");
        assert_eq!(query_of("not a url"), "");
    }

    #[test]
    fn test_query_of_ignores_question_mark_in_fragment() {
        assert_eq!(query_of("https://sync.example.com/view#section?id=x"), "");
        assert_eq!(query_of("https://sync.example.com/view?a=1#b?c=2"), "?a=1");
    }
}
