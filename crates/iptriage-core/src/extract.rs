//! Address extraction
//!
//! Turns one raw log line into a lazy sequence of IPv4-shaped candidate
//! strings. A line is first decoded as a structured [`LogRecord`]; if that
//! yields a non-empty `ip` field, it is the only candidate. Otherwise the whole
//! raw line is scanned for dotted-quad tokens.
//!
//! Extraction is lexical only: `999.999.999.999` is a candidate. Range checks
//! happen in [`crate::validate`].
//!
//! Object keys match case-insensitively (`"IP"` fills `ip`) and a repeated
//! key keeps its last value. A `null` value leaves the field as it was.

use regex::bytes::{Matches, Regex};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

/// Four groups of 1-3 ASCII digits separated by dots, on ASCII word boundaries
static IPV4_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(?:[0-9]{1,3}\.){3}[0-9]{1,3}(?-u:\b)")
        .expect("IPv4 token pattern is a valid regex")
});

/// A structured log line
///
/// All fields are optional; unknown fields are ignored. A known field whose
/// value is neither a string nor `null` fails the decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    /// Free-text origin of the line (e.g. "fw1")
    pub source: Option<String>,
    /// Candidate address
    pub ip: Option<String>,
    /// Free-text message
    pub message: Option<String>,
}

impl LogRecord {
    /// The `ip` field, if present and non-empty
    pub fn candidate_ip(&self) -> Option<&str> {
        self.ip.as_deref().filter(|ip| !ip.is_empty())
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        if key.eq_ignore_ascii_case("ip") {
            Some(&mut self.ip)
        } else if key.eq_ignore_ascii_case("source") {
            Some(&mut self.source)
        } else if key.eq_ignore_ascii_case("message") {
            Some(&mut self.message)
        } else {
            None
        }
    }
}

impl<'de> Deserialize<'de> for LogRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LogRecordVisitor)
    }
}

struct LogRecordVisitor;

impl<'de> Visitor<'de> for LogRecordVisitor {
    type Value = LogRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<LogRecord, A::Error> {
        let mut record = LogRecord::default();

        // Entries are applied in document order, so later keys overwrite
        while let Some(key) = map.next_key::<String>()? {
            match record.field_mut(&key) {
                Some(slot) => {
                    if let Some(value) = map.next_value::<Option<String>>()? {
                        *slot = Some(value);
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(record)
    }
}

/// A line after the structured decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// The line decoded as a JSON object with the [`LogRecord`] shape
    Structured(LogRecord),
    /// Anything else
    Unstructured,
}

/// Try to decode `line` as a [`LogRecord`]
pub fn parse_line(line: &[u8]) -> ParsedLine {
    // Only objects count; skip the decoder for anything else
    let is_object = line
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{');
    if !is_object {
        return ParsedLine::Unstructured;
    }

    match serde_json::from_slice::<LogRecord>(line) {
        Ok(record) => ParsedLine::Structured(record),
        Err(_) => ParsedLine::Unstructured,
    }
}

/// Extract candidate addresses from a raw line
pub fn extract(line: &[u8]) -> Candidates<'_> {
    if let ParsedLine::Structured(record) = parse_line(line)
        && let Some(ip) = record.ip.filter(|ip| !ip.is_empty())
    {
        return Candidates {
            inner: CandidatesInner::Field(Some(ip)),
        };
    }

    Candidates {
        inner: CandidatesInner::Scan(IPV4_TOKEN.find_iter(line)),
    }
}

/// Lazy iterator over candidate addresses, in line order
pub struct Candidates<'a> {
    inner: CandidatesInner<'a>,
}

enum CandidatesInner<'a> {
    /// The single structured `ip` field
    Field(Option<String>),
    /// Left-to-right, non-overlapping pattern matches
    Scan(Matches<'static, 'a>),
}

impl<'a> Iterator for Candidates<'a> {
    type Item = Cow<'a, str>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            CandidatesInner::Field(ip) => ip.take().map(Cow::Owned),
            CandidatesInner::Scan(matches) => loop {
                let m = matches.next()?;
                // Matches are pure ASCII, so this never skips in practice
                if let Ok(token) = std::str::from_utf8(m.as_bytes()) {
                    return Some(Cow::Borrowed(token));
                }
            },
        }
    }
}

impl std::fmt::Debug for Candidates<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            CandidatesInner::Field(ip) => f.debug_tuple("Field").field(ip).finish(),
            CandidatesInner::Scan(_) => f.debug_tuple("Scan").finish(),
        }
    }
}
