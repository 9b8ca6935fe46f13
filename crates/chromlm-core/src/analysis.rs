use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::post_url::PostUrl;

/// Reasoning key the back end uses for its own diagnostics; never shown as a factor.
const REASONING_ERROR_KEY: &str = "error";

/// Binary classification outcome. Free text is tolerated but only `Yes` and
/// `No` drive behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Yes,
    No,
    Other(String),
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Yes => "Yes",
            Verdict::No => "No",
            Verdict::Other(s) => s,
        }
    }
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Yes" => Verdict::Yes,
            "No" => Verdict::No,
            _ => Verdict::Other(value),
        }
    }
}

impl From<Verdict> for String {
    fn from(value: Verdict) -> Self {
        match value {
            Verdict::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence score in percent, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Certainty(u8);

impl Certainty {
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Lenient conversion of a wire value: numbers, or strings with a leading
    /// integer such as `"87"` or `"87%"`. Anything else has no certainty.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Self::new),
            Value::String(s) => parse_leading_int(s).map(Self::new),
            _ => None,
        }
    }
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    // Anything too long to fit is far outside 0..=100 anyway.
    let n = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * n)
}

fn deserialize_certainty<'de, D>(deserializer: D) -> Result<Option<Certainty>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Certainty::from_value(&value))
}

/// Value attached to a reasoning factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReasoningValue {
    Flag(bool),
    Text(String),
    Other(Value),
}

impl ReasoningValue {
    /// Booleans and `yes`/`no` strings (any case) read as flags.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ReasoningValue::Flag(b) => Some(*b),
            ReasoningValue::Text(s) if s.eq_ignore_ascii_case("yes") => Some(true),
            ReasoningValue::Text(s) if s.eq_ignore_ascii_case("no") => Some(false),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match (self.as_flag(), self) {
            (Some(true), _) => "Yes".to_string(),
            (Some(false), _) => "No".to_string(),
            (None, ReasoningValue::Text(s)) => s.clone(),
            (None, ReasoningValue::Other(v)) => v.to_string(),
            (None, ReasoningValue::Flag(b)) => b.to_string(),
        }
    }
}

/// A reasoning entry prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub name: String,
    pub value: String,
    /// `Some` when the value reads as a yes/no flag.
    pub positive: Option<bool>,
}

/// `urgency_language` -> `Urgency Language`.
pub fn format_factor_name(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

/// Verdict returned by the analysis back end.
///
/// When `error` is set the result is an error sentinel and the other fields
/// carry no meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(
        default,
        deserialize_with = "deserialize_certainty",
        skip_serializing_if = "Option::is_none"
    )]
    pub certainty: Option<Certainty>,
    #[serde(default)]
    pub reasoning: BTreeMap<String, ReasoningValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_mlm(&self) -> bool {
        !self.is_error() && self.verdict == Some(Verdict::Yes)
    }

    pub fn certainty_percent(&self) -> u8 {
        self.certainty.map(Certainty::get).unwrap_or(0)
    }

    pub fn factors(&self) -> Vec<Factor> {
        self.reasoning
            .iter()
            .filter(|(key, _)| key.as_str() != REASONING_ERROR_KEY)
            .map(|(key, value)| Factor {
                name: format_factor_name(key),
                value: value.display(),
                positive: value.as_flag(),
            })
            .collect()
    }
}

/// One entry of the history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub url: String,
    pub post_id: String,
    pub result: AnalysisResult,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(url: &PostUrl, result: AnalysisResult) -> Self {
        Self::at(url, result, Utc::now())
    }

    pub fn at(url: &PostUrl, result: AnalysisResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            url: url.as_str().to_string(),
            post_id: url.post_id(),
            result,
            timestamp,
        }
    }
}
