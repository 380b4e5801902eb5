//! Server state payloads
//!
//! This module defines what the population server sends to the view:
//! - `StateSnapshot`: full state from `GET /state`, including the people list
//! - `StateFragment`: partial state pushed on `GET /stream` (no people)
//! - `Version`: opaque revision token, used for cache-busting and stale checks

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::error::{PadronError, PadronResult};

/// Opaque token identifying one revision of server state
///
/// The server currently sends an integer, but the view treats the value as
/// opaque and accepts text tokens as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Number(i64),
    Text(String),
}

impl Version {
    /// Order two tokens when they are comparable
    ///
    /// Numbers are ordered numerically. Text tokens are only known to be
    /// equal or different, never older or newer. Mixed kinds are unordered.
    pub fn compare(&self, other: &Version) -> Option<Ordering> {
        match (self, other) {
            (Version::Number(a), Version::Number(b)) => Some(a.cmp(b)),
            (Version::Text(a), Version::Text(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Whether this token is known to be strictly older than `other`
    pub fn is_older_than(&self, other: &Version) -> bool {
        self.compare(other) == Some(Ordering::Less)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Number(n) => write!(f, "{}", n),
            Version::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Version {
    fn from(n: i64) -> Self {
        Version::Number(n)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::Text(s.to_string())
    }
}

/// Summary counters shown above the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counts {
    pub people: u64,
    pub living: u64,
    pub unions: u64,
    pub families: u64,
}

/// One row of the people table as sent by the server
///
/// The server sends full person records; everything the table does not
/// display (`genero`, `genome`, `historial`, ...) is ignored. The server
/// stores whatever clients post, so each displayed field is read leniently:
/// a record with an odd value still yields a row instead of failing the
/// whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    /// Text or bare number; anything else reads as absent
    #[serde(default, deserialize_with = "loose_id")]
    pub cedula: Option<String>,
    #[serde(default, deserialize_with = "loose_name")]
    pub nombre: String,
    #[serde(default, deserialize_with = "loose_age")]
    pub edad: u64,
    /// Alive unless the server explicitly says `false`
    #[serde(default = "alive", deserialize_with = "null_is_alive")]
    pub vivo: bool,
    #[serde(default, deserialize_with = "loose_id")]
    pub pareja: Option<String>,
    /// Child ids; a non-list reads as no children
    #[serde(default, deserialize_with = "loose_ids")]
    pub hijos: Vec<String>,
}

fn alive() -> bool {
    true
}

fn null_is_alive<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(!matches!(Value::deserialize(deserializer)?, Value::Bool(false)))
}

fn id_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn loose_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_text(Value::deserialize(deserializer)?))
}

fn loose_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn loose_age<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let age = match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(age)
}

fn loose_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = match Value::deserialize(deserializer)? {
        // Every entry counts as a child, whatever its shape
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(ids)
}

impl PersonSummary {
    /// Create a living person with no partner and no children
    pub fn new(cedula: impl Into<String>, nombre: impl Into<String>, edad: u64) -> Self {
        Self {
            cedula: Some(cedula.into()),
            nombre: nombre.into(),
            edad,
            vivo: true,
            pareja: None,
            hijos: Vec::new(),
        }
    }

    /// Builder method: set partner
    pub fn pareja(mut self, cedula: impl Into<String>) -> Self {
        self.pareja = Some(cedula.into());
        self
    }

    /// Builder method: add a child
    pub fn hijo(mut self, cedula: impl Into<String>) -> Self {
        self.hijos.push(cedula.into());
        self
    }

    /// Builder method: mark as deceased
    pub fn fallecido(mut self) -> Self {
        self.vivo = false;
        self
    }

    /// Number of children, the only thing the table shows about `hijos`
    pub fn child_count(&self) -> usize {
        self.hijos.len()
    }
}

/// Full point-in-time state from `GET /state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub year: i64,
    pub counts: Counts,
    pub version: Version,
    #[serde(default)]
    pub people: Vec<PersonSummary>,
}

impl StateSnapshot {
    /// Parse a `GET /state` body
    pub fn parse(body: &str) -> PadronResult<Self> {
        serde_json::from_str(body).map_err(PadronError::from)
    }
}

/// Partial state pushed on the stream: counters only, never people
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFragment {
    pub year: i64,
    pub counts: Counts,
    #[serde(default)]
    pub version: Option<Version>,
}

impl StateFragment {
    /// Parse one push message
    ///
    /// The whole message is validated before anything is applied, so a
    /// message missing `counts` changes nothing on screen.
    pub fn parse(message: &str) -> PadronResult<Self> {
        serde_json::from_str(message).map_err(PadronError::from)
    }
}

impl From<&StateSnapshot> for StateFragment {
    fn from(snapshot: &StateSnapshot) -> Self {
        Self {
            year: snapshot.year,
            counts: snapshot.counts,
            version: Some(snapshot.version.clone()),
        }
    }
}
