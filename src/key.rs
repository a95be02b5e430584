//! EBD keys (`E_0003`) and the heading convention `E_0003_<title>`

use crate::EbdError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const EBD_KEY_PATTERN: &str = r"^E_\d{4}$";

static EBD_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(EBD_KEY_PATTERN).unwrap());

static EBD_KEY_WITH_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<key>E_\d{4})_(?P<title>.*?)\s*$").unwrap());

/// A validated EBD key such as `E_0003`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EbdKey(String);

impl EbdKey {
    /// Validate `key` against [`EBD_KEY_PATTERN`]
    pub fn parse(key: &str) -> Result<Self, EbdError> {
        if EBD_KEY_RE.is_match(key) {
            Ok(Self(key.to_string()))
        } else {
            Err(EbdError::InvalidKeyFormat {
                key: key.to_string(),
                pattern: EBD_KEY_PATTERN,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EbdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EbdKey {
    type Err = EbdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EbdKey {
    type Error = EbdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EbdKey> for String {
    fn from(key: EbdKey) -> Self {
        key.0
    }
}

impl AsRef<str> for EbdKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split a heading like `E_0003_Bestellung prüfen` into key and title
pub fn split_key_heading(text: &str) -> Option<(EbdKey, String)> {
    let caps = EBD_KEY_WITH_HEADING_RE.captures(text)?;
    let key = EbdKey(caps["key"].to_string());
    Some((key, caps["title"].to_string()))
}
