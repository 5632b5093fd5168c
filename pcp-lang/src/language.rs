use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The languages a submission can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    /// Java, compiled with `javac` and run on the host JVM.
    #[serde(rename = "java")]
    Java,
    /// Python 3, checked and run by the host interpreter.
    #[serde(rename = "python3")]
    Python3,
}

/// The name of a language is not known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown language: {0:?}")]
pub struct UnknownLanguage(pub String);

impl Language {
    /// All the supported languages.
    pub fn all() -> &'static [Language] {
        &[Language::Java, Language::Python3]
    }

    /// The identifier of the language, as used in the configuration and in the API.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python3 => "python3",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "python3" | "python" => Ok(Language::Python3),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}
