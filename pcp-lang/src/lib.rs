//! Crate for turning the source code of a submission into a unit that can be executed.
//!
//! The supported languages form a closed set, see [`Language`](enum.Language.html). Each of them
//! is backed by a [`LanguageAdapter`](trait.LanguageAdapter.html) that knows how to validate the
//! entry point, invoke the host toolchain and describe how the compiled unit has to be launched.
//!
//! Nothing is written to persistent storage: the artifacts produced by the toolchain are read back
//! into memory and the scratch directory used by the compiler is removed before returning.
//!
//! Every unit is started through a small launcher harness, written in the language of the
//! submission. Only the harness reports a completed run, with the exit code
//! [`COMPLETION_EXIT_CODE`](constant.COMPLETION_EXIT_CODE.html); the attempts of the submitted code
//! to terminate its process become [`TERMINATION_EXIT_CODE`](constant.TERMINATION_EXIT_CODE.html).
//!
//! # Example
//!
//! ```
//! use pcp_lang::{Language, LanguageManager};
//!
//! let lang = LanguageManager::detect_language("Main.java").expect("unknown lang");
//! assert_eq!(lang, Language::Java);
//! assert!(LanguageManager::detect_language("main.cpp").is_none());
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod compiler;
mod language;
mod languages;

pub use compiler::{compile, CompileFailure, CompiledUnit, Launch, MAX_SOURCE_SIZE};
pub use language::{Language, UnknownLanguage};
pub use languages::LanguageAdapter;

use std::path::Path;
use std::sync::Arc;

/// Exit code used by the launcher harnesses when the submitted code tries to terminate its
/// process (e.g. `System.exit`, `sys.exit`, `os._exit`).
pub const TERMINATION_EXIT_CODE: i32 = 86;

/// Exit code used by the launcher harnesses when the entry point returned. A process that exits
/// with `0` bypassed the harness.
pub const COMPLETION_EXIT_CODE: i32 = 85;

/// Manager of all the known languages, you should use this to get the
/// [`LanguageAdapter`](trait.LanguageAdapter.html) of a language.
pub struct LanguageManager {
    /// The adapters of all the known languages.
    known_languages: Vec<Arc<dyn LanguageAdapter>>,
}

impl LanguageManager {
    /// Make a new `LanguageManager` with all the known languages.
    fn new() -> LanguageManager {
        LanguageManager {
            known_languages: vec![
                Arc::new(languages::java::LanguageJava::new(
                    languages::java::LanguageJavaConfiguration::from_env(),
                )),
                Arc::new(languages::python::LanguagePython::new(
                    languages::python::LanguagePythonConfiguration::from_env(),
                )),
            ],
        }
    }

    /// Given a path to a file guess the language of the source file using its extension.
    ///
    /// ```
    /// use pcp_lang::{Language, LanguageManager};
    ///
    /// assert_eq!(LanguageManager::detect_language("sol.py"), Some(Language::Python3));
    /// assert_eq!(LanguageManager::detect_language("Sol.JAVA"), Some(Language::Java));
    /// assert_eq!(LanguageManager::detect_language("sol"), None);
    /// ```
    pub fn detect_language<P: AsRef<Path>>(path: P) -> Option<Language> {
        let ext = path
            .as_ref()
            .extension()
            .map(|s| s.to_string_lossy())
            .unwrap_or_else(|| "".into())
            .to_lowercase();
        LANGUAGE_MANAGER_SINGL
            .known_languages
            .iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
            .map(|lang| lang.language())
    }

    /// Get the adapter that handles the specified language.
    pub fn from_language(language: Language) -> Option<Arc<dyn LanguageAdapter>> {
        LANGUAGE_MANAGER_SINGL
            .known_languages
            .iter()
            .find(|lang| lang.language() == language)
            .cloned()
    }
}

lazy_static! {
    /// The singleton instance of the `LanguageManager`.
    static ref LANGUAGE_MANAGER_SINGL: LanguageManager = LanguageManager::new();
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn test_detect_language() {
        assert_that!(LanguageManager::detect_language("Main.java")).is_equal_to(Some(Language::Java));
        assert_that!(LanguageManager::detect_language("dir/sol.py"))
            .is_equal_to(Some(Language::Python3));
        assert_that!(LanguageManager::detect_language("sol.rb")).is_none();
        assert_that!(LanguageManager::detect_language("Makefile")).is_none();
    }

    #[test]
    fn test_every_language_has_an_adapter() {
        for lang in Language::all() {
            let adapter = LanguageManager::from_language(*lang).expect("missing adapter");
            assert_that!(adapter.language()).is_equal_to(*lang);
        }
    }
}
