use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::{Language, LanguageManager};

/// Maximum size, in UTF-8 bytes, of the source code of a submission.
pub const MAX_SOURCE_SIZE: usize = 64 * 1024;

/// The reason why a source code did not produce a runnable unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileFailure {
    /// The source code is bigger than [`MAX_SOURCE_SIZE`](constant.MAX_SOURCE_SIZE.html).
    #[error("Source code too large: {size} bytes, the limit is {limit} bytes")]
    SourceTooLarge {
        /// Size of the submitted source.
        size: usize,
        /// The maximum allowed size.
        limit: usize,
    },
    /// The name of the entry point is not a valid identifier of the language.
    #[error("{name:?} is not a valid entry point for {language}")]
    InvalidEntryPoint {
        /// The rejected name.
        name: String,
        /// The language of the submission.
        language: Language,
    },
    /// The entry point is missing from the compiled unit.
    #[error("Entry point {0:?} not found in the compiled unit")]
    UnresolvedEntryPoint(String),
    /// The toolchain needed by the language is not available on the host.
    #[error("Toolchain {tool:?} is not available: {reason}")]
    ToolchainMissing {
        /// Name of the missing tool.
        tool: String,
        /// Why the tool cannot be used.
        reason: String,
    },
    /// The compiler rejected the source code.
    #[error("Compilation failed:\n{0}")]
    Diagnostics(String),
    /// The compilation could not be performed (I/O errors, compiler crashes, ...).
    #[error("Internal compilation error: {0}")]
    Internal(String),
}

impl CompileFailure {
    /// The text of the diagnostics emitted by the compiler, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            CompileFailure::Diagnostics(text) => Some(text),
            _ => None,
        }
    }
}

/// How to start a compiled unit from inside its loading namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    /// The program to execute.
    pub program: PathBuf,
    /// The arguments that come before the arguments of the entry point.
    pub args: Vec<String>,
}

/// A submission that was successfully compiled: its artifacts live in memory and are materialized
/// only inside a private loading namespace.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// The language of the source code.
    language: Language,
    /// The name of the entry point.
    entry_point: String,
    /// The artifacts of the compilation, keyed by their path relative to the namespace.
    artifacts: BTreeMap<PathBuf, Vec<u8>>,
    /// The artifacts that must be present for the entry point to be resolved.
    entry_artifacts: Vec<PathBuf>,
    /// How to start the entry point.
    launch: Launch,
}

impl CompiledUnit {
    pub(crate) fn new(
        language: Language,
        entry_point: &str,
        artifacts: BTreeMap<PathBuf, Vec<u8>>,
        entry_artifacts: Vec<PathBuf>,
        launch: Launch,
    ) -> CompiledUnit {
        CompiledUnit {
            language,
            entry_point: entry_point.to_string(),
            artifacts,
            entry_artifacts,
            launch,
        }
    }

    /// The language of the unit.
    pub fn language(&self) -> Language {
        self.language
    }

    /// The name of the entry point of the unit.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// The in-memory artifacts, keyed by their relative path.
    pub fn artifacts(&self) -> &BTreeMap<PathBuf, Vec<u8>> {
        &self.artifacts
    }

    /// The relative paths of the artifacts needed to resolve the entry point.
    pub fn entry_artifacts(&self) -> &[PathBuf] {
        &self.entry_artifacts
    }

    /// How to start the entry point.
    pub fn launch(&self) -> &Launch {
        &self.launch
    }

    /// Check that all the artifacts needed by the entry point are present.
    pub fn resolve_entry_point(&self) -> Result<(), CompileFailure> {
        match self
            .entry_artifacts
            .iter()
            .find(|path| !self.artifacts.contains_key(path.as_path()))
        {
            Some(missing) => {
                debug!("Artifact {} is missing", missing.display());
                Err(CompileFailure::UnresolvedEntryPoint(self.entry_point.clone()))
            }
            None => Ok(()),
        }
    }

    /// Remove an artifact from the unit. Used for checking the resolution of the entry point.
    #[cfg(test)]
    pub(crate) fn remove_artifact<P: AsRef<std::path::Path>>(&mut self, path: P) {
        self.artifacts.remove(path.as_ref());
    }
}

/// Compile the source code of a submission into a [`CompiledUnit`](struct.CompiledUnit.html).
///
/// Every error, including the ones of the toolchain itself, is reported as a
/// [`CompileFailure`](enum.CompileFailure.html): a submission that cannot be compiled is never a
/// fatal error for the caller.
pub fn compile(
    source: &str,
    entry_point: &str,
    language: Language,
) -> Result<CompiledUnit, CompileFailure> {
    if source.len() > MAX_SOURCE_SIZE {
        return Err(CompileFailure::SourceTooLarge {
            size: source.len(),
            limit: MAX_SOURCE_SIZE,
        });
    }
    let adapter = LanguageManager::from_language(language)
        .ok_or_else(|| CompileFailure::Internal(format!("No adapter for {}", language)))?;
    if !adapter.is_valid_entry_point(entry_point) {
        return Err(CompileFailure::InvalidEntryPoint {
            name: entry_point.to_string(),
            language,
        });
    }
    debug!("Compiling {} ({}, {} bytes)", entry_point, language, source.len());
    let unit = adapter.compile(source, entry_point)?;
    unit.resolve_entry_point()?;
    Ok(unit)
}
