use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::languages::*;
use crate::Launch;

/// Name of the class of the launcher harness.
pub(crate) const LAUNCHER_CLASS: &str = "__PcpLauncher";

/// Source of the launcher harness, see `render_harness`.
const LAUNCHER_TEMPLATE: &str = include_str!("harness/Launcher.java");

/// Reserved words of Java, they cannot be used as class names.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "record", "return",
    "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "var", "void", "volatile", "while", "yield", "_",
];

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("Invalid regex");
}

/// Configuration of the Java toolchain.
#[derive(Debug, Clone)]
pub(crate) struct LanguageJavaConfiguration {
    /// The compiler, searched in `$PATH` at each compilation.
    pub compiler: OsString,
    /// The runtime, searched in `$PATH` at each compilation.
    pub runtime: OsString,
}

impl LanguageJavaConfiguration {
    /// Build the configuration reading the `PCP_JAVAC` and `PCP_JAVA` environment variables.
    pub fn from_env() -> LanguageJavaConfiguration {
        LanguageJavaConfiguration {
            compiler: std::env::var_os("PCP_JAVAC").unwrap_or_else(|| "javac".into()),
            runtime: std::env::var_os("PCP_JAVA").unwrap_or_else(|| "java".into()),
        }
    }
}

/// The Java language, compiled with `javac`.
#[derive(Debug)]
pub(crate) struct LanguageJava {
    config: LanguageJavaConfiguration,
}

impl LanguageJava {
    /// Make a new `LanguageJava` using the specified configuration.
    pub fn new(config: LanguageJavaConfiguration) -> LanguageJava {
        LanguageJava { config }
    }
}

impl LanguageAdapter for LanguageJava {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["java"]
    }

    fn is_valid_entry_point(&self, name: &str) -> bool {
        IDENTIFIER.is_match(name) && !RESERVED_WORDS.contains(&name) && name != LAUNCHER_CLASS
    }

    fn compile(&self, source: &str, entry_point: &str) -> Result<CompiledUnit, CompileFailure> {
        let javac = find_tool(&self.config.compiler)?;
        let java = find_tool(&self.config.runtime)?;

        let scratch = TempDir::with_prefix("pcp-javac-")
            .map_err(|e| CompileFailure::Internal(format!("Cannot create scratch dir: {}", e)))?;
        let src_dir = scratch.path().join("src");
        let out_dir = scratch.path().join("out");
        let write = |path: &Path, content: &str| {
            std::fs::write(path, content).map_err(|e| {
                CompileFailure::Internal(format!("Cannot write {}: {}", path.display(), e))
            })
        };
        for dir in [&src_dir, &out_dir] {
            std::fs::create_dir(dir).map_err(|e| {
                CompileFailure::Internal(format!("Cannot create {}: {}", dir.display(), e))
            })?;
        }
        let entry_source = src_dir.join(format!("{}.java", entry_point));
        let launcher_source = src_dir.join(format!("{}.java", LAUNCHER_CLASS));
        write(&entry_source, source)?;
        write(
            &launcher_source,
            &render_harness(LAUNCHER_TEMPLATE, entry_point),
        )?;

        let mut command = Command::new(&javac);
        command
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-nowarn")
            .arg("-d")
            .arg(&out_dir)
            .arg(&entry_source)
            .arg(&launcher_source)
            .current_dir(scratch.path());
        let output = run_tool(command, None)?;
        if !output.status.success() {
            return Err(CompileFailure::Diagnostics(
                diagnostics_of(&output).replace(&format!("{}/", src_dir.display()), ""),
            ));
        }

        let artifacts = collect_classes(&out_dir)?;
        debug!(
            "Compiled {} into {} class files",
            entry_point,
            artifacts.len()
        );
        Ok(CompiledUnit::new(
            Language::Java,
            entry_point,
            artifacts,
            vec![
                PathBuf::from(format!("{}.class", entry_point)),
                PathBuf::from(format!("{}.class", LAUNCHER_CLASS)),
            ],
            Launch {
                program: java,
                args: vec![
                    "-Dfile.encoding=UTF-8".into(),
                    "-XX:+UseSerialGC".into(),
                    "-cp".into(),
                    ".".into(),
                    LAUNCHER_CLASS.into(),
                ],
            },
        ))
    }
}

/// Read all the `.class` files inside `dir` into memory, keyed by their path relative to `dir`.
fn collect_classes(dir: &Path) -> Result<BTreeMap<PathBuf, Vec<u8>>, CompileFailure> {
    let mut classes = BTreeMap::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| CompileFailure::Internal(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map(|ext| ext != "class").unwrap_or(true) {
            continue;
        }
        let relative = path
            .strip_prefix(dir)
            .map_err(|e| CompileFailure::Internal(e.to_string()))?
            .to_path_buf();
        let content = std::fs::read(path).map_err(|e| {
            CompileFailure::Internal(format!("Cannot read {}: {}", path.display(), e))
        })?;
        classes.insert(relative, content);
    }
    Ok(classes)
}
