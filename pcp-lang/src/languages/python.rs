use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use regex::Regex;

use crate::languages::*;
use crate::Launch;

/// Name of the file of the launcher harness inside the loading namespace.
pub(crate) const LAUNCHER_FILE: &str = "__pcp_launcher.py";

/// Source of the launcher harness, see `render_harness`.
const LAUNCHER_TEMPLATE: &str = include_str!("harness/launcher.py");

/// Script that checks the syntax of the source read from stdin. The name of the module is the
/// first argument.
const SYNTAX_CHECK: &str = r#"
import sys, traceback
source = sys.stdin.buffer.read()
try:
    compile(source, sys.argv[1] + ".py", "exec", dont_inherit=True)
except (SyntaxError, ValueError):
    traceback.print_exc(limit=0)
    sys.exit(1)
"#;

/// Keywords of Python 3, they cannot be used as module names.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex");
}

/// Configuration of the Python toolchain.
#[derive(Debug, Clone)]
pub(crate) struct LanguagePythonConfiguration {
    /// The interpreter, searched in `$PATH` at each compilation.
    pub interpreter: OsString,
}

impl LanguagePythonConfiguration {
    /// Build the configuration reading the `PCP_PYTHON` environment variable.
    pub fn from_env() -> LanguagePythonConfiguration {
        LanguagePythonConfiguration {
            interpreter: std::env::var_os("PCP_PYTHON").unwrap_or_else(|| "python3".into()),
        }
    }
}

/// The Python 3 language. There is no real compilation step, the syntax of the source is checked
/// by the interpreter and the source is kept in memory.
#[derive(Debug)]
pub(crate) struct LanguagePython {
    config: LanguagePythonConfiguration,
}

impl LanguagePython {
    /// Make a new `LanguagePython` using the specified configuration.
    pub fn new(config: LanguagePythonConfiguration) -> LanguagePython {
        LanguagePython { config }
    }
}

impl LanguageAdapter for LanguagePython {
    fn language(&self) -> Language {
        Language::Python3
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["py"]
    }

    fn is_valid_entry_point(&self, name: &str) -> bool {
        IDENTIFIER.is_match(name) && !KEYWORDS.contains(&name)
    }

    fn compile(&self, source: &str, entry_point: &str) -> Result<CompiledUnit, CompileFailure> {
        let python = find_tool(&self.config.interpreter)?;

        let mut command = Command::new(&python);
        command.arg("-I").arg("-c").arg(SYNTAX_CHECK).arg(entry_point);
        let output = run_tool(command, Some(source.as_bytes()))?;
        if !output.status.success() {
            return Err(CompileFailure::Diagnostics(diagnostics_of(&output)));
        }

        let module = PathBuf::from(format!("{}.py", entry_point));
        let mut artifacts = BTreeMap::new();
        artifacts.insert(module.clone(), source.as_bytes().to_vec());
        artifacts.insert(
            PathBuf::from(LAUNCHER_FILE),
            render_harness(LAUNCHER_TEMPLATE, entry_point).into_bytes(),
        );
        Ok(CompiledUnit::new(
            Language::Python3,
            entry_point,
            artifacts,
            vec![module, PathBuf::from(LAUNCHER_FILE)],
            Launch {
                program: python,
                args: vec![
                    "-I".into(),
                    "-u".into(),
                    LAUNCHER_FILE.into(),
                    entry_point.into(),
                ],
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    fn lang() -> LanguagePython {
        LanguagePython::new(LanguagePythonConfiguration::from_env())
    }

    #[test]
    fn test_entry_point_validation() {
        let lang = lang();
        assert_that!(lang.is_valid_entry_point("solution")).is_true();
        assert_that!(lang.is_valid_entry_point("_sol2")).is_true();
        assert_that!(lang.is_valid_entry_point("2sol")).is_false();
        assert_that!(lang.is_valid_entry_point("lambda")).is_false();
        assert_that!(lang.is_valid_entry_point("sol$")).is_false();
        assert_that!(lang.is_valid_entry_point("sol.py")).is_false();
    }

    #[test]
    fn test_harness_is_complete() {
        let harness = render_harness(LAUNCHER_TEMPLATE, "sol");
        assert_that!(harness.as_str()).does_not_contain("@");
        assert_that!(harness.as_str()).contains("_TERMINATION = 86");
        assert_that!(harness.as_str()).contains("_COMPLETION = 85");
    }

    #[test]
    fn test_compile_keeps_source_in_memory() {
        if which::which("python3").is_err() {
            return;
        }
        let unit = lang().compile("print(input())\n", "sol").unwrap();
        assert_that!(unit.artifacts().get(&PathBuf::from("sol.py")))
            .is_equal_to(Some(&b"print(input())\n".to_vec()));
        assert_that!(unit.launch().args.last().map(|s| s.as_str())).is_equal_to(Some("sol"));
    }

    #[test]
    fn test_syntax_error() {
        if which::which("python3").is_err() {
            return;
        }
        let res = lang().compile("def broken(:\n    pass\n", "sol");
        let diagnostics = match res {
            Err(CompileFailure::Diagnostics(text)) => text,
            other => panic!("Expecting diagnostics, got {:?}", other),
        };
        assert_that!(diagnostics.as_str()).contains("SyntaxError");
    }
}
