use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a question is described in the contest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionConfig {
    /// The name shown to the teams.
    pub name: String,
    /// The file with the input fed to the submissions.
    pub input_file: PathBuf,
    /// The file with the expected output.
    pub judge_file: PathBuf,
}

/// The text of a question cannot be read.
#[derive(Debug, Error)]
#[error("Cannot read {path:?} of question {question}: {source}")]
pub struct QuestionError {
    /// The number of the question.
    pub question: usize,
    /// The file that cannot be read.
    pub path: PathBuf,
    /// Why the file cannot be read.
    #[source]
    pub source: std::io::Error,
}

/// A text read from storage the first time it is needed. Read errors are not cached.
#[derive(Debug)]
struct LazyText {
    path: Option<PathBuf>,
    cell: OnceLock<String>,
}

impl LazyText {
    fn from_file(path: PathBuf) -> LazyText {
        LazyText {
            path: Some(path),
            cell: OnceLock::new(),
        }
    }

    fn from_text(text: String) -> LazyText {
        LazyText {
            path: None,
            cell: OnceLock::from(text),
        }
    }

    fn get(&self, question: usize) -> Result<&str, QuestionError> {
        if let Some(text) = self.cell.get() {
            return Ok(text);
        }
        let path = self.path.as_deref().unwrap_or_else(|| Path::new(""));
        let text = std::fs::read_to_string(path).map_err(|source| QuestionError {
            question,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.cell.get_or_init(|| text))
    }
}

/// A question of the contest.
#[derive(Debug)]
pub struct Question {
    number: usize,
    name: String,
    input: LazyText,
    judge: LazyText,
}

/// The public representation of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRepresentation {
    /// The name of the question.
    pub name: String,
    /// The number of the question, starting from 1.
    pub number: usize,
}

impl Question {
    /// Make the question `number` from its configuration. Relative paths are resolved against
    /// `base_dir`. The files are not read yet.
    pub fn from_config(number: usize, config: &QuestionConfig, base_dir: &Path) -> Question {
        Question {
            number,
            name: config.name.clone(),
            input: LazyText::from_file(base_dir.join(&config.input_file)),
            judge: LazyText::from_file(base_dir.join(&config.judge_file)),
        }
    }

    /// Make a question with inline texts.
    pub fn from_texts<S: Into<String>>(number: usize, name: S, input: S, judge: S) -> Question {
        Question {
            number,
            name: name.into(),
            input: LazyText::from_text(input.into()),
            judge: LazyText::from_text(judge.into()),
        }
    }

    /// The number of the question, starting from 1.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The name of the question.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The input fed to the submissions, read once and cached.
    pub fn input(&self) -> Result<&str, QuestionError> {
        self.input.get(self.number)
    }

    /// The expected output, read once and cached.
    pub fn judge(&self) -> Result<&str, QuestionError> {
        self.judge.get(self.number)
    }

    /// The public representation of the question.
    pub fn representation(&self) -> QuestionRepresentation {
        QuestionRepresentation {
            name: self.name.clone(),
            number: self.number,
        }
    }
}

/// The questions of the contest, read-only after loading.
#[derive(Debug, Default, Clone)]
pub struct QuestionSet {
    questions: Vec<Arc<Question>>,
}

impl QuestionSet {
    /// Build the set from the configuration, numbering the questions from 1 in order.
    pub fn from_configs(configs: &[QuestionConfig], base_dir: &Path) -> QuestionSet {
        QuestionSet {
            questions: configs
                .iter()
                .enumerate()
                .map(|(i, config)| Arc::new(Question::from_config(i + 1, config, base_dir)))
                .collect(),
        }
    }

    /// Build the set from already made questions.
    pub fn new(questions: Vec<Question>) -> QuestionSet {
        QuestionSet {
            questions: questions.into_iter().map(Arc::new).collect(),
        }
    }

    /// The question with the specified number, starting from 1.
    pub fn get(&self, number: usize) -> Option<&Arc<Question>> {
        number.checked_sub(1).and_then(|i| self.questions.get(i))
    }

    /// The number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether there are no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Iterate over the questions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Question>> {
        self.questions.iter()
    }

    /// The representations of all the questions.
    pub fn representations(&self) -> Vec<QuestionRepresentation> {
        self.questions.iter().map(|q| q.representation()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_lazy_read_and_cache() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "1 2 3").unwrap();
        let config = QuestionConfig {
            name: "sum".into(),
            input_file: "in.txt".into(),
            judge_file: "missing.txt".into(),
        };
        let question = Question::from_config(1, &config, tmp.path());
        assert_that!(question.input().unwrap()).is_equal_to("1 2 3");
        // cached: the file is not read again
        std::fs::remove_file(tmp.path().join("in.txt")).unwrap();
        assert_that!(question.input().unwrap()).is_equal_to("1 2 3");

        assert_that!(question.judge()).is_err();
        std::fs::write(tmp.path().join("missing.txt"), "6").unwrap();
        assert_that!(question.judge().unwrap()).is_equal_to("6");
    }

    #[test]
    fn test_numbering() {
        let set = QuestionSet::new(vec![
            Question::from_texts(1, "a", "", ""),
            Question::from_texts(2, "b", "", ""),
        ]);
        assert_that!(set.get(0)).is_none();
        assert_that!(set.get(1).map(|q| q.name())).is_equal_to(Some("a"));
        assert_that!(set.get(2).map(|q| q.number())).is_equal_to(Some(2));
        assert_that!(set.get(3)).is_none();
        assert_that!(set.representations()[1].clone()).is_equal_to(QuestionRepresentation {
            name: "b".into(),
            number: 2,
        });
    }
}
