use inquire::error::InquireError;
use inquire::{Confirm, Select, Text};
use crate::error::{DistError, Result};

/// Interactive questions asked during a release.
///
/// Every method returns `None`/`false` when the operator cancels.
pub trait Prompter {
    /// Picks one of `options`, returning its index.
    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>>;
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<Option<String>>;
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Prompts on the terminal using `inquire`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

fn cancelled<T>(err: InquireError, on_cancel: T) -> Result<T> {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => Ok(on_cancel),
        InquireError::IO(e) => Err(DistError::Io(e)),
        other => Err(DistError::Io(std::io::Error::other(other.to_string()))),
    }
}

impl Prompter for TerminalPrompter {
    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>> {
        match Select::new(message, options.to_vec()).raw_prompt() {
            Ok(choice) => Ok(Some(choice.index)),
            Err(e) => cancelled(e, None),
        }
    }

    fn text(&mut self, message: &str, default: Option<&str>) -> Result<Option<String>> {
        let mut prompt = Text::new(message);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        match prompt.prompt() {
            Ok(answer) => Ok(Some(answer)),
            Err(e) => cancelled(e, None),
        }
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        match Confirm::new(message).with_default(default).prompt() {
            Ok(answer) => Ok(answer),
            Err(e) => cancelled(e, false),
        }
    }
}

/// Answers prompts from a fixed script, for tests and non-interactive runs.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<Answer>,
    /// Every message that was asked, in order.
    pub asked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(usize),
    Text(String),
    Yes,
    No,
    Cancel,
}

impl ScriptedPrompter {
    pub fn new<I: IntoIterator<Item = Answer>>(answers: I) -> Self {
        ScriptedPrompter {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> Result<Answer> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| DistError::Io(std::io::Error::other(format!("no scripted answer for: {message}"))))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>> {
        match self.next(message)? {
            Answer::Choice(i) if i < options.len() => Ok(Some(i)),
            Answer::Cancel => Ok(None),
            other => Err(DistError::Io(std::io::Error::other(format!(
                "unexpected answer {other:?} to: {message}"
            )))),
        }
    }

    fn text(&mut self, message: &str, default: Option<&str>) -> Result<Option<String>> {
        match self.next(message)? {
            Answer::Text(t) if t.is_empty() => Ok(Some(default.unwrap_or_default().to_string())),
            Answer::Text(t) => Ok(Some(t)),
            Answer::Cancel => Ok(None),
            other => Err(DistError::Io(std::io::Error::other(format!(
                "unexpected answer {other:?} to: {message}"
            )))),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message)? {
            Answer::Yes => Ok(true),
            Answer::No | Answer::Cancel => Ok(false),
            other => Err(DistError::Io(std::io::Error::other(format!(
                "unexpected answer {other:?} to: {message}"
            )))),
        }
    }
}
