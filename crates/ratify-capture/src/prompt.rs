//! Interaction surface of the capture protocol.
//!
//! Every method that asks for something returns `Option`; `None` means the
//! user cancelled, and the protocol propagates it with `?`.

use std::collections::VecDeque;

/// Returns an error message for invalid input, `None` when valid.
pub type Validator<'a> = &'a dyn Fn(&str) -> Option<String>;

pub trait Prompter {
    /// Informational message; never blocks.
    fn info(&mut self, message: &str);

    /// Warning message; never blocks.
    fn warn(&mut self, message: &str);

    /// Pick one of `options`. Returns the chosen index.
    fn choose(&mut self, prompt: &str, options: &[&str]) -> Option<usize>;

    /// Free-text answer. Invalid answers are reported and asked again until
    /// the validator accepts one or the user cancels.
    fn input(&mut self, prompt: &str, validate: Validator<'_>) -> Option<String>;
}

/// One queued answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(usize),
    Text(String),
    Cancel,
}

/// Replays queued answers (for testing). Counts every question asked and
/// keeps every message shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub questions: usize,
    pub rejected: Vec<String>,
    pub messages: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Answers not consumed by the protocol.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self) -> Option<Answer> {
        self.questions += 1;
        self.answers.pop_front()
    }
}

impl Prompter for ScriptedPrompter {
    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn warn(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn choose(&mut self, _prompt: &str, options: &[&str]) -> Option<usize> {
        match self.next()? {
            Answer::Choice(i) if i < options.len() => Some(i),
            _ => None,
        }
    }

    fn input(&mut self, _prompt: &str, validate: Validator<'_>) -> Option<String> {
        loop {
            let Answer::Text(text) = self.next()? else {
                return None;
            };
            match validate(&text) {
                None => return Some(text),
                Some(err) => self.rejected.push(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_len(s: &str) -> Option<String> {
        (s.trim().len() < 3).then(|| "too short".to_string())
    }

    #[test]
    fn input_reprompts_until_valid() {
        let mut p = ScriptedPrompter::new([Answer::Text("a".into()), Answer::Text("abc".into())]);
        assert_eq!(p.input("name", &min_len).as_deref(), Some("abc"));
        assert_eq!(p.rejected, vec!["too short".to_string()]);
        assert_eq!(p.questions, 2);
    }

    #[test]
    fn exhausted_script_cancels() {
        let mut p = ScriptedPrompter::new([]);
        assert_eq!(p.choose("pick", &["a", "b"]), None);
        assert_eq!(p.input("text", &min_len), None);
    }

    #[test]
    fn out_of_range_choice_cancels() {
        let mut p = ScriptedPrompter::new([Answer::Choice(5), Answer::Cancel]);
        assert_eq!(p.choose("pick", &["a", "b"]), None);
        assert_eq!(p.input("text", &min_len), None);
    }
}
