//! Interactive input, behind a trait so the decision logic can be driven by
//! scripted answers in tests.

use anyhow::{Context, Result};
use colored::*;
use std::io::Write;

pub trait Prompter {
    /// Print the prompt and read one trimmed line from the operator.
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// y/n question; only an answer starting with 'y' or 'Y' is a yes.
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{} [y/N]", prompt))?;
        Ok(matches!(answer.chars().next(), Some('y') | Some('Y')))
    }
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{} ", prompt.bold());
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read input")?;
        Ok(line.trim().to_string())
    }
}

#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, _prompt: &str) -> Result<String> {
        self.answers
            .pop_front()
            .context("Scripted prompter ran out of answers")
    }
}
