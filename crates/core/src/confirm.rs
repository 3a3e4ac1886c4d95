//! Yes/no confirmation oracle
//!
//! The orchestrator only needs an answer; how the question is rendered is up
//! to the caller. The CLI supplies an interactive terminal prompt.

use crate::errors::Result;
use std::cell::RefCell;

/// Answers a yes/no question
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Accepts every prompt without asking (`--yes`, non-interactive sessions)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Gives a fixed answer and remembers the prompts it was shown
#[derive(Debug, Default)]
pub struct ScriptedAnswer {
    answer: bool,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedAnswer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Confirm for ScriptedAnswer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answer)
    }
}

/// Interpret a typed answer the way the prompt advertises: `y`/`yes`, any case
pub fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y"));
        assert!(parse_answer(" YES\n"));
        assert!(!parse_answer("n"));
        assert!(!parse_answer(""));
        assert!(!parse_answer("yep"));
    }

    #[test]
    fn test_scripted_answer_records_prompts() -> anyhow::Result<()> {
        let decline = ScriptedAnswer::new(false);
        assert!(!decline.confirm("Proceed?")?);
        assert_eq!(decline.prompts(), vec!["Proceed?".to_string()]);
        assert!(AssumeYes.confirm("Proceed?")?);
        Ok(())
    }
}
