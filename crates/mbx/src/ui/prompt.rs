//! Terminal confirmation prompts

use dialoguer::theme::ColorfulTheme;
use mbx_core::confirm::{parse_answer, Confirm};
use mbx_core::errors::{MbxError, Result};
use std::io::{BufRead, IsTerminal, Write};

/// Pick the prompt for this session: dialoguer on a terminal, a plain
/// line read otherwise.
pub fn for_session() -> Box<dyn Confirm> {
    if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
        Box::new(TerminalConfirm)
    } else {
        Box::new(LineConfirm::new(std::io::stdin().lock()))
    }
}

/// Interactive y/N prompt rendered by dialoguer
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| MbxError::Prompt(e.to_string()))
    }
}

/// Reads one answer line from a non-interactive input. End of input declines.
pub struct LineConfirm<R> {
    input: std::cell::RefCell<R>,
}

impl<R: BufRead> LineConfirm<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: std::cell::RefCell::new(input),
        }
    }
}

impl<R: BufRead> Confirm for LineConfirm<R> {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} [y/N] ", prompt)
            .and_then(|_| stderr.flush())
            .map_err(|e| MbxError::Prompt(e.to_string()))?;

        let mut line = String::new();
        self.input
            .borrow_mut()
            .read_line(&mut line)
            .map_err(|e| MbxError::Prompt(e.to_string()))?;
        eprintln!();
        Ok(parse_answer(&line))
    }
}
