use std::io::{BufRead, Write};

use colored::Colorize;

use crate::prelude::*;

use onenote_md_core::filename::DateFormat;
use onenote_md_core::graph::Notebook;
use onenote_md_core::prompt::{parse_menu_choice, parse_yes_no};

/// Line based interactive questions
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<std::io::StdinLock<'static>, anstream::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), anstream::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and read one trimmed line. End of input is an error.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .wrap_err("Failed to read from standard input")?;
        if read == 0 {
            return Err(eyre!("No answer given for: {}", question.trim()));
        }
        Ok(line.trim().to_string())
    }

    pub fn token(&mut self) -> Result<String> {
        loop {
            let token = self.ask("Enter your Microsoft Graph access token: ")?;
            if !token.is_empty() {
                return Ok(token);
            }
            writeln!(self.output, "{}", "The token cannot be empty.".red())?;
        }
    }

    /// Ask whether filenames get a date prefix and, if so, in which pattern
    pub fn date_format(&mut self) -> Result<Option<DateFormat>> {
        let answer = self.ask("Add the page date to the start of each filename? (y/n): ")?;
        if !parse_yes_no(&answer) {
            return Ok(None);
        }

        writeln!(self.output, "\nChoose a date format:")?;
        for (i, format) in DateFormat::ALL.iter().enumerate() {
            writeln!(self.output, "  {}. {}", i + 1, format.label())?;
        }

        let index = self.choose(DateFormat::ALL.len())?;
        Ok(Some(DateFormat::ALL[index]))
    }

    /// Show the notebooks as a numbered menu and return the index picked
    pub fn notebook(&mut self, notebooks: &[Notebook]) -> Result<usize> {
        if notebooks.is_empty() {
            return Err(eyre!("No notebooks found for this account"));
        }

        writeln!(self.output, "\nAvailable notebooks:")?;
        for (i, notebook) in notebooks.iter().enumerate() {
            writeln!(self.output, "  {}. {}", i + 1, notebook.display_name)?;
        }

        self.choose(notebooks.len())
    }

    fn choose(&mut self, options: usize) -> Result<usize> {
        loop {
            let answer = self.ask(&f!("Enter a number (1-{options}): "))?;
            match parse_menu_choice(&answer, options) {
                Some(index) => return Ok(index),
                None => writeln!(self.output, "{}", "Invalid choice, try again.".yellow())?,
            }
        }
    }
}
