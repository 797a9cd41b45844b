//! Interactive preference prompts
//!
//! Invalid answers are reported and asked again; end of input is an error.

use std::io::{BufRead, Write};

use anyhow::{Result, bail};

use crate::email::is_plausible_address;
use crate::scoring::RainfallChoice;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("Input closed before answering: {}", question.trim_end());
        }
        Ok(line.trim().to_string())
    }

    /// Preferred average temperature in °C
    pub fn temperature(&mut self) -> Result<f64> {
        loop {
            let answer = self.ask("How hot do you want it to be in °C: ")?;
            match answer.replace(',', ".").parse::<f64>() {
                Ok(value) if value.is_finite() => return Ok(value),
                _ => writeln!(self.output, "Please enter a number, e.g. 24 or 18.5")?,
            }
        }
    }

    pub fn rainfall(&mut self) -> Result<RainfallChoice> {
        writeln!(self.output, "Rainfall Preference:")?;
        writeln!(self.output, "1: Less than 1mm")?;
        writeln!(self.output, "2: Less than 2mm")?;
        writeln!(self.output, "3: Doesn't matter")?;

        loop {
            let answer = self.ask("Choose your rainfall preference: ")?;
            match answer.parse::<RainfallChoice>() {
                Ok(choice) => return Ok(choice),
                Err(e) => writeln!(self.output, "{}", e.user_message())?,
            }
        }
    }

    /// Recipient address; an empty answer skips sending
    pub fn email(&mut self) -> Result<Option<String>> {
        loop {
            let answer = self.ask("Give your E-mail (leave empty to skip): ")?;
            if answer.is_empty() {
                return Ok(None);
            }
            if is_plausible_address(&answer) {
                return Ok(Some(answer));
            }
            writeln!(self.output, "'{answer}' doesn't look like an email address")?;
        }
    }
}
