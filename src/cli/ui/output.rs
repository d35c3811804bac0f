use console::{Term, style};

use crate::types::Result;

pub struct Output {
    term: Term,
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Print a review prompt and read one line of reviewer input
    pub fn ask(&self, prompt: &str) -> Result<String> {
        self.section("Outline review");
        println!("{}", prompt);
        self.term.write_str(&format!("{} ", style(">").cyan()))?;
        Ok(self.term.read_line()?)
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
