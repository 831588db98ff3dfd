//! Line-oriented terminal prompter. End of input cancels.

use ratify_capture::prompt::{Prompter, Validator};
use std::io::{BufRead, Write};

pub struct TerminalPrompter<R> {
    input: R,
}

impl TerminalPrompter<std::io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: std::io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompter<R> {
    #[cfg(test)]
    fn with_input(input: R) -> Self {
        Self { input }
    }

    /// One line of input; `None` on EOF or read error.
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("  {prompt}> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl<R: BufRead> Prompter for TerminalPrompter<R> {
    fn info(&mut self, message: &str) {
        println!("  {message}");
    }

    fn warn(&mut self, message: &str) {
        println!("  ! {message}");
    }

    fn choose(&mut self, prompt: &str, options: &[&str]) -> Option<usize> {
        println!("\n  {prompt}");
        for (i, opt) in options.iter().enumerate() {
            println!("    [{}] {opt}", i + 1);
        }
        loop {
            let answer = self.read_line("")?;
            let answer = answer.trim();
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&n) {
                    return Some(n - 1);
                }
            }
            if let Some(i) = options.iter().position(|o| o.eq_ignore_ascii_case(answer)) {
                return Some(i);
            }
            println!("  Invalid choice. Enter 1-{}.", options.len());
        }
    }

    fn input(&mut self, prompt: &str, validate: Validator<'_>) -> Option<String> {
        println!("\n  {prompt}");
        loop {
            let answer = self.read_line("")?;
            match validate(&answer) {
                None => return Some(answer),
                Some(err) => println!("  {err}"),
            }
        }
    }
}
