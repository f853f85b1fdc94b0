// UI layer: terminal helpers shared by the command handlers. Spinners and
// prompts go to stderr so stdout stays clean for tables.

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Spaces between table columns.
const COLUMN_PADDING: usize = 3;

/// Run `f` while a spinner with `msg` is shown. indicatif hides the
/// spinner by itself when stderr is not a terminal.
pub fn with_spinner<T>(msg: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    out
}

/// Ask for a password without echoing it.
pub fn prompt_password(prompt: &str) -> Result<String> {
    let password = Password::new().with_prompt(prompt).interact()?;
    Ok(password)
}

/// Print a success line, green when stdout is a terminal.
pub fn success(msg: &str) {
    if std::io::stdout().is_terminal() {
        println!("{}", msg.green());
    } else {
        println!("{}", msg);
    }
}

/// Print a notice to stderr, yellow when stderr is a terminal.
pub fn notice(msg: &str) {
    if std::io::stderr().is_terminal() {
        eprintln!("{}", msg.yellow());
    } else {
        eprintln!("{}", msg);
    }
}

/// Fixed-column text table. Every column but the last is padded to its
/// widest cell plus `COLUMN_PADDING` spaces.
#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Table {
            rows: vec![headers.iter().map(|h| h.to_string()).collect()],
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(UnicodeWidthStr::width(cell.as_str()));
            }
        }

        let mut out = String::new();
        for row in &self.rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if i + 1 < row.len() {
                    let pad = widths[i] - UnicodeWidthStr::width(cell.as_str()) + COLUMN_PADDING;
                    line.extend(std::iter::repeat(' ').take(pad));
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}
