//! Output formatting module for Armory
//!
//! Status lines use the classic `[+]`, `[-]`, `[*]` and `[!]` markers.

use colored::Colorize;
use serde::Serialize;

/// Output formatter for the human and JSON modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print a success line
    pub fn positive(&self, message: &str) {
        if self.json_mode {
            self.event("positive", message, false);
            return;
        }

        if self.use_color {
            println!("{} {}", "[+]".green().bold(), message);
        } else {
            println!("[+] {}", message);
        }
    }

    /// Print an error line
    pub fn negative(&self, message: &str) {
        if self.json_mode {
            self.event("error", message, true);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "[-]".red().bold(), message);
        } else {
            eprintln!("[-] {}", message);
        }
    }

    /// Print a warning line
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            self.event("warning", message, true);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "[!]".yellow().bold(), message);
        } else {
            eprintln!("[!] {}", message);
        }
    }

    /// Print an informational line
    pub fn info(&self, message: &str) {
        if self.json_mode {
            if self.verbosity >= 1 {
                self.event("info", message, false);
            }
            return;
        }

        if self.use_color {
            println!("{} {}", "[*]".blue(), message);
        } else {
            println!("[*] {}", message);
        }
    }

    /// Print a debug line (requires higher verbosity)
    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 {
            return;
        }

        if self.json_mode {
            self.event("debug", message, false);
            return;
        }

        if self.use_color {
            println!("{} {}", "DEBUG:".magenta(), message);
        } else {
            println!("DEBUG: {}", message);
        }
    }

    fn event(&self, kind: &str, message: &str, to_stderr: bool) {
        let line = serde_json::json!({ "type": kind, "message": message }).to_string();
        if to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    /// Print a value as pretty JSON (JSON mode only)
    pub fn json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        if self.json_mode {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    /// Print a table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json_mode {
            let table = serde_json::json!({
                "type": "table",
                "headers": headers,
                "rows": rows
            });
            println!("{:#}", table);
            return;
        }

        println!("{}", self.render_table(headers, rows));
    }

    fn render_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        // Calculate column widths
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let mut lines = Vec::with_capacity(rows.len() + 2);

        let header_line = join_cells(headers.iter().copied(), &widths);
        if self.use_color {
            lines.push(header_line.bright_white().bold().to_string());
        } else {
            lines.push(header_line);
        }

        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(sep.join("-+-"));

        for row in rows {
            lines.push(join_cells(row.iter().map(String::as_str), &widths));
        }

        lines.join("\n")
    }
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
