//! Terminal output helpers shared by the commands.

use std::fmt::Display;
use std::io::{self, Write};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";

const RULE_WIDTH: usize = 50;

/// `proxyload <command> - <subject>` banner.
pub fn header(command: &str, subject: impl Display) {
    println!("\n{BOLD}proxyload {command}{RESET} - {CYAN}{subject}{RESET}");
    rule();
}

pub fn rule() {
    println!("{}", "─".repeat(RULE_WIDTH));
}

/// Start a progress line; finish it with [`done`].
pub fn step(label: &str) {
    print!("{BLUE}  ◆ {label}{RESET} ... ");
    io::stdout().flush().ok();
}

pub fn done(detail: impl Display) {
    println!("{GREEN}✓{RESET} {detail}");
}

/// `  ◆ Label: value` line.
pub fn field(label: &str, value: impl Display) {
    println!("{CYAN}  ◆ {label}:{RESET} {value}");
}

pub fn warn(message: impl Display) {
    eprintln!("{YELLOW}Warning:{RESET} {message}");
}

pub fn error(message: impl Display) {
    eprintln!("{RED}Error:{RESET} {message}");
}

/// Render an error, with a recovery hint when it comes from proxyload-core.
pub fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<proxyload_core::Error>() {
        Some(core) => core.with_hint(),
        None => format!("{err:#}"),
    }
}
