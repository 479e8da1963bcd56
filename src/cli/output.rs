//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{Procedure, Source};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print success status to stderr, keeping stdout for data
pub fn status(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print applied fix to stderr (green +)
pub fn fix(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("  {} {}", "+".green(), msg);
}

/// Print failure status to stderr (red X, indented)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print one procedure with its optional facts
pub fn procedure(p: &Procedure) {
    println!("  {} {} ({})", "•".cyan(), p.name.bold(), p.procedure_id);
    detail(&format!("  where: {}", p.jurisdiction));
    if !p.url.is_empty() {
        detail(&format!("  url:   {}", p.url));
    }
    for (label, value) in [
        ("needs", &p.requirements),
        ("due", &p.deadline),
        ("fee", &p.fee),
    ] {
        if let Some(value) = value {
            detail(&format!("  {label:<5}: {value}"));
        }
    }
}

/// Print a titled procedure list, skipped when empty
pub fn procedures(title: &str, list: &[Procedure]) {
    if list.is_empty() {
        return;
    }
    header(&format!("{title} ({})", list.len()));
    list.iter().for_each(procedure);
}

/// Print search sources as a compact list
pub fn sources(list: &[Source]) {
    if list.is_empty() {
        return;
    }
    header("Sources");
    for s in list {
        detail(&format!("{} <{}>", s.title, s.url.dimmed()));
    }
}
