//! Terminal styling utilities

use console::{measure_text_width, truncate_str, Term};

pub fn style_cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}

pub fn style_red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

pub fn style_yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}

pub fn style_dim(s: &str) -> String {
    format!("\x1b[2m{}\x1b[0m", s)
}

pub fn style_bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

/// Bold bright yellow, used for the user's own rows
pub fn style_highlight(s: &str) -> String {
    format!("\x1b[1;93m{}\x1b[0m", s)
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", style_red("✗"), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", style_yellow("⚠"), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", style_cyan("ℹ"), msg);
}

pub fn print_header(title: &str) {
    println!();
    println!("{}", style_bold(title));
    println!("{}", "─".repeat(measure_text_width(title)));
}

/// Whether stdout is an interactive terminal that can show colors
pub fn stdout_supports_color() -> bool {
    Term::stdout().is_term()
}

/// Cut `text` to at most `width` columns, ending with an ellipsis when cut
pub fn truncate(text: &str, width: usize) -> String {
    truncate_str(text, width, "…").into_owned()
}

pub fn yesno(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}

/// `12345.6` -> `12,345.60`
pub fn format_usd(amount: f64) -> String {
    contest_analyzer::format_amount(amount, 2)
}
