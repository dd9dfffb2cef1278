use colored::Colorize;
use std::io::IsTerminal;

/// Colors used when rendering diffs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiColor {
    Green,
    Red,
}

/// Something that can paint text for the terminal it writes to.
pub trait Console {
    fn colorize(&self, color: AnsiColor, text: &str) -> String;
}

/// [`Console`] that emits ANSI escapes when color is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiConsole {
    pub color: bool,
}

impl AnsiConsole {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Enable color when stdout is a terminal and `NO_COLOR` is unset
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::new(!no_color && std::io::stdout().is_terminal())
    }
}

impl Console for AnsiConsole {
    fn colorize(&self, color: AnsiColor, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match color {
            AnsiColor::Green => text.green().to_string(),
            AnsiColor::Red => text.red().to_string(),
        }
    }
}

/// Color added lines green and removed lines red.
///
/// Every line of the input, including the empty one after a trailing newline,
/// is emitted preceded by `'\n'`, so the result always starts with a newline.
///
/// ```
/// use tree_diff::colorize::{colorize, AnsiConsole};
///
/// let plain = colorize(&AnsiConsole::new(false), "context\n+added\n");
/// assert_eq!(plain, "\ncontext\n+added\n");
/// ```
pub fn colorize<C: Console + ?Sized>(console: &C, diff_text: &str) -> String {
    let mut out = String::with_capacity(diff_text.len() + 1);
    for line in diff_text.split('\n') {
        out.push('\n');
        if line.starts_with('+') {
            out.push_str(&console.colorize(AnsiColor::Green, line));
        } else if line.starts_with('-') {
            out.push_str(&console.colorize(AnsiColor::Red, line));
        } else {
            out.push_str(line);
        }
    }
    out
}
