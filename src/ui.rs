// UI layer: terminal colors, the request spinner, JSON dumps and the
// interactive prompts used by `habits init`.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

/// Colors output when writing to a terminal, passes text through otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        Palette { color }
    }

    /// No escape codes at all.
    pub fn plain() -> Self {
        Palette { color: false }
    }

    pub fn green(&self, txt: &str, bold: bool) -> String {
        self.paint(txt, Color::Green, bold)
    }

    pub fn red(&self, txt: &str, bold: bool) -> String {
        self.paint(txt, Color::Red, bold)
    }

    fn paint(&self, txt: &str, color: Color, bold: bool) -> String {
        if !self.color {
            return txt.to_string();
        }
        let styled = txt.with(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }
}

/// Spinner shown on stderr while a request is in flight. indicatif hides it
/// by itself when stderr is not a terminal.
pub fn spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Pretty-print a JSON value with sorted keys.
pub fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    writeln!(out, "{text}")
}

/// Ask for the Habitica user ID and API token.
pub fn prompt_credentials() -> anyhow::Result<(String, String)> {
    let api_user: String = Input::new()
        .with_prompt("Habitica user ID")
        .interact_text()?;
    // `Password` hides the token while it is typed.
    let api_key = Password::new().with_prompt("API token").interact()?;
    Ok((api_user.trim().to_string(), api_key.trim().to_string()))
}

/// Confirm replacing an existing config file.
pub fn confirm_overwrite(path: &Path) -> anyhow::Result<bool> {
    let answer = Confirm::new()
        .with_prompt(format!("{} already exists. Overwrite?", path.display()))
        .default(false)
        .interact()?;
    Ok(answer)
}
