//! Description of an external tool invocation.
//!
//! Nothing here spawns a process: a [`ToolCommand`] is a program name plus
//! an argument vector, printable as a POSIX shell line.

use std::fmt;

use serde::Serialize;

/// An external program together with its arguments.
///
/// # Example
///
/// ```
/// use rendition::ToolCommand;
///
/// let mut cmd = ToolCommand::new("ffmpeg");
/// cmd.arg("-i").arg("https://example.com/v.m3u8").args(["-c", "copy"]).arg("my video.ts");
/// assert_eq!(
///     cmd.to_shell_string(),
///     "ffmpeg -i https://example.com/v.m3u8 -c copy 'my video.ts'"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Render as a single shell line, quoting every word that contains
    /// characters outside the shell-safe set.
    pub fn to_shell_string(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_string())
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ',' | ':' | '/' | '=' | '@' | '%' | '+')
}

fn shell_quote(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_shell_safe) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
