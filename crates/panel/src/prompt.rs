//! Terminal prompts and user-facing notifications.

use std::io::{BufRead, Write};

use overlay_client::Confirm;

/// Asks on stdout and reads a `y`/`yes` answer from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        match ask(&format!("{prompt} [y/N] ")) {
            Ok(answer) => is_yes(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read confirmation, treating as no");
                false
            }
        }
    }
}

/// Confirms everything (`--yes`).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Print `prompt` and read one line from stdin, without the line ending.
pub fn ask(prompt: &str) -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Where blocking user notifications go.
pub trait Notifier {
    /// A failed action the user has to acknowledge.
    fn alert(&self, message: &str);
    /// The session is gone; send the user back to login.
    fn redirect_to_login(&self);
}

/// Writes notifications to stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn redirect_to_login(&self) {
        eprintln!("Your session has expired. Run `overlay-panel login` to sign in again.");
    }
}
