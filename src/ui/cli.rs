//! Terminal front-end
//!
//! Renders the discovery screen to stdout, reads button presses from stdin,
//! and stands in for the OS permission dialog.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};
use crate::mobile::{Permission, PermissionPrompt, PermissionState, Rationale};
use crate::ui::mobile::ScreenModel;

/// Lines typed on stdin, shared by everything that needs user input
pub struct TerminalInput {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl TerminalInput {
    /// Start reading stdin on a dedicated thread
    pub fn spawn() -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Arc::new(Self {
            lines: Mutex::new(receiver),
        })
    }

    /// Next line typed by the user, `None` once stdin is closed
    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}

/// Permission dialog answered on the terminal
pub struct TerminalPrompt {
    input: Arc<TerminalInput>,
}

impl TerminalPrompt {
    pub fn new(input: Arc<TerminalInput>) -> Self {
        Self { input }
    }
}

/// Interpret the answer to a permission dialog. An empty answer accepts the
/// positive button.
pub fn parse_permission_answer(answer: &str, button_positive: &str) -> PermissionState {
    let answer = answer.trim();
    if answer.is_empty()
        || answer.eq_ignore_ascii_case(button_positive)
        || answer.eq_ignore_ascii_case("y")
        || answer.eq_ignore_ascii_case("yes")
    {
        PermissionState::Granted
    } else {
        PermissionState::Denied
    }
}

#[async_trait]
impl PermissionPrompt for TerminalPrompt {
    async fn request(
        &self,
        permission: Permission,
        rationale: &Rationale,
    ) -> Result<PermissionState> {
        println!();
        println!("== {} ==", rationale.title);
        println!("{}", rationale.message);
        println!("({})", permission.to_android_string());
        print!("[{}] / deny: ", rationale.button_positive);
        io::stdout().flush()?;

        let answer = self.input.next_line().await.ok_or_else(|| {
            Error::Permission("stdin closed before the dialog was answered".to_string())
        })?;

        Ok(parse_permission_answer(&answer, &rationale.button_positive))
    }
}

/// Draw the screen, replacing the previous frame
pub fn render(model: &ScreenModel) {
    let mut stdout = io::stdout().lock();
    let _ = write!(stdout, "\n{}", model);
    let _ = stdout.flush();
}
