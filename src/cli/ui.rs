use crate::config::prompt::PromptResult;
use crate::config::Prompter;
use crate::deployer::DeployerEvent;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;

/// Creates a standard spinner ProgressBar.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▹▹▹▹▹",
            "▸▹▹▹▹",
            "▹▸▹▹▹",
            "▹▹▸▹▹",
            "▹▹▹▸▹",
            "▹▹▹▹▸",
            "▪▪▪▪▪",
        ]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Handles receiving DeployerEvents and updating a ProgressBar.
pub async fn handle_deployer_events(mut receiver: mpsc::Receiver<DeployerEvent>, pb: ProgressBar) {
    while let Some(event) = receiver.recv().await {
        match event {
            DeployerEvent::StepStarted(msg) => {
                pb.set_message(format!("⏳ {}", msg));
            }
            DeployerEvent::StepCompleted(msg) => {
                pb.println(format!("✅ {}", msg));
            }
            DeployerEvent::StepSkipped(step, reason) => {
                pb.println(format!("⏭  {} ({})", step, reason));
            }
            DeployerEvent::Warning(msg) => {
                pb.println(format_warning(&format!("⚠  {}", msg)));
            }
            DeployerEvent::StepFailed(step, err) => {
                pb.set_message(format!("❌ Error during {}: {}", step, err));
                break;
            }
        }
    }
}

/// Hides the spinner while a question is on screen.
pub struct SuspendingPrompter<'a> {
    inner: &'a mut dyn Prompter,
    spinner: ProgressBar,
}

impl<'a> SuspendingPrompter<'a> {
    pub fn new(inner: &'a mut dyn Prompter, spinner: ProgressBar) -> Self {
        Self { inner, spinner }
    }
}

impl Prompter for SuspendingPrompter<'_> {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String> {
        let spinner = self.spinner.clone();
        spinner.suspend(|| self.inner.input(prompt, default))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool> {
        let spinner = self.spinner.clone();
        spinner.suspend(|| self.inner.confirm(prompt, default))
    }

    fn say(&mut self, text: &str) {
        self.spinner.println(text);
    }
}

pub fn format_header(text: &str) -> String {
    format!("{}", text.blue().bold())
}

pub fn format_highlight(text: &str) -> String {
    format!("{}", text.cyan())
}

pub fn format_success(text: &str) -> String {
    format!("{}", text.green())
}

pub fn format_warning(text: &str) -> String {
    format!("{}", text.yellow())
}

pub fn format_error(text: &str) -> String {
    format!("{}", text.red())
}
