#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use webdeploy::config::prompt::PromptResult;
use webdeploy::config::{DeploymentRecord, DeploymentType, PromptError, Prompter};
use webdeploy::executor::{CommandExecutor, CommandResult, ExecutorError, FileAccess};
use webdeploy::probe::{HttpProbe, ProbeError, ProbeOutcome};

pub fn record(deployment_type: DeploymentType) -> DeploymentRecord {
    DeploymentRecord {
        project_name: "blog".to_string(),
        project_user: "blog".to_string(),
        domain_name: "blog.example.com".to_string(),
        git_repo: "https://github.com/example/blog.git".to_string(),
        app_entry_file: "app.py".to_string(),
        app_entry_var: "app".to_string(),
        use_tls: false,
        use_security: false,
        deployment_type,
    }
}

/// Stock Debian default site, tab indented.
pub const DEBIAN_DEFAULT_SITE: &str = "server {
\tlisten 80 default_server;
\tlisten [::]:80 default_server;

\troot /var/www/html;

\t# Add index.php to the list if you are using PHP
\tindex index.html index.htm index.nginx-debian.html;

\tserver_name _;

\tlocation / {
\t\t# First attempt to serve request as file, then
\t\t# as directory, then fall back to displaying a 404.
\t\ttry_files $uri $uri/ =404;
\t}
}
";

struct Rule {
    pattern: String,
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// In-memory host: records every command, answers from substring rules and
/// keeps files in a map. Unmatched commands succeed with no output.
#[derive(Default)]
pub struct MockExecutor {
    pub commands: Vec<String>,
    pub interactive: Vec<String>,
    pub files: HashMap<PathBuf, String>,
    pub dirs: HashSet<PathBuf>,
    rules: Vec<Rule>,
    effects: Vec<(String, PathBuf, String)>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later rules win over earlier ones.
    pub fn respond(&mut self, pattern: &str, exit_code: i32, stdout: &str) -> &mut Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            exit_code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
        self
    }

    pub fn fail(&mut self, pattern: &str, stderr: &str) -> &mut Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
        });
        self
    }

    /// Replace `path` with `contents` whenever a command containing `pattern` runs.
    pub fn on_command(&mut self, pattern: &str, path: impl Into<PathBuf>, contents: &str) -> &mut Self {
        self.effects
            .push((pattern.to_string(), path.into(), contents.to_string()));
        self
    }

    pub fn with_file(&mut self, path: impl Into<PathBuf>, contents: &str) -> &mut Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }

    pub fn with_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.dirs.insert(path.into());
        self
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(Path::new(path)).map(String::as_str)
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.position(pattern).is_some()
    }

    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.contains(pattern))
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.commands.iter().filter(|c| c.contains(pattern)).count()
    }

    /// Mirror the few file-moving commands the code under test relies on.
    fn apply_side_effects(&mut self, command: &str) {
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["sudo", "cp", from, to] => {
                if let Some(contents) = self.files.get(Path::new(from)).cloned() {
                    self.files.insert(PathBuf::from(to), contents);
                }
            }
            ["sudo", "ln", "-s", _, link] => {
                self.files.insert(PathBuf::from(link), String::new());
            }
            ["sudo", "mv", from, to] => {
                if self.dirs.remove(Path::new(from)) {
                    self.dirs.insert(PathBuf::from(to));
                }
            }
            _ => {}
        }
        let effects: Vec<(PathBuf, String)> = self
            .effects
            .iter()
            .filter(|(pattern, _, _)| command.contains(pattern.as_str()))
            .map(|(_, path, contents)| (path.clone(), contents.clone()))
            .collect();
        for (path, contents) in effects {
            self.files.insert(path, contents);
        }
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute_command(&mut self, command: &str) -> Result<CommandResult, ExecutorError> {
        self.commands.push(command.to_string());
        let result = match self.rules.iter().rev().find(|r| command.contains(&r.pattern)) {
            Some(rule) => CommandResult::completed(command, rule.exit_code, &rule.stdout, &rule.stderr),
            None => CommandResult::completed(command, 0, "", ""),
        };
        if result.is_success() {
            self.apply_side_effects(command);
        }
        Ok(result)
    }

    async fn execute_interactive(&mut self, command: &str) -> Result<i32, ExecutorError> {
        self.interactive.push(command.to_string());
        Ok(0)
    }
}

#[async_trait]
impl FileAccess for MockExecutor {
    async fn read_file(&mut self, path: &Path) -> Result<String, ExecutorError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ExecutorError::FileNotFound(path.to_path_buf()))
    }

    async fn write_file(&mut self, path: &Path, contents: &str) -> Result<(), ExecutorError> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    async fn file_exists(&mut self, path: &Path) -> Result<bool, ExecutorError> {
        Ok(self.files.contains_key(path) || self.dirs.contains(path))
    }

    async fn dir_exists(&mut self, path: &Path) -> Result<bool, ExecutorError> {
        Ok(self.dirs.contains(path))
    }
}

/// Answers prompts from a fixed list. An empty answer takes the default,
/// confirmations are yes when the answer starts with `y`.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub said: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn output(&self) -> String {
        self.said.join("\n")
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String> {
        self.prompts.push(prompt.to_string());
        let answer = self.answers.pop_front().ok_or(PromptError::Exhausted)?;
        if answer.is_empty() {
            Ok(default.unwrap_or_default().to_string())
        } else {
            Ok(answer)
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool> {
        self.prompts.push(prompt.to_string());
        let answer = self.answers.pop_front().ok_or(PromptError::Exhausted)?;
        if answer.is_empty() {
            Ok(default)
        } else {
            Ok(answer.starts_with('y'))
        }
    }

    fn say(&mut self, text: &str) {
        self.said.push(text.to_string());
    }
}

/// Fixed HTTP answers per URL; anything else is refused.
#[derive(Default)]
pub struct StubProbe {
    statuses: HashMap<String, u16>,
    external_ip: Option<String>,
    pub probed: Mutex<Vec<String>>,
}

impl StubProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }

    pub fn with_external_ip(mut self, ip: &str) -> Self {
        self.external_ip = Some(ip.to_string());
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpProbe for StubProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(url.to_string());
        }
        match self.statuses.get(url) {
            Some(status) => ProbeOutcome::responded(url, *status, Duration::from_millis(5)),
            None => ProbeOutcome::failed(url, "connection refused", Duration::from_millis(1)),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ProbeError> {
        self.external_ip.clone().ok_or_else(|| ProbeError::Request {
            url: url.to_string(),
            message: "offline".to_string(),
        })
    }
}
