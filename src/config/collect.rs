use super::prompt::{PromptError, Prompter};
use super::record::{is_safe_identifier, DeploymentRecord, DeploymentType};
use thiserror::Error;

pub const DEFAULT_PROJECT_NAME: &str = "webapp";
pub const DEFAULT_ENTRY_FILE: &str = "app.py";
pub const DEFAULT_ENTRY_VAR: &str = "app";
pub const DEFAULT_PROXY_PORT: &str = "8080";
/// Domain used by quick mode when the external address cannot be determined.
pub const QUICK_FALLBACK_DOMAIN: &str = "localhost";

const DEPLOYMENT_MENU: &str = "Deployment type:
  1) Main domain      - dedicated virtual host on port 80
  2) Subdirectory     - served under /<project>/ on the default host
  3) Custom port      - dedicated virtual host on its own port";

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("A git repository URL is required")]
    MissingGitRepo,
}

pub type CollectResult<T> = Result<T, CollectError>;

/// Parse a deployment menu choice. Port selection is resolved separately.
pub fn parse_deployment_choice(choice: &str) -> Option<DeploymentType> {
    match choice.trim() {
        "1" => Some(DeploymentType::Main),
        "2" => Some(DeploymentType::Subdirectory),
        "3" => Some(DeploymentType::Port(0)),
        _ => None,
    }
}

pub fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|p| *p > 0)
}

/// Interactive collection of every record field.
pub fn collect_full(
    prompter: &mut dyn Prompter,
    external_ip: Option<&str>,
) -> CollectResult<DeploymentRecord> {
    let project_name = ask_identifier(prompter, "Project name", DEFAULT_PROJECT_NAME)?;
    let project_user = ask_identifier(prompter, "System user", &project_name)?;
    let domain_name = ask_required(
        prompter,
        "Domain name or IP address",
        external_ip.filter(|ip| !ip.is_empty()),
    )?;
    let git_repo = ask_required(prompter, "Git repository URL", None)?;
    let app_entry_file = ask_required(
        prompter,
        "Application entry file",
        Some(DEFAULT_ENTRY_FILE),
    )?;
    let app_entry_var = ask_required(
        prompter,
        "Application object name",
        Some(DEFAULT_ENTRY_VAR),
    )?;
    let deployment_type = ask_deployment_type(prompter)?;
    let use_tls = prompter.confirm("Obtain a TLS certificate with certbot?", true)?;
    let use_security = prompter.confirm("Configure firewall and fail2ban?", true)?;

    Ok(DeploymentRecord {
        project_name,
        project_user,
        domain_name,
        git_repo,
        app_entry_file,
        app_entry_var,
        use_tls,
        use_security,
        deployment_type,
    })
}

/// Quick mode: only the repository is asked for, everything else is fixed.
pub fn collect_quick(
    prompter: &mut dyn Prompter,
    external_ip: Option<&str>,
) -> CollectResult<DeploymentRecord> {
    let git_repo = prompter.input("Git repository URL", None)?;
    if git_repo.trim().is_empty() {
        return Err(CollectError::MissingGitRepo);
    }

    Ok(DeploymentRecord {
        project_name: DEFAULT_PROJECT_NAME.to_string(),
        project_user: DEFAULT_PROJECT_NAME.to_string(),
        domain_name: external_ip
            .filter(|ip| !ip.is_empty())
            .unwrap_or(QUICK_FALLBACK_DOMAIN)
            .to_string(),
        git_repo: git_repo.trim().to_string(),
        app_entry_file: DEFAULT_ENTRY_FILE.to_string(),
        app_entry_var: DEFAULT_ENTRY_VAR.to_string(),
        use_tls: false,
        use_security: true,
        deployment_type: DeploymentType::Main,
    })
}

fn ask_required(
    prompter: &mut dyn Prompter,
    prompt: &str,
    default: Option<&str>,
) -> CollectResult<String> {
    loop {
        let answer = prompter.input(prompt, default)?;
        if !answer.trim().is_empty() {
            return Ok(answer.trim().to_string());
        }
        prompter.say("  A value is required.");
    }
}

fn ask_identifier(
    prompter: &mut dyn Prompter,
    prompt: &str,
    default: &str,
) -> CollectResult<String> {
    loop {
        let answer = ask_required(prompter, prompt, Some(default))?;
        if is_safe_identifier(&answer) {
            return Ok(answer);
        }
        prompter.say("  Use letters, digits, '-' and '_' only (must start with a letter or digit).");
    }
}

fn ask_deployment_type(prompter: &mut dyn Prompter) -> CollectResult<DeploymentType> {
    prompter.say(DEPLOYMENT_MENU);
    let choice = loop {
        let answer = prompter.input("Choose deployment type [1-3]", Some("1"))?;
        match parse_deployment_choice(&answer) {
            Some(choice) => break choice,
            None => prompter.say("  Invalid choice, enter 1, 2 or 3."),
        }
    };

    if let DeploymentType::Port(_) = choice {
        loop {
            let answer = prompter.input("Port to listen on", Some(DEFAULT_PROXY_PORT))?;
            match parse_port(&answer) {
                Some(port) => return Ok(DeploymentType::Port(port)),
                None => prompter.say("  Port must be a number between 1 and 65535."),
            }
        }
    }
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::PromptResult;
    use std::collections::VecDeque;

    /// Answers prompts from a fixed list; an empty answer selects the default.
    struct Scripted {
        answers: VecDeque<&'static str>,
        prompts: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl Prompter for Scripted {
        fn input(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String> {
            self.prompts.push(prompt.to_string());
            let answer = self.answers.pop_front().ok_or(PromptError::Exhausted)?;
            if answer.is_empty() {
                Ok(default.unwrap_or_default().to_string())
            } else {
                Ok(answer.to_string())
            }
        }

        fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool> {
            self.prompts.push(prompt.to_string());
            match self.answers.pop_front().ok_or(PromptError::Exhausted)? {
                "" => Ok(default),
                answer => Ok(answer.starts_with('y')),
            }
        }

        fn say(&mut self, _text: &str) {}
    }

    #[test]
    fn test_full_collection_with_defaults() {
        let mut prompter = Scripted::new(&[
            "blog", // project name
            "",     // user defaults to project name
            "",     // domain defaults to external ip
            "https://github.com/example/blog.git",
            "",  // entry file
            "",  // entry var
            "",  // deployment type -> main
            "",  // tls
            "n", // security
        ]);

        let record = collect_full(&mut prompter, Some("203.0.113.7")).unwrap();
        assert_eq!(record.project_name, "blog");
        assert_eq!(record.project_user, "blog");
        assert_eq!(record.domain_name, "203.0.113.7");
        assert_eq!(record.git_repo, "https://github.com/example/blog.git");
        assert_eq!(record.app_entry_file, "app.py");
        assert_eq!(record.app_entry_var, "app");
        assert_eq!(record.deployment_type, DeploymentType::Main);
        assert!(record.use_tls);
        assert!(!record.use_security);
        assert_eq!(record.proxy_port(), None);
    }

    #[test]
    fn test_invalid_menu_choice_loops_until_port() {
        let mut prompter = Scripted::new(&[
            "api",
            "deploy",
            "api.example.com",
            "git@example.com:api.git",
            "main.py",
            "server",
            "7",     // invalid
            "port",  // invalid
            "3",     // port
            "70000", // out of range
            "0",     // out of range
            "9000",
            "y",
            "y",
        ]);

        let record = collect_full(&mut prompter, None).unwrap();
        assert_eq!(record.deployment_type, DeploymentType::Port(9000));
        assert_eq!(record.proxy_port(), Some(9000));
        assert_eq!(record.project_user, "deploy");
        assert_eq!(record.wsgi_target(), "main:server");
        assert_eq!(
            prompter
                .prompts
                .iter()
                .filter(|p| p.starts_with("Choose deployment type"))
                .count(),
            3
        );
    }

    #[test]
    fn test_ip_lookup_failure_requires_domain() {
        let mut prompter = Scripted::new(&[
            "shop",
            "",
            "",                 // no default available, re-asked
            "shop.example.com", // accepted
            "https://example.com/shop.git",
            "",
            "",
            "2",
            "n",
            "n",
        ]);

        let record = collect_full(&mut prompter, None).unwrap();
        assert_eq!(record.domain_name, "shop.example.com");
        assert_eq!(record.deployment_type, DeploymentType::Subdirectory);
    }

    #[test]
    fn test_unsafe_project_name_is_reprompted() {
        let mut prompter = Scripted::new(&[
            "my app",
            "my-app",
            "",
            "example.com",
            "https://example.com/app.git",
            "",
            "",
            "1",
            "",
            "",
        ]);

        let record = collect_full(&mut prompter, None).unwrap();
        assert_eq!(record.project_name, "my-app");
    }

    #[test]
    fn test_git_repo_is_reprompted_while_empty() {
        let mut prompter = Scripted::new(&[
            "blog",
            "",
            "blog.example.com",
            "",
            "https://example.com/blog.git",
            "",
            "",
            "1",
            "",
            "",
        ]);

        let record = collect_full(&mut prompter, None).unwrap();
        assert_eq!(record.git_repo, "https://example.com/blog.git");
    }

    #[test]
    fn test_quick_mode_uses_fixed_defaults() {
        let mut prompter = Scripted::new(&["https://example.com/app.git"]);
        let record = collect_quick(&mut prompter, Some("198.51.100.4")).unwrap();

        assert_eq!(record.project_name, DEFAULT_PROJECT_NAME);
        assert_eq!(record.domain_name, "198.51.100.4");
        assert_eq!(record.deployment_type, DeploymentType::Main);
        assert!(!record.use_tls);
        assert!(record.use_security);
        assert_eq!(prompter.prompts.len(), 1);
    }

    #[test]
    fn test_quick_mode_without_repo_aborts() {
        let mut prompter = Scripted::new(&[""]);
        let err = collect_quick(&mut prompter, None).unwrap_err();
        assert!(matches!(err, CollectError::MissingGitRepo));
    }

    #[test]
    fn test_quick_mode_falls_back_to_localhost() {
        let mut prompter = Scripted::new(&["https://example.com/app.git"]);
        let record = collect_quick(&mut prompter, None).unwrap();
        assert_eq!(record.domain_name, QUICK_FALLBACK_DOMAIN);
    }
}
