//! Helpers for composing shell command lines.

use std::path::Path;

/// Quote a value for a POSIX shell. Safe words are returned untouched.
pub fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Run `command` as `user` through a login-less bash.
pub fn as_user(user: &str, command: &str) -> String {
    format!("sudo -u {} bash -c {}", quote(user), quote(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain_word() {
        assert_eq!(quote("/home/app/app"), "/home/app/app");
        assert_eq!(quote("git@github.com:me/repo.git"), "git@github.com:me/repo.git");
    }

    #[test]
    fn test_quote_special_characters() {
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_as_user_wraps_command() {
        assert_eq!(
            as_user("app", "cd /home/app && ls"),
            "sudo -u app bash -c 'cd /home/app && ls'"
        );
    }
}
