//! Input line parsing
//!
//! Lines starting with `/` are commands; anything else is a prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Logout,
    WhoAmI,
    Transcript,
    Help,
    Quit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Command(Command),
    Prompt(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Input::Empty;
        }

        // `//text` sends a prompt that starts with a slash
        if let Some(rest) = trimmed.strip_prefix("//") {
            return Input::Prompt(format!("/{rest}"));
        }

        let Some(without_prefix) = trimmed.strip_prefix('/') else {
            return Input::Prompt(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let name = without_prefix
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        let command = match name.as_str() {
            "login" | "signin" => Command::Login,
            "logout" | "signout" => Command::Logout,
            "whoami" | "me" => Command::WhoAmI,
            "transcript" | "history" => Command::Transcript,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => Command::Unknown(name),
        };

        Input::Command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(Input::parse("/login"), Input::Command(Command::Login));
        assert_eq!(Input::parse("  /LOGOUT "), Input::Command(Command::Logout));
        assert_eq!(Input::parse("/q"), Input::Command(Command::Quit));
        assert_eq!(Input::parse("/whoami now"), Input::Command(Command::WhoAmI));
        assert_eq!(
            Input::parse("/bogus"),
            Input::Command(Command::Unknown("bogus".to_string()))
        );
    }

    #[test]
    fn test_prompts() {
        assert_eq!(Input::parse("hello there\n"), Input::Prompt("hello there".to_string()));
        assert_eq!(Input::parse("//etc/hosts?"), Input::Prompt("/etc/hosts?".to_string()));
    }

    #[test]
    fn test_blank() {
        assert_eq!(Input::parse(""), Input::Empty);
        assert_eq!(Input::parse("   \t"), Input::Empty);
    }
}
