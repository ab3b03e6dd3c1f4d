//! Chat command grammar.
//!
//! Supported commands:
//! ```text
//! build <app> <branch>
//! deploy <app> <build#> <qa|uat|prod>
//! status <app>
//! rollback <app> <qa|uat|prod>
//! history <app>
//! help
//! ```
//!
//! [`parse`] never fails. Invalid input produces a [`Command`] whose `error`
//! carries a message suitable for showing to the operator.

use crate::types::{ActionKind, Environment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const BUILD_USAGE: &str = "Usage: `build <app> <branch>`  e.g. `build myapp main`";
pub const DEPLOY_USAGE: &str =
    "Usage: `deploy <app> <build#> <qa|uat|prod>`  e.g. `deploy myapp 42 qa`";
pub const STATUS_USAGE: &str = "Usage: `status <app>`  e.g. `status myapp`";
pub const ROLLBACK_USAGE: &str =
    "Usage: `rollback <app> <environment>`  e.g. `rollback myapp prod`";
pub const HISTORY_USAGE: &str = "Usage: `history <app>`  e.g. `history myapp`";

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Command {
    fn bare(action: ActionKind, raw: &str) -> Self {
        Self {
            action,
            app: None,
            branch: None,
            build_number: None,
            environment: None,
            raw: raw.to_string(),
            error: None,
        }
    }

    fn invalid(action: ActionKind, raw: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(action, raw)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// Mention stripping
// ---------------------------------------------------------------------------

static MENTION_RE: OnceLock<Regex> = OnceLock::new();

fn mention_re() -> &'static Regex {
    MENTION_RE.get_or_init(|| Regex::new(r"<at>[^<]*</at>").unwrap())
}

/// Remove `<at>…</at>` mention markup, repeating until none is left so that
/// nested markup cannot survive a single pass.
fn strip_mentions(message: &str) -> String {
    let mut text = message.trim().to_string();
    while mention_re().is_match(&text) {
        text = mention_re().replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}

fn parse_environment(token: &str, raw: &str, action: ActionKind) -> Result<Environment, Command> {
    token.parse::<Environment>().map_err(|_| {
        Command::invalid(
            action,
            raw,
            format!("Invalid environment `{token}`. Choose from: qa, uat, prod"),
        )
    })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a raw chat message into a [`Command`].
pub fn parse(message: &str) -> Command {
    let text = strip_mentions(message);
    let raw = text.as_str();
    let lowered = text.to_lowercase();
    let parts: Vec<&str> = lowered.split_whitespace().collect();

    let Some(first) = parts.first() else {
        return Command::bare(ActionKind::Help, raw);
    };

    let Some(action) = ActionKind::from_token(first) else {
        return Command::invalid(
            ActionKind::Unknown,
            raw,
            format!("Unknown command `{first}`. Type `help` to see available commands."),
        );
    };

    let args = &parts[1..];
    match action {
        ActionKind::Help => Command::bare(ActionKind::Help, raw),
        ActionKind::Build => {
            if args.len() < 2 {
                return Command::invalid(action, raw, BUILD_USAGE);
            }
            Command {
                app: Some(args[0].to_string()),
                branch: Some(args[1].to_string()),
                ..Command::bare(action, raw)
            }
        }
        ActionKind::Deploy => {
            if args.len() < 3 {
                return Command::invalid(action, raw, DEPLOY_USAGE);
            }
            let environment = match parse_environment(args[2], raw, action) {
                Ok(env) => env,
                Err(cmd) => return cmd,
            };
            Command {
                app: Some(args[0].to_string()),
                build_number: Some(args[1].to_string()),
                environment: Some(environment),
                ..Command::bare(action, raw)
            }
        }
        ActionKind::Status => {
            if args.is_empty() {
                return Command::invalid(action, raw, STATUS_USAGE);
            }
            Command {
                app: Some(args[0].to_string()),
                ..Command::bare(action, raw)
            }
        }
        ActionKind::Rollback => {
            if args.len() < 2 {
                return Command::invalid(action, raw, ROLLBACK_USAGE);
            }
            let environment = match parse_environment(args[1], raw, action) {
                Ok(env) => env,
                Err(cmd) => return cmd,
            };
            Command {
                app: Some(args[0].to_string()),
                environment: Some(environment),
                ..Command::bare(action, raw)
            }
        }
        ActionKind::History => {
            if args.is_empty() {
                return Command::invalid(action, raw, HISTORY_USAGE);
            }
            Command {
                app: Some(args[0].to_string()),
                ..Command::bare(action, raw)
            }
        }
        ActionKind::Unknown => {
            Command::invalid(ActionKind::Unknown, raw, "Could not parse command.")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_not_actionable(cmd: &Command) {
        assert!(cmd.error.is_some(), "expected an error for {:?}", cmd.raw);
        assert!(cmd.app.is_none());
        assert!(cmd.branch.is_none());
        assert!(cmd.build_number.is_none());
        assert!(cmd.environment.is_none());
    }

    #[test]
    fn empty_input_is_help() {
        let cmd = parse("   ");
        assert_eq!(cmd.action, ActionKind::Help);
        assert!(cmd.error.is_none());
        assert_eq!(cmd.raw, "");
    }

    #[test]
    fn mention_only_is_help() {
        let cmd = parse("<at>DeployBot</at>");
        assert_eq!(cmd.action, ActionKind::Help);
        assert!(cmd.is_valid());
    }

    #[test]
    fn strips_mention_before_tokenizing() {
        let cmd = parse("<at>DeployBot</at> deploy myapp 42 qa");
        assert_eq!(cmd.action, ActionKind::Deploy);
        assert_eq!(cmd.app.as_deref(), Some("myapp"));
        assert_eq!(cmd.build_number.as_deref(), Some("42"));
        assert_eq!(cmd.environment, Some(Environment::Qa));
        assert_eq!(cmd.raw, "deploy myapp 42 qa");
    }

    #[test]
    fn nested_mentions_are_fully_removed() {
        let cmd = parse("<at><at>Bot</at></at> status myapp");
        assert_eq!(cmd.raw, "status myapp");
        assert_eq!(cmd.action, ActionKind::Status);
    }

    #[test]
    fn action_is_case_insensitive() {
        let cmd = parse("BUILD MyApp Main");
        assert_eq!(cmd.action, ActionKind::Build);
        assert_eq!(cmd.app.as_deref(), Some("myapp"));
        assert_eq!(cmd.branch.as_deref(), Some("main"));
        assert_eq!(cmd.raw, "BUILD MyApp Main");
    }

    #[test]
    fn unknown_action_names_the_token() {
        let cmd = parse("ship myapp");
        assert_eq!(cmd.action, ActionKind::Unknown);
        assert!(cmd.error.as_deref().unwrap().contains("`ship`"));
        assert_not_actionable(&cmd);
    }

    #[test]
    fn literal_unknown_is_not_a_command() {
        let cmd = parse("unknown");
        assert_eq!(cmd.action, ActionKind::Unknown);
        assert!(cmd.error.is_some());
    }

    #[test]
    fn build_missing_branch_is_error() {
        let cmd = parse("build myapp");
        assert_eq!(cmd.action, ActionKind::Build);
        assert_eq!(cmd.error.as_deref(), Some(BUILD_USAGE));
        assert_not_actionable(&cmd);
    }

    #[test]
    fn deploy_requires_three_args() {
        for text in ["deploy", "deploy myapp", "deploy myapp 42"] {
            let cmd = parse(text);
            assert_eq!(cmd.action, ActionKind::Deploy);
            assert_eq!(cmd.error.as_deref(), Some(DEPLOY_USAGE));
            assert_not_actionable(&cmd);
        }
    }

    #[test]
    fn deploy_rejects_invalid_environment() {
        let cmd = parse("deploy myapp 42 staging");
        assert_eq!(cmd.action, ActionKind::Deploy);
        assert!(cmd.error.as_deref().unwrap().contains("`staging`"));
        assert_not_actionable(&cmd);
    }

    #[test]
    fn deploy_parses_all_fields() {
        let cmd = parse("deploy myapp 1.0.42 PROD");
        assert!(cmd.is_valid());
        assert_eq!(cmd.build_number.as_deref(), Some("1.0.42"));
        assert_eq!(cmd.environment, Some(Environment::Prod));
        assert!(cmd.branch.is_none());
    }

    #[test]
    fn status_and_history_need_an_app() {
        assert_eq!(parse("status").error.as_deref(), Some(STATUS_USAGE));
        assert_eq!(parse("history").error.as_deref(), Some(HISTORY_USAGE));
        assert_eq!(parse("status myapp").app.as_deref(), Some("myapp"));
        assert_eq!(parse("history myapp").app.as_deref(), Some("myapp"));
    }

    #[test]
    fn rollback_validates_environment() {
        let ok = parse("rollback myapp uat");
        assert!(ok.is_valid());
        assert_eq!(ok.environment, Some(Environment::Uat));
        assert!(ok.build_number.is_none());

        let short = parse("rollback myapp");
        assert_eq!(short.error.as_deref(), Some(ROLLBACK_USAGE));
        assert_not_actionable(&short);

        let bad = parse("rollback myapp dev");
        assert!(bad.error.as_deref().unwrap().contains("`dev`"));
        assert_not_actionable(&bad);
    }

    #[test]
    fn trailing_tokens_are_ignored() {
        let cmd = parse("status myapp please");
        assert!(cmd.is_valid());
        assert_eq!(cmd.app.as_deref(), Some("myapp"));
    }

    #[test]
    fn parse_is_idempotent_on_raw() {
        let inputs = [
            "",
            "help",
            "<at>Bot</at>   deploy  MyApp 42 qa ",
            "<at><at>x</at></at>build a",
            "rollback myapp nowhere",
            "frobnicate",
            "history myapp",
            "deploy myapp 42 prod extra tokens",
        ];
        for input in inputs {
            let first = parse(input);
            let second = parse(&first.raw);
            assert_eq!(first, second, "not idempotent for {input:?}");
        }
    }
}
