//! Line commands typed at the prompt.

use anyhow::{bail, Result};
use shared::domain::{DocumentId, StepDecision, StepId, UserId};

pub const TEST_USER_EMAIL: &str = "test@docengine.com";
pub const TEST_USER_PASSWORD: &str = "password123";

pub const HELP: &str = "\
commands:
  go <path>                               navigate, e.g. go /document/42
  back | forward | reload
  login <email> <password>
  logout
  create <title>
  approve <document> <step> <approver>
  reject <document> <step> <approver>
  test-user [email] [password]
  health
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Back,
    Forward,
    Reload,
    Login {
        email: String,
        password: String,
    },
    Logout,
    Create {
        title: String,
    },
    Decide {
        decision: StepDecision,
        document_id: DocumentId,
        step_id: StepId,
        approver_id: UserId,
    },
    TestUser {
        email: String,
        password: String,
    },
    Health,
    Help,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Go(_) => "go",
            Self::Back => "back",
            Self::Forward => "forward",
            Self::Reload => "reload",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::Create { .. } => "create",
            Self::Decide {
                decision: StepDecision::Approve,
                ..
            } => "approve",
            Self::Decide {
                decision: StepDecision::Reject,
                ..
            } => "reject",
            Self::TestUser { .. } => "test-user",
            Self::Health => "health",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

/// Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    let Some(keyword) = line.split_whitespace().next() else {
        return Ok(None);
    };
    let rest = line[keyword.len()..].trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match (keyword, args.as_slice()) {
        ("go", [path]) => Command::Go((*path).to_string()),
        ("back", []) => Command::Back,
        ("forward", []) => Command::Forward,
        ("reload", []) => Command::Reload,
        ("login", [email, password]) => Command::Login {
            email: (*email).to_string(),
            password: (*password).to_string(),
        },
        ("logout", []) => Command::Logout,
        ("create", _) if !rest.is_empty() => Command::Create {
            title: rest.to_string(),
        },
        ("approve" | "reject", [document_id, step_id, approver_id]) => Command::Decide {
            decision: if keyword == "approve" {
                StepDecision::Approve
            } else {
                StepDecision::Reject
            },
            document_id: DocumentId::from(*document_id),
            step_id: StepId::from(*step_id),
            approver_id: UserId::from(*approver_id),
        },
        ("test-user", []) => Command::TestUser {
            email: TEST_USER_EMAIL.to_string(),
            password: TEST_USER_PASSWORD.to_string(),
        },
        ("test-user", [email]) => Command::TestUser {
            email: (*email).to_string(),
            password: TEST_USER_PASSWORD.to_string(),
        },
        ("test-user", [email, password]) => Command::TestUser {
            email: (*email).to_string(),
            password: (*password).to_string(),
        },
        ("health", []) => Command::Health,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (
            "go" | "back" | "forward" | "reload" | "login" | "logout" | "create" | "approve"
            | "reject" | "test-user" | "health" | "help" | "quit",
            _,
        ) => bail!("wrong arguments for '{keyword}'; type 'help'"),
        _ => bail!("unknown command '{keyword}'; type 'help'"),
    };
    Ok(Some(command))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
