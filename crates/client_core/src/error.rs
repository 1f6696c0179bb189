use thiserror::Error;

/// Failures surfaced by the client core.
///
/// `Transport` is the tagged failure for any non-success response; the other
/// variants cover cases where no usable response exists at all.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{}", transport_message(.status, .detail))]
    Transport { status: u16, detail: Option<String> },
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response from backend: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("local persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

fn transport_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("An error occurred (status {status})"),
    }
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
