/// Request/response contracts of the dashboard endpoints the surrounding
/// UI talks to. The chat engine itself makes no network calls; these types
/// only pin down the JSON shapes.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("request rejected without an error message")]
    Unspecified,
}

/// HTTP method of a dashboard call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// A command against one bot: `/api/bot/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Toggle { bot_id: u64, active: bool },
    Restart { bot_id: u64 },
    Test { bot_id: u64 },
    Delete { bot_id: u64 },
}

#[derive(Serialize)]
struct ToggleBody {
    active: bool,
}

impl BotCommand {
    pub fn bot_id(&self) -> u64 {
        match *self {
            Self::Toggle { bot_id, .. }
            | Self::Restart { bot_id }
            | Self::Test { bot_id }
            | Self::Delete { bot_id } => bot_id,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Toggle { .. } => "toggle",
            Self::Restart { .. } => "restart",
            Self::Test { .. } => "test",
            Self::Delete { .. } => "delete",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Delete { .. } => Method::Delete,
            _ => Method::Post,
        }
    }

    pub fn path(&self) -> String {
        format!("/api/bot/{}/{}", self.bot_id(), self.action())
    }

    /// JSON body, if the command carries one.
    pub fn body(&self) -> Option<String> {
        match *self {
            Self::Toggle { active, .. } => serde_json::to_string(&ToggleBody { active }).ok(),
            _ => None,
        }
    }
}

/// `GET /api/dashboard/refresh`.
pub const DASHBOARD_REFRESH_PATH: &str = "/api/dashboard/refresh";

/// Counters returned by the dashboard refresh endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub bot_count: u64,
    pub active_bots: u64,
}

/// The `{ success, error?, ...data }` envelope every endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(match self.error {
                Some(msg) if !msg.is_empty() => ApiError::Rejected(msg),
                _ => ApiError::Unspecified,
            })
        }
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// Payload of endpoints that return nothing beyond the envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}
