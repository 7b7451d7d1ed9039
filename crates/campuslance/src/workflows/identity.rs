//! Pre-authenticated actor identity.
//!
//! Authentication happens upstream; the core trusts the identity headers the
//! gateway injects (`x-actor-id`, `x-actor-role`) and only enforces role and
//! ownership rules on top of them.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::projects::domain::{CompanyId, StudentId, UserId};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Student,
    Company,
    Admin,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Company => "company",
            ActorRole::Admin => "admin",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "company" => Some(Self::Company),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Identity attached to every call into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub id: UserId,
    pub role: ActorRole,
}

impl ActorContext {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            role: ActorRole::Student,
        }
    }

    pub fn company(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            role: ActorRole::Company,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            role: ActorRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    /// Student profile id, when the actor is a student.
    pub fn as_student(&self) -> Option<StudentId> {
        match self.role {
            ActorRole::Student => Some(StudentId(self.id.0.clone())),
            _ => None,
        }
    }

    /// Company profile id, when the actor is a company.
    pub fn as_company(&self) -> Option<CompanyId> {
        match self.role {
            ActorRole::Company => Some(CompanyId(self.id.0.clone())),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum IdentityRejection {
    MissingHeader(&'static str),
    UnknownRole(String),
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let message = match self {
            IdentityRejection::MissingHeader(header) => {
                format!("missing identity header: {header}")
            }
            IdentityRejection::UnknownRole(role) => {
                format!("unknown actor role: {role}")
            }
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, ACTOR_ID_HEADER)?;
        let role_raw = header_value(parts, ACTOR_ROLE_HEADER)?;
        let role = ActorRole::parse(&role_raw)
            .ok_or_else(|| IdentityRejection::UnknownRole(role_raw.clone()))?;

        Ok(Self {
            id: UserId(id),
            role,
        })
    }
}

fn header_value(parts: &Parts, name: &'static str) -> Result<String, IdentityRejection> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(IdentityRejection::MissingHeader(name))
}
