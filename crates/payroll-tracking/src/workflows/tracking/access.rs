//! Caller identity and role guards.
//!
//! Authentication happens upstream: the gateway forwards the caller's roles in
//! `x-user-roles` (comma separated) and the caller's employee id in
//! `x-employee-id`. [`identify_caller`] turns those headers into a
//! [`CallerIdentity`] stored in the request extensions, and handlers check it
//! against their allow-list with [`CallerIdentity::require_any`].

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::EmployeeId;
use super::error::TrackingError;

pub const ROLES_HEADER: &str = "x-user-roles";
pub const EMPLOYEE_HEADER: &str = "x-employee-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    DepartmentEmployee,
    PayrollSpecialist,
    PayrollManager,
    FinanceStaff,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::DepartmentEmployee => "department_employee",
            Role::PayrollSpecialist => "payroll_specialist",
            Role::PayrollManager => "payroll_manager",
            Role::FinanceStaff => "finance_staff",
        }
    }

    /// Accepts `Payroll Specialist`, `payroll-specialist`, and `payroll_specialist` alike.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "department_employee" => Some(Role::DepartmentEmployee),
            "payroll_specialist" => Some(Role::PayrollSpecialist),
            "payroll_manager" => Some(Role::PayrollManager),
            "finance_staff" => Some(Role::FinanceStaff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("caller identity missing")]
    MissingIdentity,
    #[error("requires one of the roles: {allowed}")]
    RoleRequired { allowed: String },
    #[error("employee context missing")]
    EmployeeContextMissing,
    #[error("employees may only access their own records")]
    NotOwner,
}

/// Identity forwarded by the authentication gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub roles: Vec<Role>,
    pub employee_id: Option<EmployeeId>,
}

impl CallerIdentity {
    pub fn new(roles: Vec<Role>, employee_id: Option<EmployeeId>) -> Self {
        Self { roles, employee_id }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AccessError> {
        let raw_roles = headers
            .get(ROLES_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(AccessError::MissingIdentity)?;

        let mut roles = Vec::new();
        for token in raw_roles.split(',').filter(|token| !token.trim().is_empty()) {
            match Role::parse(token) {
                Some(role) if !roles.contains(&role) => roles.push(role),
                Some(_) => {}
                None => debug!(role = token.trim(), "ignoring role without payroll access"),
            }
        }

        let employee_id = headers
            .get(EMPLOYEE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(EmployeeId::new);

        Ok(Self { roles, employee_id })
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn require_any(&self, allowed: &[Role]) -> Result<(), AccessError> {
        if allowed.iter().any(|role| self.has_role(*role)) {
            return Ok(());
        }
        let allowed = allowed
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(AccessError::RoleRequired { allowed })
    }

    pub fn require_employee(&self) -> Result<&EmployeeId, AccessError> {
        self.employee_id
            .as_ref()
            .ok_or(AccessError::EmployeeContextMissing)
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = TrackingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or(TrackingError::Access(AccessError::MissingIdentity))
    }
}

/// Middleware injecting the forwarded [`CallerIdentity`] into request extensions.
pub async fn identify_caller(mut request: Request, next: Next) -> Response {
    match CallerIdentity::from_headers(request.headers()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            warn!(reason = %err, path = %request.uri().path(), "rejecting request without caller identity");
            TrackingError::Access(err).into_response()
        }
    }
}
