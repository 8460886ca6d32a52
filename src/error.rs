//! Unified application error model and mapping helpers.
//! This module provides the error enum returned by the rule store, the host
//! integration and the HTTP surface, along with the HTTP status mapping.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::BackendError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Domain or email failed normalization/shape checks; raised before storage is touched.
    Validation { code: String, message: String },
    /// Rule editing is switched off for this surface.
    Locked { code: String, message: String },
    /// A storage write did not persist.
    Backend { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Locked { code, .. }
            | AppError::Backend { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Locked { message, .. }
            | AppError::Backend { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn locked<S: Into<String>>(code: S, msg: S) -> Self { AppError::Locked { code: code.into(), message: msg.into() } }

    pub fn is_validation(&self) -> bool { matches!(self, AppError::Validation { .. }) }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::Locked { .. } => 403,
            AppError::Backend { .. } => 503,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend { code: err.code().into(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
