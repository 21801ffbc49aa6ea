use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::Validation => "validation",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown blood group '{0}'; expected one of A+ A- B+ B- AB+ AB- O+ O-")]
    UnknownBloodGroup(String),
    #[error("unknown gender '{0}'; expected Male, Female or Other")]
    UnknownGender(String),
    #[error("donor {0} not found")]
    DonorNotFound(i64),
}

impl DomainError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::UnknownBloodGroup(_) | DomainError::UnknownGender(_) => {
                ErrorCode::Validation
            }
            DomainError::DonorNotFound(_) => ErrorCode::NotFound,
        }
    }
}
