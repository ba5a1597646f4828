use axum::http::StatusCode;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::meal_plans::repo_types::MealType;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("invalid profile: {field} {reason}")]
    InvalidProfile { field: &'static str, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("insufficient food options for {slot} on day {day}: {reason}")]
    InsufficientFoodOptions {
        day: u32,
        slot: MealType,
        reason: String,
    },

    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PlannerError {
    pub fn invalid_profile(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            field,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidProfile { .. } | Self::InsufficientFoodOptions { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Catalog(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Maps an error to the `(StatusCode, String)` rejection used by all handlers.
pub fn reject(err: impl Into<PlannerError>) -> (StatusCode, String) {
    let err = err.into();
    let status = err.status();
    if status.is_server_error() {
        error!(error = %err, %status, "request failed");
    } else {
        warn!(error = %err, %status, "request rejected");
    }
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            PlannerError::invalid_profile("age", "is required").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            PlannerError::InvalidRequest("num_days".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlannerError::NotFound("meal plan".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PlannerError::from(anyhow::anyhow!("connection reset")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn insufficient_options_names_day_and_slot() {
        let (status, body) = reject(PlannerError::InsufficientFoodOptions {
            day: 2,
            slot: MealType::Dinner,
            reason: "no admissible foods".into(),
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("dinner"));
        assert!(body.contains("day 2"));
    }
}
