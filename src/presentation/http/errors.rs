use poem::http::StatusCode;

use crate::domain::errors::DomainError;

pub fn map_domain_error(err: DomainError) -> poem::Error {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidState(_) => StatusCode::CONFLICT,
        DomainError::Store(inner) => {
            tracing::error!(error = ?inner, "store operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    poem::Error::from_string(err.to_string(), status)
}
