use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use provisioner_core::{ConfigError, ProvisionError};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP face of a failed provisioning request.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ProvisionError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ProvisionError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProvisionError::MalformedPath => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self.0 {
            ProvisionError::MethodNotAllowed(method) => {
                debug!(%method, "Rejected non-PUT request");
                return status.into_response();
            }
            e if e.is_client_error() => debug!("{}", e),
            e => error!("{}", e),
        }

        (status, format!("{}\n", self.0)).into_response()
    }
}
