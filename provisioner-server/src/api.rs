use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use provisioner_core::{ProvisionOutcome, ProvisionResponse};

use crate::{errors::ApiError, AppState};

pub async fn provision(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    let provisioned = state
        .provisioner
        .handle(method.as_str(), uri.path())
        .await?;

    let status = match provisioned.outcome {
        ProvisionOutcome::Created => StatusCode::CREATED,
        ProvisionOutcome::Existing => StatusCode::OK,
    };

    Ok(json_response(status, &provisioned.response))
}

// The status is decided before encoding; a failed encode leaves the body empty.
fn json_response(status: StatusCode, body: &ProvisionResponse) -> Response {
    let content_type = [(header::CONTENT_TYPE, "application/json")];

    match serde_json::to_vec(body) {
        Ok(mut json) => {
            json.push(b'\n');
            tracing::info!("Reported successful topic {:?}", body.topic);
            (status, content_type, json).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to write json response: {}", e);
            (status, content_type).into_response()
        }
    }
}
