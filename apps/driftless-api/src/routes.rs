use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use driftless_service::{Error, RecommendRequest, RecommendResponse};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/recommend", post(recommend))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn recommend(
	State(state): State<AppState>,
	payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
	let Json(req) = payload.map_err(|err| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text(), None)
	})?;
	let cancel = Arc::new(AtomicBool::new(false));
	let timer = {
		let cancel = cancel.clone();
		let timeout = state.request_timeout;

		tokio::spawn(async move {
			tokio::time::sleep(timeout).await;
			cancel.store(true, Ordering::Relaxed);
		})
	};
	let result = state.service.recommend_with_cancel(req, Some(cancel.as_ref())).await;

	timer.abort();

	Ok(Json(result?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidWeights { message } => json_error(
				StatusCode::BAD_REQUEST,
				"INVALID_WEIGHTS",
				message.as_str(),
				leading_field(&message),
			),
			Error::InvalidRequest { message } => json_error(
				StatusCode::BAD_REQUEST,
				"INVALID_REQUEST",
				message.as_str(),
				leading_field(&message),
			),
			Error::Internal { message } => {
				tracing::error!(error = %message, "Recommendation failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message, None)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

/// Validation messages open with the offending field name, e.g. `top_k must be ...`.
fn leading_field(message: &str) -> Option<Vec<String>> {
	message
		.split_whitespace()
		.next()
		.filter(|word| word.chars().all(|c| c.is_ascii_lowercase() || c == '_' || c == '.'))
		.map(|word| vec![word.to_string()])
}
