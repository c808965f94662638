use axum::{
	Json, Router,
	body::Bytes,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::state::AppState;
use pantry_service::{
	AddItemRequest, ConfirmRequest, ConfirmResponse, Error, JobView, PantryItemView,
	PantryListResponse, StagedItemView, SubmitRequest, SubmitResponse,
};

#[derive(Debug, Deserialize)]
struct ResetParams {
	confirm: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}

	fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } => Self::invalid_request(message),
			Error::NotFound { message } => Self::new(StatusCode::NOT_FOUND, "not_found", message),
			Error::InvalidState { message } =>
				Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", message),
			Error::Conflict { message } => Self::new(StatusCode::CONFLICT, "conflict", message),
			Error::Provider { message } => {
				tracing::warn!(%message, "Upstream provider failed.");

				Self::new(StatusCode::BAD_GATEWAY, "provider_error", message)
			},
			Error::Storage { message } => {
				tracing::error!(%message, "Storage request failed.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code.to_string(), message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/healthz", get(health))
		.route("/pantry", get(list_items))
		.route("/pantry/items", post(add_item))
		.route("/pantry/items/{item_id}", delete(delete_item))
		.route("/pantry/reset", delete(reset))
		.route("/pantry/ingest", post(submit))
		.route("/pantry/ingest/{job_id}", get(get_job))
		.route("/pantry/ingest/{job_id}/items/{staged_item_id}", patch(update_staged_item))
		.route("/pantry/ingest/{job_id}/confirm", post(confirm))
		.with_state(state)
}

async fn health() -> &'static str {
	"ok"
}

async fn list_items(State(state): State<AppState>) -> Result<Json<PantryListResponse>, ApiError> {
	Ok(Json(state.service.list_items().await?))
}

async fn add_item(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<(StatusCode, Json<PantryItemView>), ApiError> {
	let req: AddItemRequest = parse_body(&body)?;
	let item = state.service.add_item(req).await?;

	Ok((StatusCode::CREATED, Json(item)))
}

async fn delete_item(
	State(state): State<AppState>,
	Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
	let item_id = parse_id(&item_id, "item_id")?;

	state.service.delete_item(item_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn reset(
	State(state): State<AppState>,
	Query(params): Query<ResetParams>,
) -> Result<StatusCode, ApiError> {
	if params.confirm.as_deref() != Some("true") {
		return Err(ApiError::invalid_request("Resetting the pantry requires confirm=true."));
	}

	state.service.reset().await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn submit(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
	let req: SubmitRequest = parse_body(&body)?;
	// The task keeps running after the response; clients poll the job.
	let submitted = state.service.submit(req).await?;

	Ok((StatusCode::ACCEPTED, Json(submitted.job)))
}

async fn get_job(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
	let job_id = parse_id(&job_id, "job_id")?;

	Ok(Json(state.service.get_job(job_id).await?))
}

async fn update_staged_item(
	State(state): State<AppState>,
	Path((job_id, staged_item_id)): Path<(String, String)>,
	body: Bytes,
) -> Result<Json<StagedItemView>, ApiError> {
	let job_id = parse_id(&job_id, "job_id")?;
	let staged_item_id = parse_id(&staged_item_id, "staged_item_id")?;
	let edit = parse_body(&body)?;

	Ok(Json(state.service.update_staged_item(job_id, staged_item_id, edit).await?))
}

async fn confirm(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
	body: Bytes,
) -> Result<Json<ConfirmResponse>, ApiError> {
	let job_id = parse_id(&job_id, "job_id")?;
	let req = if body.iter().all(u8::is_ascii_whitespace) {
		ConfirmRequest::default()
	} else {
		parse_body::<ConfirmRequest>(&body)?
	};

	Ok(Json(state.service.confirm_job(job_id, req.overrides).await?))
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, ApiError> {
	Uuid::parse_str(raw).map_err(|_| ApiError::invalid_request(format!("{field} must be a UUID.")))
}

fn parse_body<T>(body: &[u8]) -> Result<T, ApiError>
where
	T: DeserializeOwned,
{
	serde_json::from_slice(body)
		.map_err(|err| ApiError::invalid_request(format!("Request body is invalid: {err}.")))
}
