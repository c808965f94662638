use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
	time::Duration,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{Error, PantryService, Result};
use pantry_domain::{
	IngredientRef, JobKind, JobStatus, review,
	staging::{CommitValues, ItemOverride},
};
use pantry_providers::extractor::ExtractedItem;
use pantry_storage::models::{IngestionJob, JobTransition, StagedItem};

#[derive(Clone, Debug, Deserialize)]
pub struct SubmitRequest {
	/// Job kind; `text_blob` when omitted.
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
	pub job_id: Uuid,
	pub status: JobStatus,
}

/// A freshly created job plus the detached task that stages it.
pub struct SubmittedJob {
	pub job: SubmitResponse,
	pub processing: JoinHandle<()>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverrideItem {
	pub staged_item_id: Uuid,
	#[serde(flatten)]
	pub values: ItemOverride,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfirmRequest {
	#[serde(default)]
	pub overrides: Vec<OverrideItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
	pub job_id: Uuid,
	pub status: JobStatus,
	/// Inventory rows written, in staged-item order.
	pub item_ids: Vec<Uuid>,
	/// Staged items left out because they had no resolved ingredient.
	pub skipped: Vec<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StagedItemView {
	pub staged_item_id: Uuid,
	pub job_id: Uuid,
	pub ingredient_id: Option<Uuid>,
	pub raw_text: String,
	pub quantity: f64,
	pub unit: String,
	pub confidence: f64,
	pub needs_review: bool,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<StagedItem> for StagedItemView {
	fn from(item: StagedItem) -> Self {
		Self {
			staged_item_id: item.staged_item_id,
			job_id: item.job_id,
			ingredient_id: item.ingredient_id,
			raw_text: item.raw_text,
			quantity: item.quantity,
			unit: item.unit,
			confidence: item.confidence,
			needs_review: item.needs_review,
			updated_at: item.updated_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct JobView {
	pub job_id: Uuid,
	pub kind: JobKind,
	pub status: JobStatus,
	pub raw_input: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
	pub items: Vec<StagedItemView>,
}

impl PantryService {
	/// Validates and records a new `pending` job. Nothing is extracted here.
	pub async fn create_job(&self, req: SubmitRequest) -> Result<IngestionJob> {
		let kind = match req.kind.as_deref() {
			None => JobKind::default(),
			Some(raw) =>
				raw.parse::<JobKind>().map_err(|err| Error::invalid_request(err.to_string()))?,
		};

		if req.content.trim().is_empty() {
			return Err(Error::invalid_request("content must not be empty."));
		}

		let now = OffsetDateTime::now_utc();
		let job = IngestionJob {
			job_id: Uuid::new_v4(),
			kind: kind.as_str().to_string(),
			raw_input: req.content,
			status: JobStatus::Pending.as_str().to_string(),
			error: None,
			created_at: now,
			updated_at: now,
		};

		self.jobs.insert_job(&job).await?;

		tracing::info!(job_id = %job.job_id, kind = %kind, "Ingestion job created.");

		Ok(job)
	}

	pub async fn submit(self: &Arc<Self>, req: SubmitRequest) -> Result<SubmittedJob> {
		let job = self.create_job(req).await?;
		let processing = self.spawn_processing(job.job_id, job.raw_input);

		Ok(SubmittedJob {
			job: SubmitResponse { job_id: job.job_id, status: JobStatus::Pending },
			processing,
		})
	}

	/// Runs the processing phase in its own task under the total budget.
	///
	/// Any error ends the job as `failed` with the message recorded on it.
	pub fn spawn_processing(self: &Arc<Self>, job_id: Uuid, raw_input: String) -> JoinHandle<()> {
		let service = Arc::clone(self);

		tokio::spawn(async move {
			let budget_ms = service.cfg.ingest.process_timeout_ms;
			let outcome = match tokio::time::timeout(
				Duration::from_millis(budget_ms),
				service.process_job(job_id, &raw_input),
			)
			.await
			{
				Ok(result) => result,
				Err(_) => Err(Error::Provider {
					message: format!("Processing timed out after {budget_ms} ms."),
				}),
			};

			match outcome {
				Ok(staged) => tracing::info!(%job_id, staged, "Ingestion job staged."),
				Err(err) => {
					tracing::error!(%job_id, error = %err, "Ingestion processing failed.");

					service.fail_job(job_id, err.to_string()).await;
				},
			}
		})
	}

	/// Extracts, resolves, and stages every candidate, then moves the job to `staged`.
	///
	/// Returns the number of staged items. Never touches the inventory.
	pub async fn process_job(&self, job_id: Uuid, raw_input: &str) -> Result<usize> {
		let budget_ms = self.cfg.ingest.extract_timeout_ms;
		let call = self.providers.extractor.extract(&self.cfg.providers.extractor, raw_input);
		let candidates = match tokio::time::timeout(Duration::from_millis(budget_ms), call).await {
			Ok(result) => result?,
			Err(_) => {
				return Err(Error::Provider {
					message: format!("Extraction timed out after {budget_ms} ms."),
				});
			},
		};

		tracing::info!(%job_id, candidates = candidates.len(), "Extraction finished.");

		for candidate in &candidates {
			let item = self.stage_candidate(job_id, candidate).await;

			self.jobs.insert_staged_item(&item).await?;
		}

		self.transition(job_id, JobStatus::Pending, JobStatus::Staged, None).await?.ok_or_else(
			|| Error::Conflict { message: format!("Job {job_id} is no longer pending.") },
		)?;

		Ok(candidates.len())
	}

	pub async fn get_job(&self, job_id: Uuid) -> Result<JobView> {
		let job = self.load_job(job_id).await?;
		let items = self.jobs.list_staged_items(job_id).await?;

		Ok(JobView {
			job_id: job.job_id,
			kind: parse_stored(&job.kind)?,
			status: parse_stored(&job.status)?,
			raw_input: job.raw_input,
			error: job.error,
			created_at: job.created_at,
			updated_at: job.updated_at,
			items: items.into_iter().map(StagedItemView::from).collect(),
		})
	}

	/// Applies an operator edit to one staged item of a `staged` job.
	pub async fn update_staged_item(
		&self,
		job_id: Uuid,
		staged_item_id: Uuid,
		edit: ItemOverride,
	) -> Result<StagedItemView> {
		edit.validate()?;

		let job = self.load_job(job_id).await?;

		require_staged(&job, "edit")?;

		let mut item = self
			.jobs
			.list_staged_items(job_id)
			.await?
			.into_iter()
			.find(|item| item.staged_item_id == staged_item_id)
			.ok_or_else(|| Error::NotFound {
				message: format!("Staged item {staged_item_id} is not part of job {job_id}."),
			})?;
		let values = staged_values(&item).apply(Some(&edit));

		item.ingredient_id = values.ingredient.ingredient_id();
		item.quantity = values.quantity;
		item.unit = values.unit;
		// An edited item with an ingredient counts as reviewed.
		item.needs_review = !values.ingredient.is_resolved();
		item.updated_at = OffsetDateTime::now_utc();

		let item = self.jobs.update_staged_item(&item).await?;

		tracing::info!(%job_id, %staged_item_id, "Staged item edited.");

		Ok(item.into())
	}

	/// Commits a `staged` job into the inventory, one upsert per staged item.
	///
	/// A failed upsert stops the loop with the job still `staged`; rows already written stay.
	pub async fn confirm_job(
		&self,
		job_id: Uuid,
		overrides: Vec<OverrideItem>,
	) -> Result<ConfirmResponse> {
		let job = self.load_job(job_id).await?;

		require_staged(&job, "confirm")?;

		let staged = self.jobs.list_staged_items(job_id).await?;
		let overrides = index_overrides(job_id, &staged, &overrides)?;
		let mut item_ids = Vec::new();
		let mut skipped = Vec::new();

		for item in &staged {
			let values =
				staged_values(item).apply(overrides.get(&item.staged_item_id).copied());
			let Some(ingredient_id) = values.ingredient.ingredient_id() else {
				tracing::warn!(
					%job_id,
					staged_item_id = %item.staged_item_id,
					"Skipping staged item without a resolved ingredient."
				);
				skipped.push(item.staged_item_id);

				continue;
			};

			match self.upsert_item(ingredient_id, values.quantity, values.unit, None).await {
				Ok(row) => item_ids.push(row.item_id),
				Err(err) => {
					tracing::error!(
						%job_id,
						staged_item_id = %item.staged_item_id,
						%ingredient_id,
						error = %err,
						"Confirm stopped on a failed inventory write."
					);

					if !item_ids.is_empty() {
						self.publish_updated(&item_ids).await;
					}

					return Err(err);
				},
			}
		}

		if !item_ids.is_empty() {
			self.publish_updated(&item_ids).await;
		}

		self.transition(job_id, JobStatus::Staged, JobStatus::Confirmed, None).await?.ok_or_else(
			|| Error::Conflict { message: format!("Job {job_id} was confirmed concurrently.") },
		)?;

		tracing::info!(
			%job_id,
			committed = item_ids.len(),
			skipped = skipped.len(),
			"Ingestion job confirmed."
		);

		Ok(ConfirmResponse { job_id, status: JobStatus::Confirmed, item_ids, skipped })
	}

	async fn stage_candidate(&self, job_id: Uuid, candidate: &ExtractedItem) -> StagedItem {
		let sanitized =
			review::sanitize_candidate(candidate.quantity, &candidate.unit, candidate.confidence);
		let name = candidate.name.trim();
		let ingredient = if name.is_empty() {
			tracing::warn!(%job_id, raw_text = %candidate.raw_text, "Candidate has no name.");

			IngredientRef::Unresolved
		} else {
			match self.resolve_name(name).await {
				Ok(resolved) => IngredientRef::Resolved(resolved.ingredient.id),
				Err(err) => {
					tracing::warn!(%job_id, name, error = %err, "Ingredient resolution failed.");

					IngredientRef::Unresolved
				},
			}
		};
		let needs_review = sanitized.repaired
			|| review::needs_review(
				sanitized.confidence,
				self.cfg.ingest.review_threshold,
				ingredient,
			);
		let now = OffsetDateTime::now_utc();

		StagedItem {
			staged_item_id: Uuid::new_v4(),
			job_id,
			ingredient_id: ingredient.ingredient_id(),
			raw_text: candidate.raw_text.clone(),
			quantity: sanitized.quantity,
			unit: sanitized.unit,
			confidence: sanitized.confidence,
			needs_review,
			created_at: now,
			updated_at: now,
		}
	}

	async fn fail_job(&self, job_id: Uuid, message: String) {
		match self.transition(job_id, JobStatus::Pending, JobStatus::Failed, Some(message)).await {
			Ok(Some(_)) => {},
			Ok(None) => tracing::error!(%job_id, "Failed job is no longer pending."),
			Err(err) => tracing::error!(%job_id, error = %err, "Failed to mark job as failed."),
		}
	}

	async fn transition(
		&self,
		job_id: Uuid,
		from: JobStatus,
		to: JobStatus,
		error: Option<String>,
	) -> Result<Option<IngestionJob>> {
		if !from.can_transition_to(to) {
			return Err(Error::InvalidState {
				message: format!("Job {job_id} cannot move from {from} to {to}."),
			});
		}

		let transition = JobTransition {
			job_id,
			from: from.as_str(),
			to: to.as_str(),
			error,
			at: OffsetDateTime::now_utc(),
		};

		Ok(self.jobs.transition_job(&transition).await?)
	}

	async fn load_job(&self, job_id: Uuid) -> Result<IngestionJob> {
		self.jobs
			.get_job(job_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Job {job_id}.") })
	}
}

fn require_staged(job: &IngestionJob, action: &str) -> Result<()> {
	let status: JobStatus = parse_stored(&job.status)?;

	if status != JobStatus::Staged {
		return Err(Error::InvalidState {
			message: format!(
				"Job {} must be staged to {action}; current status is {status}.",
				job.job_id
			),
		});
	}

	Ok(())
}

fn staged_values(item: &StagedItem) -> CommitValues {
	CommitValues {
		ingredient: item.ingredient_id.into(),
		quantity: item.quantity,
		unit: item.unit.clone(),
	}
}

/// Checks every override before anything is written and indexes them by staged item.
fn index_overrides<'a>(
	job_id: Uuid,
	staged: &[StagedItem],
	overrides: &'a [OverrideItem],
) -> Result<HashMap<Uuid, &'a ItemOverride>> {
	let known = staged.iter().map(|item| item.staged_item_id).collect::<HashSet<_>>();
	let mut indexed = HashMap::with_capacity(overrides.len());

	for (idx, item_override) in overrides.iter().enumerate() {
		let staged_item_id = item_override.staged_item_id;

		item_override.values.validate().map_err(|err| {
			Error::invalid_request(format!("overrides[{idx}].{err}"))
		})?;

		if !known.contains(&staged_item_id) {
			return Err(Error::invalid_request(format!(
				"Override references staged item {staged_item_id}, which is not part of job {job_id}."
			)));
		}
		if indexed.insert(staged_item_id, &item_override.values).is_some() {
			return Err(Error::invalid_request(format!(
				"Staged item {staged_item_id} is overridden more than once."
			)));
		}
	}

	Ok(indexed)
}

fn parse_stored<T>(raw: &str) -> Result<T>
where
	T: std::str::FromStr<Err = pantry_domain::UnknownValue>,
{
	raw.parse::<T>().map_err(|err| Error::Storage { message: err.to_string() })
}
