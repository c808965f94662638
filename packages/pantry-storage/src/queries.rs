use sqlx::PgPool;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{IngestionJob, JobTransition, PantryItem, PantryUpsert, StagedItem},
};

const PANTRY_ITEM_COLUMNS: &str =
	"item_id, ingredient_id, quantity, unit, expires_at, added_at, updated_at";
const JOB_COLUMNS: &str = "job_id, kind, raw_input, status, error, created_at, updated_at";
const STAGED_ITEM_COLUMNS: &str =
	"staged_item_id, job_id, ingredient_id, raw_text, quantity, unit, confidence, needs_review, created_at, updated_at";

pub async fn upsert_pantry_item(pool: &PgPool, upsert: &PantryUpsert) -> Result<PantryItem> {
	let sql = format!(
		"\
INSERT INTO pantry_items (
	item_id,
	ingredient_id,
	quantity,
	unit,
	expires_at,
	added_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $6)
ON CONFLICT (ingredient_id) DO UPDATE
SET
	quantity = EXCLUDED.quantity,
	unit = EXCLUDED.unit,
	expires_at = EXCLUDED.expires_at,
	updated_at = EXCLUDED.updated_at
RETURNING {PANTRY_ITEM_COLUMNS}"
	);
	let item = sqlx::query_as::<_, PantryItem>(&sql)
		.bind(upsert.item_id)
		.bind(upsert.ingredient_id)
		.bind(upsert.quantity)
		.bind(upsert.unit.as_str())
		.bind(upsert.expires_at)
		.bind(upsert.now)
		.fetch_one(pool)
		.await?;

	Ok(item)
}

pub async fn delete_pantry_item(pool: &PgPool, item_id: Uuid) -> Result<()> {
	let result = sqlx::query("DELETE FROM pantry_items WHERE item_id = $1")
		.bind(item_id)
		.execute(pool)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Pantry item {item_id}.")));
	}

	Ok(())
}

pub async fn delete_all_pantry_items(pool: &PgPool) -> Result<u64> {
	let result = sqlx::query("DELETE FROM pantry_items").execute(pool).await?;

	Ok(result.rows_affected())
}

pub async fn list_pantry_items(pool: &PgPool) -> Result<Vec<PantryItem>> {
	let sql = format!("SELECT {PANTRY_ITEM_COLUMNS} FROM pantry_items ORDER BY added_at, item_id");
	let items = sqlx::query_as::<_, PantryItem>(&sql).fetch_all(pool).await?;

	Ok(items)
}

pub async fn insert_job(pool: &PgPool, job: &IngestionJob) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO ingestion_jobs (job_id, kind, raw_input, status, error, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(job.job_id)
	.bind(job.kind.as_str())
	.bind(job.raw_input.as_str())
	.bind(job.status.as_str())
	.bind(job.error.as_deref())
	.bind(job.created_at)
	.bind(job.updated_at)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<IngestionJob>> {
	let sql = format!("SELECT {JOB_COLUMNS} FROM ingestion_jobs WHERE job_id = $1");
	let job = sqlx::query_as::<_, IngestionJob>(&sql).bind(job_id).fetch_optional(pool).await?;

	Ok(job)
}

/// Returns `None` when the job does not exist or no longer has the expected status.
pub async fn transition_job(
	pool: &PgPool,
	transition: &JobTransition,
) -> Result<Option<IngestionJob>> {
	let sql = format!(
		"\
UPDATE ingestion_jobs
SET status = $3, error = $4, updated_at = $5
WHERE job_id = $1 AND status = $2
RETURNING {JOB_COLUMNS}"
	);
	let job = sqlx::query_as::<_, IngestionJob>(&sql)
		.bind(transition.job_id)
		.bind(transition.from)
		.bind(transition.to)
		.bind(transition.error.as_deref())
		.bind(transition.at)
		.fetch_optional(pool)
		.await?;

	Ok(job)
}

pub async fn insert_staged_item(pool: &PgPool, item: &StagedItem) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO staged_items (
	staged_item_id,
	job_id,
	ingredient_id,
	raw_text,
	quantity,
	unit,
	confidence,
	needs_review,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
	)
	.bind(item.staged_item_id)
	.bind(item.job_id)
	.bind(item.ingredient_id)
	.bind(item.raw_text.as_str())
	.bind(item.quantity)
	.bind(item.unit.as_str())
	.bind(item.confidence)
	.bind(item.needs_review)
	.bind(item.created_at)
	.bind(item.updated_at)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn list_staged_items(pool: &PgPool, job_id: Uuid) -> Result<Vec<StagedItem>> {
	let sql = format!(
		"SELECT {STAGED_ITEM_COLUMNS} FROM staged_items WHERE job_id = $1 ORDER BY raw_text, staged_item_id"
	);
	let items = sqlx::query_as::<_, StagedItem>(&sql).bind(job_id).fetch_all(pool).await?;

	Ok(items)
}

/// Persists the editable fields of a staged item: ingredient, quantity, unit and review flag.
pub async fn update_staged_item(pool: &PgPool, item: &StagedItem) -> Result<StagedItem> {
	let sql = format!(
		"\
UPDATE staged_items
SET ingredient_id = $3, quantity = $4, unit = $5, needs_review = $6, updated_at = $7
WHERE staged_item_id = $1 AND job_id = $2
RETURNING {STAGED_ITEM_COLUMNS}"
	);

	sqlx::query_as::<_, StagedItem>(&sql)
		.bind(item.staged_item_id)
		.bind(item.job_id)
		.bind(item.ingredient_id)
		.bind(item.quantity)
		.bind(item.unit.as_str())
		.bind(item.needs_review)
		.bind(item.updated_at)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Staged item {}.", item.staged_item_id)))
}
