use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct PantryItem {
	pub item_id: Uuid,
	pub ingredient_id: Uuid,
	pub quantity: f64,
	pub unit: String,
	pub expires_at: Option<OffsetDateTime>,
	pub added_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct IngestionJob {
	pub job_id: Uuid,
	pub kind: String,
	pub raw_input: String,
	pub status: String,
	pub error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct StagedItem {
	pub staged_item_id: Uuid,
	pub job_id: Uuid,
	pub ingredient_id: Option<Uuid>,
	pub raw_text: String,
	pub quantity: f64,
	pub unit: String,
	pub confidence: f64,
	pub needs_review: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Full-replace write keyed by `ingredient_id`.
///
/// `item_id` is only used when no row exists for the ingredient yet; an existing row keeps its id.
#[derive(Clone, Debug, PartialEq)]
pub struct PantryUpsert {
	pub item_id: Uuid,
	pub ingredient_id: Uuid,
	pub quantity: f64,
	pub unit: String,
	pub expires_at: Option<OffsetDateTime>,
	pub now: OffsetDateTime,
}

/// Conditional status change: applied only while the job still has status `from`.
#[derive(Clone, Debug, PartialEq)]
pub struct JobTransition {
	pub job_id: Uuid,
	pub from: &'static str,
	pub to: &'static str,
	pub error: Option<String>,
	pub at: OffsetDateTime,
}
