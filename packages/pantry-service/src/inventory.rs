use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{Error, PantryService, Result};
use pantry_domain::staging;
use pantry_storage::models::{PantryItem, PantryUpsert};

/// Direct pantry write. `ingredient_id` wins over `name` when both are present.
#[derive(Clone, Debug, Deserialize)]
pub struct AddItemRequest {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub ingredient_id: Option<String>,
	pub quantity: f64,
	pub unit: String,
	/// RFC 3339 timestamp.
	#[serde(default)]
	pub expires_at: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PantryItemView {
	pub item_id: Uuid,
	pub ingredient_id: Uuid,
	pub quantity: f64,
	pub unit: String,
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub added_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<PantryItem> for PantryItemView {
	fn from(item: PantryItem) -> Self {
		Self {
			item_id: item.item_id,
			ingredient_id: item.ingredient_id,
			quantity: item.quantity,
			unit: item.unit,
			expires_at: item.expires_at,
			added_at: item.added_at,
			updated_at: item.updated_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct PantryListResponse {
	pub items: Vec<PantryItemView>,
}

impl PantryService {
	pub async fn list_items(&self) -> Result<PantryListResponse> {
		let items = self.inventory.list_pantry_items().await?;

		Ok(PantryListResponse { items: items.into_iter().map(PantryItemView::from).collect() })
	}

	pub async fn add_item(&self, req: AddItemRequest) -> Result<PantryItemView> {
		staging::validate_stock_quantity(req.quantity)?;
		staging::validate_unit(&req.unit)?;

		let expires_at = req.expires_at.as_deref().map(parse_expires_at).transpose()?;
		let id = req.ingredient_id.as_deref().filter(|raw| !raw.trim().is_empty());
		let ingredient_id = match (id, req.name.as_deref()) {
			(Some(raw), _) => Uuid::parse_str(raw.trim())
				.map_err(|_| Error::invalid_request("ingredient_id must be a UUID."))?,
			(None, Some(name)) if !name.trim().is_empty() =>
				self.resolve_name(name.trim()).await?.ingredient.id,
			_ => return Err(Error::invalid_request("ingredient_id or name is required.")),
		};
		let item = self.upsert_item(ingredient_id, req.quantity, req.unit, expires_at).await?;

		tracing::info!(item_id = %item.item_id, %ingredient_id, "Pantry item written.");

		self.publish_updated(&[item.item_id]).await;

		Ok(item.into())
	}

	pub async fn delete_item(&self, item_id: Uuid) -> Result<()> {
		self.inventory.delete_pantry_item(item_id).await?;

		tracing::info!(%item_id, "Pantry item deleted.");

		self.publish_updated(&[item_id]).await;

		Ok(())
	}

	/// Clears the whole pantry and returns the number of rows removed.
	pub async fn reset(&self) -> Result<u64> {
		let removed = self.inventory.delete_all_pantry_items().await?;

		tracing::warn!(removed, "Pantry reset.");

		self.publish_updated(&[]).await;

		Ok(removed)
	}

	/// The single inventory write path: full replace keyed by ingredient.
	pub(crate) async fn upsert_item(
		&self,
		ingredient_id: Uuid,
		quantity: f64,
		unit: String,
		expires_at: Option<OffsetDateTime>,
	) -> Result<PantryItem> {
		let upsert = PantryUpsert {
			item_id: Uuid::new_v4(),
			ingredient_id,
			quantity,
			unit: unit.trim().to_string(),
			expires_at,
			now: OffsetDateTime::now_utc(),
		};

		Ok(self.inventory.upsert_pantry_item(&upsert).await?)
	}
}

fn parse_expires_at(raw: &str) -> Result<OffsetDateTime> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339)
		.map_err(|_| Error::invalid_request("expires_at must be an RFC 3339 timestamp."))
}
