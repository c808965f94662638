use std::{future::Future, pin::Pin};

use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{IngestionJob, JobTransition, PantryItem, PantryUpsert, StagedItem},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Committed pantry contents. At most one row exists per ingredient.
pub trait InventoryStore
where
	Self: Send + Sync,
{
	fn upsert_pantry_item<'a>(&'a self, upsert: &'a PantryUpsert) -> BoxFuture<'a, Result<PantryItem>>;

	/// Fails with [`crate::Error::NotFound`] when no row has `item_id`.
	fn delete_pantry_item(&self, item_id: Uuid) -> BoxFuture<'_, Result<()>>;

	fn delete_all_pantry_items(&self) -> BoxFuture<'_, Result<u64>>;

	fn list_pantry_items(&self) -> BoxFuture<'_, Result<Vec<PantryItem>>>;
}

/// Ingestion jobs and the staged items they own.
pub trait JobStore
where
	Self: Send + Sync,
{
	fn insert_job<'a>(&'a self, job: &'a IngestionJob) -> BoxFuture<'a, Result<()>>;

	fn get_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<Option<IngestionJob>>>;

	fn transition_job<'a>(
		&'a self,
		transition: &'a JobTransition,
	) -> BoxFuture<'a, Result<Option<IngestionJob>>>;

	fn insert_staged_item<'a>(&'a self, item: &'a StagedItem) -> BoxFuture<'a, Result<()>>;

	/// Items are ordered by raw text, not by insertion.
	fn list_staged_items(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<StagedItem>>>;

	fn update_staged_item<'a>(&'a self, item: &'a StagedItem) -> BoxFuture<'a, Result<StagedItem>>;
}

impl InventoryStore for Db {
	fn upsert_pantry_item<'a>(&'a self, upsert: &'a PantryUpsert) -> BoxFuture<'a, Result<PantryItem>> {
		Box::pin(queries::upsert_pantry_item(&self.pool, upsert))
	}

	fn delete_pantry_item(&self, item_id: Uuid) -> BoxFuture<'_, Result<()>> {
		Box::pin(queries::delete_pantry_item(&self.pool, item_id))
	}

	fn delete_all_pantry_items(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(queries::delete_all_pantry_items(&self.pool))
	}

	fn list_pantry_items(&self) -> BoxFuture<'_, Result<Vec<PantryItem>>> {
		Box::pin(queries::list_pantry_items(&self.pool))
	}
}

impl JobStore for Db {
	fn insert_job<'a>(&'a self, job: &'a IngestionJob) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::insert_job(&self.pool, job))
	}

	fn get_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<Option<IngestionJob>>> {
		Box::pin(queries::get_job(&self.pool, job_id))
	}

	fn transition_job<'a>(
		&'a self,
		transition: &'a JobTransition,
	) -> BoxFuture<'a, Result<Option<IngestionJob>>> {
		Box::pin(queries::transition_job(&self.pool, transition))
	}

	fn insert_staged_item<'a>(&'a self, item: &'a StagedItem) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::insert_staged_item(&self.pool, item))
	}

	fn list_staged_items(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<StagedItem>>> {
		Box::pin(queries::list_staged_items(&self.pool, job_id))
	}

	fn update_staged_item<'a>(&'a self, item: &'a StagedItem) -> BoxFuture<'a, Result<StagedItem>> {
		Box::pin(queries::update_staged_item(&self.pool, item))
	}
}
