pub mod ingest;
pub mod inventory;

mod error;

pub use error::{Error, Result};
pub use ingest::{
	ConfirmRequest, ConfirmResponse, JobView, OverrideItem, StagedItemView, SubmitRequest,
	SubmitResponse, SubmittedJob,
};
pub use inventory::{AddItemRequest, PantryItemView, PantryListResponse};
pub use pantry_storage::BoxFuture;

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use pantry_config::{Config, LlmProviderConfig, ResolverProviderConfig};
use pantry_providers::{
	extractor::{self, ExtractedItem},
	resolver::{self, ResolvedIngredient},
};
use pantry_storage::{InventoryStore, JobStore, db::Db};

/// Name of the notification emitted after the inventory changes.
pub const PANTRY_UPDATED_EVENT: &str = "pantry.updated";

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, pantry_providers::Result<Vec<ExtractedItem>>>;
}

pub trait ResolverProvider
where
	Self: Send + Sync,
{
	fn resolve<'a>(
		&'a self,
		cfg: &'a ResolverProviderConfig,
		name: &'a str,
	) -> BoxFuture<'a, pantry_providers::Result<ResolvedIngredient>>;
}

/// Receives `pantry.updated` notifications. Failures are logged by the caller and never undo the
/// inventory change.
pub trait UpdatePublisher
where
	Self: Send + Sync,
{
	fn publish_pantry_updated<'a>(&'a self, item_ids: &'a [Uuid]) -> BoxFuture<'a, Result<()>>;
}

/// Emits each notification as a structured tracing event.
pub struct TracingPublisher;
impl UpdatePublisher for TracingPublisher {
	fn publish_pantry_updated<'a>(&'a self, item_ids: &'a [Uuid]) -> BoxFuture<'a, Result<()>> {
		tracing::info!(
			event = PANTRY_UPDATED_EVENT,
			count = item_ids.len(),
			item_ids = ?item_ids,
			"Pantry updated."
		);

		Box::pin(async { Ok(()) })
	}
}

#[derive(Clone)]
pub struct Providers {
	pub extractor: Arc<dyn ExtractorProvider>,
	pub resolver: Arc<dyn ResolverProvider>,
	pub publisher: Arc<dyn UpdatePublisher>,
}
impl Providers {
	pub fn new(
		extractor: Arc<dyn ExtractorProvider>,
		resolver: Arc<dyn ResolverProvider>,
		publisher: Arc<dyn UpdatePublisher>,
	) -> Self {
		Self { extractor, resolver, publisher }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { extractor: provider.clone(), resolver: provider, publisher: Arc::new(TracingPublisher) }
	}
}

pub struct PantryService {
	pub cfg: Config,
	pub jobs: Arc<dyn JobStore>,
	pub inventory: Arc<dyn InventoryStore>,
	pub providers: Providers,
}
impl PantryService {
	pub fn new(cfg: Config, db: Db) -> Self {
		let db = Arc::new(db);

		Self { cfg, jobs: db.clone(), inventory: db, providers: Providers::default() }
	}

	pub fn with_stores(
		cfg: Config,
		jobs: Arc<dyn JobStore>,
		inventory: Arc<dyn InventoryStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, jobs, inventory, providers }
	}

	/// Resolves one ingredient name under the configured per-call budget.
	pub(crate) async fn resolve_name(&self, name: &str) -> Result<ResolvedIngredient> {
		let budget = Duration::from_millis(self.cfg.ingest.resolve_timeout_ms);
		let call = self.providers.resolver.resolve(&self.cfg.providers.resolver, name);

		match tokio::time::timeout(budget, call).await {
			Ok(result) => Ok(result?),
			Err(_) => Err(Error::Provider {
				message: format!(
					"Resolver timed out after {} ms.",
					self.cfg.ingest.resolve_timeout_ms
				),
			}),
		}
	}

	pub(crate) async fn publish_updated(&self, item_ids: &[Uuid]) {
		if let Err(err) = self.providers.publisher.publish_pantry_updated(item_ids).await {
			tracing::warn!(error = %err, count = item_ids.len(), "Failed to publish pantry update.");
		}
	}
}

struct DefaultProviders;
impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, pantry_providers::Result<Vec<ExtractedItem>>> {
		Box::pin(extractor::extract(cfg, text))
	}
}
impl ResolverProvider for DefaultProviders {
	fn resolve<'a>(
		&'a self,
		cfg: &'a ResolverProviderConfig,
		name: &'a str,
	) -> BoxFuture<'a, pantry_providers::Result<ResolvedIngredient>> {
		Box::pin(resolver::resolve(cfg, name))
	}
}
