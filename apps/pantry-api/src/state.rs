use std::sync::Arc;

use pantry_service::PantryService;
use pantry_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PantryService>,
}
impl AppState {
	pub async fn new(config: pantry_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(PantryService::new(config, db)))
	}

	pub fn from_service(service: PantryService) -> Self {
		Self { service: Arc::new(service) }
	}
}
