use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientSummary {
	pub id: Uuid,
	pub name: String,
}

/// Dictionary answer for one raw ingredient name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIngredient {
	pub ingredient: IngredientSummary,
	#[serde(default)]
	pub confidence: f64,
	/// True when the dictionary registered a new canonical ingredient for this name.
	#[serde(default)]
	pub created: bool,
}

pub async fn resolve(
	cfg: &pantry_config::ResolverProviderConfig,
	name: &str,
) -> Result<ResolvedIngredient> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.post(url)
		.headers(crate::default_headers(&cfg.default_headers)?)
		.json(&serde_json::json!({ "name": name }))
		.send()
		.await?;
	// 201 means the dictionary created the ingredient while resolving it.
	let res = crate::ensure_success(res, &[200, 201]).await?;
	let bytes = res.bytes().await?;

	Ok(serde_json::from_slice(&bytes)?)
}
