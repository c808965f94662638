use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;
const SYSTEM_PROMPT: &str = "\
You are a grocery list parser. Extract ingredients with quantities from the user's text.

Return a JSON object with an \"items\" array. Each item must have:
- \"raw_text\": the original text snippet for this item
- \"name\": the canonical ingredient name, lowercase and singular (\"chicken breast\", not \"2 lbs chicken breasts\")
- \"quantity\": numeric quantity as a float (1.0 if unclear)
- \"unit\": unit of measure (for example \"lb\", \"g\", \"cup\", \"oz\", \"bunch\", \"head\", \"clove\", \"piece\", \"carton\")
- \"confidence\": your confidence from 0.0 to 1.0

Set confidence below 0.7 for ambiguous or unclear items.
Use \"piece\" when the unit is unclear.";

/// One candidate pantry change found in free-form text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
	pub raw_text: String,
	pub name: String,
	#[serde(default = "default_quantity")]
	pub quantity: f64,
	#[serde(default)]
	pub unit: String,
	#[serde(default)]
	pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
	items: Vec<ExtractedItem>,
}

pub async fn extract(
	cfg: &pantry_config::LlmProviderConfig,
	text: &str,
) -> Result<Vec<ExtractedItem>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = request_body(cfg, text);
	let mut last_err = None;

	for _ in 0..MAX_ATTEMPTS {
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = crate::ensure_success(res, &[200]).await?.json().await?;

		match parse_extraction_response(json) {
			Ok(items) => return Ok(items),
			Err(err) => last_err = Some(err),
		}
	}

	Err(last_err.unwrap_or_else(|| Error::InvalidResponse {
		message: "Extractor response is not valid JSON.".to_string(),
	}))
}

fn request_body(cfg: &pantry_config::LlmProviderConfig, text: &str) -> Value {
	let mut body = serde_json::json!({
		"model": cfg.model,
		"messages": [
			{ "role": "system", "content": SYSTEM_PROMPT },
			{ "role": "user", "content": text },
		],
		"response_format": { "type": "json_object" },
	});

	if let Some(temperature) = cfg.temperature {
		body["temperature"] = serde_json::json!(temperature);
	}

	body
}

fn parse_extraction_response(json: Value) -> Result<Vec<ExtractedItem>> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let payload: ExtractionPayload = serde_json::from_str(content).map_err(|err| {
			Error::InvalidResponse { message: format!("Extractor content is not valid JSON: {err}.") }
		})?;

		return Ok(payload.items);
	}
	if json.get("items").is_some() {
		let payload: ExtractionPayload = serde_json::from_value(json)?;

		return Ok(payload.items);
	}

	Err(Error::InvalidResponse { message: "Extractor response is missing JSON content.".to_string() })
}

fn default_quantity() -> f64 {
	1.0
}
