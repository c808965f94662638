use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub ingest: Ingest,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub extractor: LlmProviderConfig,
	pub resolver: ResolverProviderConfig,
}

/// OpenAI-compatible chat-completions endpoint used for text extraction.
#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	/// Omitted from the request when unset; some models only accept their default.
	pub temperature: Option<f32>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Canonical-ingredient dictionary service.
#[derive(Debug, Deserialize)]
pub struct ResolverProviderConfig {
	pub api_base: String,
	#[serde(default = "default_resolver_path")]
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Ingest {
	/// Candidates with a confidence strictly below this value need review.
	#[serde(default = "default_review_threshold")]
	pub review_threshold: f64,
	/// Budget for the whole background processing phase of one job.
	#[serde(default = "default_process_timeout_ms")]
	pub process_timeout_ms: u64,
	#[serde(default = "default_extract_timeout_ms")]
	pub extract_timeout_ms: u64,
	#[serde(default = "default_resolve_timeout_ms")]
	pub resolve_timeout_ms: u64,
}
impl Default for Ingest {
	fn default() -> Self {
		Self {
			review_threshold: default_review_threshold(),
			process_timeout_ms: default_process_timeout_ms(),
			extract_timeout_ms: default_extract_timeout_ms(),
			resolve_timeout_ms: default_resolve_timeout_ms(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_resolver_path() -> String {
	"/ingredients/resolve".to_string()
}

fn default_review_threshold() -> f64 {
	0.7
}

fn default_process_timeout_ms() -> u64 {
	90_000
}

fn default_extract_timeout_ms() -> u64 {
	60_000
}

fn default_resolve_timeout_ms() -> u64 {
	30_000
}
