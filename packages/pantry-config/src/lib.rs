mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Ingest, LlmProviderConfig, Postgres, Providers, ResolverProviderConfig, Service,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind", "must be non-empty."));
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::validation("storage.postgres.dsn", "must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation(
			"storage.postgres.pool_max_conns",
			"must be greater than zero.",
		));
	}

	validate_extractor(&cfg.providers.extractor)?;
	validate_resolver(&cfg.providers.resolver)?;
	validate_ingest(&cfg.ingest)?;

	Ok(())
}

fn validate_extractor(extractor: &LlmProviderConfig) -> Result<()> {
	for (field, value) in [
		("providers.extractor.api_base", &extractor.api_base),
		("providers.extractor.api_key", &extractor.api_key),
		("providers.extractor.model", &extractor.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::validation(field, "must be non-empty."));
		}
	}

	if extractor.timeout_ms == 0 {
		return Err(Error::validation(
			"providers.extractor.timeout_ms",
			"must be greater than zero.",
		));
	}
	if let Some(temperature) = extractor.temperature
		&& (!temperature.is_finite() || !(0.0..=2.0).contains(&temperature))
	{
		return Err(Error::validation(
			"providers.extractor.temperature",
			"must be a finite number in the range 0.0-2.0.",
		));
	}

	Ok(())
}

fn validate_resolver(resolver: &ResolverProviderConfig) -> Result<()> {
	if resolver.api_base.trim().is_empty() {
		return Err(Error::validation("providers.resolver.api_base", "must be non-empty."));
	}
	if !resolver.path.starts_with('/') {
		return Err(Error::validation("providers.resolver.path", "must start with '/'."));
	}
	if resolver.timeout_ms == 0 {
		return Err(Error::validation(
			"providers.resolver.timeout_ms",
			"must be greater than zero.",
		));
	}

	Ok(())
}

fn validate_ingest(ingest: &Ingest) -> Result<()> {
	if !ingest.review_threshold.is_finite() || !(0.0..=1.0).contains(&ingest.review_threshold) {
		return Err(Error::validation(
			"ingest.review_threshold",
			"must be a finite number in the range 0.0-1.0.",
		));
	}

	for (field, value) in [
		("ingest.process_timeout_ms", ingest.process_timeout_ms),
		("ingest.extract_timeout_ms", ingest.extract_timeout_ms),
		("ingest.resolve_timeout_ms", ingest.resolve_timeout_ms),
	] {
		if value == 0 {
			return Err(Error::validation(field, "must be greater than zero."));
		}
	}

	if ingest.extract_timeout_ms > ingest.process_timeout_ms {
		return Err(Error::validation(
			"ingest.extract_timeout_ms",
			"must not exceed ingest.process_timeout_ms.",
		));
	}
	if ingest.resolve_timeout_ms > ingest.process_timeout_ms {
		return Err(Error::validation(
			"ingest.resolve_timeout_ms",
			"must not exceed ingest.process_timeout_ms.",
		));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in
		[&mut cfg.providers.extractor.api_base, &mut cfg.providers.resolver.api_base]
	{
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
