pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Invalid state: {message}")]
	InvalidState { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<pantry_storage::Error> for Error {
	fn from(err: pantry_storage::Error) -> Self {
		match err {
			pantry_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			pantry_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			pantry_storage::Error::NotFound(message) => Self::NotFound { message },
			pantry_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<pantry_providers::Error> for Error {
	fn from(err: pantry_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<pantry_domain::staging::InvalidField> for Error {
	fn from(err: pantry_domain::staging::InvalidField) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
