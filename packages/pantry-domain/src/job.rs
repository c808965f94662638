use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
	#[default]
	TextBlob,
	/// Reserved for future intake channels. Processed exactly like `TextBlob`.
	ExternalChannel,
}
impl JobKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::TextBlob => "text_blob",
			Self::ExternalChannel => "external_channel",
		}
	}
}
impl fmt::Display for JobKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for JobKind {
	type Err = UnknownValue;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"text_blob" => Ok(Self::TextBlob),
			"external_channel" => Ok(Self::ExternalChannel),
			_ => Err(UnknownValue { field: "kind", value: raw.to_string() }),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	/// Recognized when read back, but never written by the in-process pipeline.
	Processing,
	Staged,
	Confirmed,
	Failed,
}
impl JobStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Staged => "staged",
			Self::Confirmed => "confirmed",
			Self::Failed => "failed",
		}
	}

	/// Allowed edges: `pending -> staged | failed` and `staged -> confirmed`.
	pub fn can_transition_to(self, next: Self) -> bool {
		matches!(
			(self, next),
			(Self::Pending, Self::Staged)
				| (Self::Pending, Self::Failed)
				| (Self::Staged, Self::Confirmed)
		)
	}
}
impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for JobStatus {
	type Err = UnknownValue;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"pending" => Ok(Self::Pending),
			"processing" => Ok(Self::Processing),
			"staged" => Ok(Self::Staged),
			"confirmed" => Ok(Self::Confirmed),
			"failed" => Ok(Self::Failed),
			_ => Err(UnknownValue { field: "status", value: raw.to_string() }),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownValue {
	pub field: &'static str,
	pub value: String,
}
impl fmt::Display for UnknownValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown {} {:?}.", self.field, self.value)
	}
}
impl std::error::Error for UnknownValue {}
