use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::IngredientRef;

/// Operator-supplied replacement values for one staged item.
///
/// Every field is independent: an absent field keeps the staged value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemOverride {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ingredient_id: Option<Uuid>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unit: Option<String>,
}
impl ItemOverride {
	pub fn validate(&self) -> Result<(), InvalidField> {
		if let Some(quantity) = self.quantity {
			validate_staged_quantity(quantity)?;
		}
		if let Some(unit) = self.unit.as_deref() {
			validate_unit(unit)?;
		}

		Ok(())
	}
}

/// The values a staged item would be committed with.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitValues {
	pub ingredient: IngredientRef,
	pub quantity: f64,
	pub unit: String,
}
impl CommitValues {
	pub fn apply(mut self, item_override: Option<&ItemOverride>) -> Self {
		let Some(item_override) = item_override else {
			return self;
		};

		if let Some(ingredient_id) = item_override.ingredient_id {
			self.ingredient = IngredientRef::Resolved(ingredient_id);
		}
		if let Some(quantity) = item_override.quantity {
			self.quantity = quantity;
		}
		if let Some(unit) = item_override.unit.as_deref() {
			self.unit = unit.trim().to_string();
		}

		self
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidField {
	pub field: &'static str,
	pub message: &'static str,
}
impl fmt::Display for InvalidField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.field, self.message)
	}
}
impl std::error::Error for InvalidField {}

/// Staged quantities may be zero (an item the operator has run out of).
pub fn validate_staged_quantity(quantity: f64) -> Result<(), InvalidField> {
	if !quantity.is_finite() || quantity < 0.0 {
		return Err(InvalidField {
			field: "quantity",
			message: "must be a finite number zero or greater.",
		});
	}

	Ok(())
}

/// Direct pantry writes must add something.
pub fn validate_stock_quantity(quantity: f64) -> Result<(), InvalidField> {
	if !quantity.is_finite() || quantity <= 0.0 {
		return Err(InvalidField { field: "quantity", message: "must be positive." });
	}

	Ok(())
}

pub fn validate_unit(unit: &str) -> Result<(), InvalidField> {
	if unit.trim().is_empty() {
		return Err(InvalidField { field: "unit", message: "is required." });
	}

	Ok(())
}
