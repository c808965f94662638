use crate::IngredientRef;

pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.7;
/// Unit recorded when the extractor could not tell one.
pub const FALLBACK_UNIT: &str = "piece";

/// A candidate needs review when its confidence is strictly below the threshold, or whenever its
/// ingredient could not be resolved.
pub fn needs_review(confidence: f64, threshold: f64, ingredient: IngredientRef) -> bool {
	!ingredient.is_resolved() || confidence < threshold
}

#[derive(Clone, Debug, PartialEq)]
pub struct SanitizedCandidate {
	pub quantity: f64,
	pub unit: String,
	pub confidence: f64,
	/// Set when a value had to be replaced, which always forces review.
	pub repaired: bool,
}

pub fn sanitize_candidate(quantity: f64, unit: &str, confidence: f64) -> SanitizedCandidate {
	let mut repaired = false;
	let quantity = if quantity.is_finite() && quantity >= 0.0 {
		quantity
	} else {
		repaired = true;

		0.0
	};
	let unit = match unit.trim() {
		"" => FALLBACK_UNIT.to_string(),
		trimmed => trimmed.to_string(),
	};
	let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };

	SanitizedCandidate { quantity, unit, confidence, repaired }
}
