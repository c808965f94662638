use uuid::Uuid;

/// Weak reference from a staged item to a canonical ingredient.
///
/// Staged items carry `Unresolved` when the dictionary could not map the extracted name. Only
/// `Resolved` references can ever be committed to the pantry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IngredientRef {
	Resolved(Uuid),
	#[default]
	Unresolved,
}
impl IngredientRef {
	pub fn ingredient_id(self) -> Option<Uuid> {
		match self {
			Self::Resolved(id) => Some(id),
			Self::Unresolved => None,
		}
	}

	pub fn is_resolved(self) -> bool {
		matches!(self, Self::Resolved(_))
	}
}
impl From<Option<Uuid>> for IngredientRef {
	fn from(value: Option<Uuid>) -> Self {
		value.map_or(Self::Unresolved, Self::Resolved)
	}
}
