pub mod ingredient;
pub mod job;
pub mod review;
pub mod staging;

pub use ingredient::IngredientRef;
pub use job::{JobKind, JobStatus, UnknownValue};
