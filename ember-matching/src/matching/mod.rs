pub mod algorithm;
pub mod reciprocity;
pub mod streak;
