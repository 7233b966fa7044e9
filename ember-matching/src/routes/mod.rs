pub mod discover;
pub mod health;
pub mod matches;
pub mod streak;
pub mod swipes;
