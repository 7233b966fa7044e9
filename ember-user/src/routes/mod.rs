pub mod health;
pub mod internal;
pub mod photo;
pub mod profile;
