pub mod completeness;
pub mod profile_service;
