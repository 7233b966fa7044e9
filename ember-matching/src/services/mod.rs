pub mod match_service;
pub mod streak_service;
