pub mod db;
pub mod rabbitmq;
pub mod redis;
pub mod storage;
pub mod user_service;
