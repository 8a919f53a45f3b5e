pub mod admin;
pub mod health;
pub mod models;
pub mod studies;
