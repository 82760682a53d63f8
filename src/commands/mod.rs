pub mod ask;
pub mod auth;
pub mod chat;
pub mod config;
pub mod tools;
