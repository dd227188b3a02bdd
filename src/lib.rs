pub mod auth;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod http;
pub mod store;
pub mod ws;
