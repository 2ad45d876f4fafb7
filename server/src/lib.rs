pub mod auth;
pub mod challenge;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod profile;
pub mod ratelimit;
pub mod registration;
pub mod routes;
pub mod server;
pub mod state;
