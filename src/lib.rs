pub mod domain;

pub mod audit;
pub mod auth;
pub mod configuration;
pub mod email_client;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod mock_feed;
pub mod pagination;
pub mod routes;
pub mod security;
pub mod seed;
pub mod startup;
pub mod tasks;
pub mod telemetry;
pub mod validators;
