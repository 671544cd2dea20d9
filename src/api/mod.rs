//! HTTP surface for the browser front end.

pub mod routes;
pub mod scenarios;

pub use routes::{AppState, api_routes, serve};
