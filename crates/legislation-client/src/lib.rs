//! Korean Legislation Open API Client
//!
//! A Rust client for the Ministry of Government Legislation open API
//! (`open.law.go.kr`). Every category (laws, precedents, committee decisions,
//! ministry interpretations, ...) is served by one of two endpoints,
//! `lawSearch.do` for listings and `lawService.do` for details, selected by a
//! `target` parameter.

pub mod clean;
mod client;
mod config;
mod error;
mod types;

pub use client::LegislationClient;
pub use config::ApiConfig;
pub use error::{ClientError, Result};
pub use types::{Endpoint, Params};
