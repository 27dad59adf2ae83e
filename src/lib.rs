//! Contract Analyzer
//!
//! This library provides the HTTP front end that accepts a contract and a
//! set of analysis criteria, hands them to an external workflow engine for
//! document extraction and LLM analysis, and relays the engine's progress
//! notifications back to the browser as a live server-sent event stream.

pub mod app_state;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
