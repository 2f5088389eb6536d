//! Data access layer for a college faculty directory.
//!
//! Typed services over a PostgREST-style relational store, a sample scraper
//! that fills the directory, and an axum router exposing both.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod scrape;
pub mod services;
pub mod state;
pub mod store;
