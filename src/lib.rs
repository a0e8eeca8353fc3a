//! Headline Desk - A cached news headline service
//!
//! This crate fetches category-filtered headlines from a GNews-compatible
//! provider, caches them per category and splits them into display columns.
//! It also keeps a durable dark-mode preference and a ticking clock for the
//! view layer that consumes it.

pub mod article;
pub mod cache;
pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod fetcher;
pub mod partition;
pub mod preferences;
pub mod routes;
