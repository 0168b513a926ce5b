//! Core application modules
//!
//! This module contains configuration, logging, pricing, the provider
//! abstraction and the comparison engine.

pub mod config;
pub mod constants;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod pricing;
pub mod provider;
pub mod providers;
pub mod templates;
pub mod tokenizer;
