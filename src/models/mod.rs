//! API data models
//!
//! This module contains the comparison payloads and the wire formats of the
//! OpenAI and Anthropic APIs.

pub mod anthropic;
pub mod compare;
pub mod openai;
