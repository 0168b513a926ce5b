//! Constants for provider identifiers, message roles and backend defaults
//!
//! This module defines string constants used throughout the application for
//! provider ids, chat roles, API endpoints and default models.

/// Provider identifier constants
pub mod provider {
    /// OpenAI-compatible chat completions backend
    pub const OPENAI: &str = "openai";

    /// Anthropic-compatible messages backend
    pub const ANTHROPIC: &str = "anthropic";

    /// Providers compared when a request does not name any
    pub const DEFAULT_SELECTION: [&str; 2] = [OPENAI, ANTHROPIC];
}

/// Message role constants
pub mod role {
    /// User role identifier
    pub const USER: &str = "user";

    /// System role identifier
    pub const SYSTEM: &str = "system";
}

/// Content type constants
pub mod content {
    /// Text content type
    pub const TEXT: &str = "text";
}

/// OpenAI backend defaults
pub mod openai {
    /// Public API base URL
    pub const BASE_URL: &str = "https://api.openai.com/v1";

    /// Model used when the caller does not override it
    pub const DEFAULT_MODEL: &str = "gpt-4";
}

/// Anthropic backend defaults
pub mod anthropic {
    /// Public API base URL
    pub const BASE_URL: &str = "https://api.anthropic.com";

    /// Model used when the caller does not override it
    pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

    /// Value sent in the `anthropic-version` header
    pub const API_VERSION: &str = "2023-06-01";
}

/// HTTP API constants
pub mod api {
    /// Version reported in the `X-API-Version` header
    pub const VERSION: &str = "1.0.0";

    /// Service name reported by the root endpoint
    pub const SERVICE_NAME: &str = "Prompt Playground";
}
