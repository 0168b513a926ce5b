//! Token estimation for responses that carry no usage figures
//!
//! GPT models are counted with their tiktoken encoding. Everything else, and
//! any model whose encoding fails to load, falls back to a character
//! heuristic of about four characters per token.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// How tokens are counted for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `o200k_base`, used by the gpt-4o family
    O200kBase,
    /// `cl100k_base`, used by gpt-4 and gpt-3.5
    Cl100kBase,
    /// Character-based estimate
    Heuristic,
}

impl Encoding {
    /// Pick the encoding for a model name
    pub fn for_model(model: &str) -> Self {
        let model = model.trim().to_lowercase();
        if model.starts_with("gpt-4o") {
            Encoding::O200kBase
        } else if model.starts_with("gpt-") {
            Encoding::Cl100kBase
        } else {
            Encoding::Heuristic
        }
    }

    fn bpe(self) -> Option<&'static CoreBPE> {
        static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();
        static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

        match self {
            Encoding::O200kBase => O200K
                .get_or_init(|| load("o200k_base", tiktoken_rs::o200k_base))
                .as_ref(),
            Encoding::Cl100kBase => CL100K
                .get_or_init(|| load("cl100k_base", tiktoken_rs::cl100k_base))
                .as_ref(),
            Encoding::Heuristic => None,
        }
    }
}

fn load(name: &str, build: fn() -> anyhow::Result<CoreBPE>) -> Option<CoreBPE> {
    match build() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            warn!("Failed to load {} encoding, estimating by length: {}", name, e);
            None
        }
    }
}

fn heuristic(text: &str) -> u32 {
    let estimate = (text.chars().count() / 4).max(1);
    u32::try_from(estimate).unwrap_or(u32::MAX)
}

/// Estimated token count of `text` for `model`
///
/// Non-empty text always counts as at least one token.
pub fn estimate_tokens(text: &str, model: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }

    match Encoding::for_model(model).bpe() {
        Some(bpe) => {
            let count = bpe.encode_with_special_tokens(text).len();
            u32::try_from(count).unwrap_or(u32::MAX)
        }
        None => heuristic(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_for_model() {
        assert_eq!(Encoding::for_model("gpt-4o-mini"), Encoding::O200kBase);
        assert_eq!(Encoding::for_model("gpt-4"), Encoding::Cl100kBase);
        assert_eq!(Encoding::for_model("GPT-3.5-turbo"), Encoding::Cl100kBase);
        assert_eq!(Encoding::for_model("claude-3-haiku"), Encoding::Heuristic);
        assert_eq!(Encoding::for_model("local-llama"), Encoding::Heuristic);
    }

    #[test]
    fn test_short_gpt_reply_is_counted() {
        assert!(estimate_tokens("Hi", "gpt-4") >= 1);
        assert!(estimate_tokens("Ok.", "gpt-3.5-turbo") >= 1);
        assert!(estimate_tokens("Hi", "gpt-4o") >= 1);
    }

    #[test]
    fn test_gpt_uses_tokenizer() {
        assert_eq!(estimate_tokens("Hello world", "gpt-4"), 2);
    }

    #[test]
    fn test_heuristic_for_other_models() {
        assert_eq!(estimate_tokens("0123456789abcdef", "claude-3-haiku"), 4);
        assert_eq!(estimate_tokens("Ok.", "claude-3-haiku"), 1);
        assert_eq!(estimate_tokens("你好世界你好世界", "claude-3-haiku"), 2);
    }

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(estimate_tokens("", "gpt-4"), 0);
        assert_eq!(estimate_tokens("", "claude-3-haiku"), 0);
    }
}
