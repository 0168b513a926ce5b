//! Prompt template library
//!
//! Templates use `{{variable}}` placeholders. Rendering substitutes each
//! declared variable, leaving `[variable]` when no value is supplied.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),
}

/// A reusable prompt with placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub template: &'static str,
    pub variables: &'static [&'static str],
    pub system_prompt: &'static str,
    pub category: &'static str,
    pub example_values: &'static [(&'static str, &'static str)],
}

impl PromptTemplate {
    /// Substitute `values` into the template
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut prompt = self.template.to_string();
        for var in self.variables {
            let placeholder = format!("{{{{{}}}}}", var);
            let value = values
                .get(*var)
                .cloned()
                .unwrap_or_else(|| format!("[{}]", var));
            prompt = prompt.replace(&placeholder, &value);
        }
        prompt
    }

    /// Example values as an owned map
    pub fn examples(&self) -> HashMap<String, String> {
        self.example_values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

static TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        id: "code_generation",
        name: "Code Generation",
        description: "Generate code in any programming language",
        template: "Write a {{language}} function that {{task}}. Include docstrings and type hints.",
        variables: &["language", "task"],
        system_prompt: "You are an expert programmer who writes clean, efficient, well-documented code.",
        category: "coding",
        example_values: &[("language", "Python"), ("task", "calculates fibonacci numbers")],
    },
    PromptTemplate {
        id: "data_extraction",
        name: "Data Extraction",
        description: "Extract structured data from unstructured text",
        template: "Extract {{fields}} from the following text in JSON format:\n\n{{text}}",
        variables: &["fields", "text"],
        system_prompt: "You are a data extraction specialist. Always respond with valid JSON.",
        category: "extraction",
        example_values: &[
            ("fields", "name, email, phone number"),
            ("text", "Contact John Doe at john@example.com or call 555-1234"),
        ],
    },
    PromptTemplate {
        id: "creative_writing",
        name: "Creative Writing",
        description: "Generate creative content in various styles",
        template: "Write a {{length}} {{style}} about {{topic}}.",
        variables: &["length", "style", "topic"],
        system_prompt: "You are a creative writer with mastery of various literary styles.",
        category: "creative",
        example_values: &[
            ("length", "short story"),
            ("style", "sci-fi thriller"),
            ("topic", "time travel paradox"),
        ],
    },
    PromptTemplate {
        id: "summarization",
        name: "Text Summarization",
        description: "Summarize text in specified format",
        template: "Summarize the following text in {{format}}, focusing on {{focus}}:\n\n{{text}}",
        variables: &["format", "focus", "text"],
        system_prompt: "You are an expert at distilling complex information into clear summaries.",
        category: "analysis",
        example_values: &[
            ("format", "3 bullet points"),
            ("focus", "key takeaways"),
            ("text", "[Insert article or document here]"),
        ],
    },
    PromptTemplate {
        id: "translation",
        name: "Translation",
        description: "Translate text between languages",
        template: "Translate the following {{from_lang}} text to {{to_lang}}:\n\n{{text}}",
        variables: &["from_lang", "to_lang", "text"],
        system_prompt: "You are a professional translator who maintains tone and context.",
        category: "language",
        example_values: &[
            ("from_lang", "English"),
            ("to_lang", "Spanish"),
            ("text", "Hello, how are you today?"),
        ],
    },
    PromptTemplate {
        id: "qa_answering",
        name: "Question Answering",
        description: "Answer questions with specified detail level",
        template: "Answer the following question with {{detail_level}} detail:\n\n{{question}}",
        variables: &["detail_level", "question"],
        system_prompt: "You are a knowledgeable assistant who provides accurate, well-structured answers.",
        category: "qa",
        example_values: &[
            ("detail_level", "comprehensive"),
            ("question", "How does photosynthesis work?"),
        ],
    },
    PromptTemplate {
        id: "code_review",
        name: "Code Review",
        description: "Review code for quality and issues",
        template: "Review this {{language}} code for {{focus}}:\n\n```{{language}}\n{{code}}\n```",
        variables: &["language", "focus", "code"],
        system_prompt: "You are a senior code reviewer focused on best practices and code quality.",
        category: "coding",
        example_values: &[
            ("language", "python"),
            ("focus", "bugs, performance, and readability"),
            ("code", "def fib(n):\n    if n <= 1: return n\n    return fib(n-1) + fib(n-2)"),
        ],
    },
    PromptTemplate {
        id: "brainstorming",
        name: "Brainstorming",
        description: "Generate creative ideas",
        template: "Generate {{count}} creative ideas for {{topic}}. Focus on {{criteria}}.",
        variables: &["count", "topic", "criteria"],
        system_prompt: "You are a creative brainstorming partner who thinks outside the box.",
        category: "creative",
        example_values: &[
            ("count", "5"),
            ("topic", "a mobile app for pet owners"),
            ("criteria", "unique features and monetization"),
        ],
    },
    PromptTemplate {
        id: "email_generation",
        name: "Email Generation",
        description: "Write professional emails",
        template: "Write a {{tone}} email to {{recipient}} about {{subject}}.",
        variables: &["tone", "recipient", "subject"],
        system_prompt: "You are a professional communication specialist.",
        category: "writing",
        example_values: &[
            ("tone", "formal and friendly"),
            ("recipient", "a potential client"),
            ("subject", "proposal for web development project"),
        ],
    },
    PromptTemplate {
        id: "explain_concept",
        name: "Concept Explanation",
        description: "Explain complex concepts simply",
        template: "Explain {{concept}} to a {{audience}} using {{approach}}.",
        variables: &["concept", "audience", "approach"],
        system_prompt: "You are an expert educator who excels at making complex topics accessible.",
        category: "education",
        example_values: &[
            ("concept", "quantum entanglement"),
            ("audience", "high school student"),
            ("approach", "everyday analogies"),
        ],
    },
];

/// All templates in catalogue order
pub fn all() -> &'static [PromptTemplate] {
    TEMPLATES
}

pub fn get(id: &str) -> Result<&'static PromptTemplate, TemplateError> {
    TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))
}

pub fn by_category(category: &str) -> Vec<&'static PromptTemplate> {
    TEMPLATES.iter().filter(|t| t.category == category).collect()
}

/// Unique categories, sorted
pub fn categories() -> Vec<&'static str> {
    TEMPLATES
        .iter()
        .map(|t| t.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variable_has_a_placeholder_and_example() {
        for template in all() {
            for var in template.variables {
                assert!(template.template.contains(&format!("{{{{{}}}}}", var)), "{}", template.id);
                assert!(template.examples().contains_key(*var), "{}", template.id);
            }
        }
    }

    #[test]
    fn test_render_substitutes_values() {
        let template = get("code_generation").unwrap();
        let mut values = HashMap::new();
        values.insert("language".to_string(), "Python".to_string());
        values.insert("task".to_string(), "calculates fibonacci numbers".to_string());

        let rendered = template.render(&values);
        assert_eq!(
            rendered,
            "Write a Python function that calculates fibonacci numbers. Include docstrings and type hints."
        );
    }

    #[test]
    fn test_render_marks_missing_values() {
        let template = get("creative_writing").unwrap();
        let mut values = HashMap::new();
        values.insert("topic".to_string(), "rust".to_string());
        assert_eq!(template.render(&values), "Write a [length] [style] about rust.");
    }

    #[test]
    fn test_render_replaces_repeated_placeholders() {
        let rendered = get("code_review").unwrap().render(&get("code_review").unwrap().examples());
        assert!(!rendered.contains("{{"));
        assert!(rendered.contains("```python\n"));
    }

    #[test]
    fn test_unknown_template() {
        assert_eq!(
            get("nonexistent").unwrap_err(),
            TemplateError::NotFound("nonexistent".to_string())
        );
    }

    #[test]
    fn test_categories() {
        let categories = categories();
        assert!(categories.contains(&"coding"));
        assert!(categories.contains(&"creative"));
        assert_eq!(by_category("coding").len(), 2);
        assert!(by_category("cooking").is_empty());
    }
}
