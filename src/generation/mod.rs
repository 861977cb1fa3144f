//! Article generation client
//!
//! The queue worker talks to the content generation service through the
//! [`ArticleGenerator`] trait so tests can swap in a scripted generator. The
//! production implementation is [`HttpArticleGenerator`].

use crate::db::ItemRow;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

mod http;

pub use http::HttpArticleGenerator;

/// Maximum number of title characters carried into the meta description
const META_DESCRIPTION_TITLE_CHARS: usize = 150;

/// Parameters for generating one article
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Article topic
    pub topic: String,
    /// Comma-separated keywords
    pub keywords: String,
    /// Writing tone
    pub tone: String,
    /// Target length in words
    pub word_count: i64,
    /// Persona override (empty = none)
    pub custom_persona: String,
    /// Number of reference links
    pub link_count: i64,
    /// Place links inline
    pub use_inline_links: bool,
    /// APA citation style
    pub use_apa_style: bool,
}

impl From<&ItemRow> for GenerationRequest {
    fn from(item: &ItemRow) -> Self {
        Self {
            topic: item.topic.clone(),
            keywords: item.keywords.clone(),
            tone: item.tone.clone(),
            word_count: item.word_count,
            custom_persona: item.custom_persona.clone(),
            link_count: item.link_count,
            use_inline_links: item.use_inline_links,
            use_apa_style: item.use_apa_style,
        }
    }
}

/// A generated article ready to be stored on its item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    /// Title taken from the leading `#` heading (empty if none)
    pub title: String,
    /// Markdown body without the title line
    pub content: String,
    /// Short description derived from the title
    pub meta_description: String,
    /// Whitespace-separated words in the body
    pub word_count: i64,
}

/// Abstraction over the content generation service, enabling testability.
#[async_trait::async_trait]
pub trait ArticleGenerator: Send + Sync {
    /// Generate one article
    ///
    /// Failures are reported as [`Error::Generation`] (or a transport error);
    /// the worker records the message on the item and moves on.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle>;
}

/// Split raw markdown output into title, body, meta description and word count
///
/// A first line starting with `#` is the title; everything after it is the
/// body. Empty output is an error.
pub fn parse_generated_content(raw: &str) -> Result<GeneratedArticle> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Generation("No content generated".to_string()));
    }

    let (title, content) = match trimmed.split_once('\n') {
        Some((first, rest)) if first.starts_with('#') => {
            (first.replace('#', "").trim().to_string(), rest.trim().to_string())
        }
        None if trimmed.starts_with('#') => (trimmed.replace('#', "").trim().to_string(), String::new()),
        _ => (String::new(), trimmed.to_string()),
    };

    let meta_description = if title.is_empty() {
        String::new()
    } else {
        let prefix: String = title.chars().take(META_DESCRIPTION_TITLE_CHARS).collect();
        format!("{}...", prefix)
    };

    let word_count = content.split_whitespace().count() as i64;

    Ok(GeneratedArticle {
        title,
        content,
        meta_description,
        word_count,
    })
}

/// Message to record on an item whose generation failed
pub(crate) fn failure_message(error: &Error) -> String {
    match error {
        Error::Generation(message) => message.clone(),
        other => other.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_taken_from_leading_heading() {
        let article =
            parse_generated_content("# Rust Ownership\n\nOwnership keeps memory safe.\n").unwrap();
        assert_eq!(article.title, "Rust Ownership");
        assert_eq!(article.content, "Ownership keeps memory safe.");
        assert_eq!(article.meta_description, "Rust Ownership...");
        assert_eq!(article.word_count, 4);
    }

    #[test]
    fn heading_markers_are_stripped() {
        let article = parse_generated_content("## Deep Dive\nbody").unwrap();
        assert_eq!(article.title, "Deep Dive");
        assert_eq!(article.content, "body");
    }

    #[test]
    fn no_heading_means_no_title() {
        let article = parse_generated_content("Just a body of text").unwrap();
        assert_eq!(article.title, "");
        assert_eq!(article.meta_description, "");
        assert_eq!(article.content, "Just a body of text");
        assert_eq!(article.word_count, 5);
    }

    #[test]
    fn heading_only_output_has_empty_body() {
        let article = parse_generated_content("# Lonely Title").unwrap();
        assert_eq!(article.title, "Lonely Title");
        assert_eq!(article.content, "");
        assert_eq!(article.word_count, 0);
    }

    #[test]
    fn meta_description_truncates_long_titles() {
        let title = "é".repeat(200);
        let article = parse_generated_content(&format!("# {}\nbody", title)).unwrap();
        assert_eq!(article.meta_description.chars().count(), 153);
        assert!(article.meta_description.ends_with("..."));
    }

    #[test]
    fn empty_output_is_an_error() {
        let err = parse_generated_content("  \n\t ").unwrap_err();
        assert!(matches!(err, Error::Generation(ref m) if m == "No content generated"));
    }

    #[test]
    fn failure_message_unwraps_generation_errors() {
        assert_eq!(
            failure_message(&Error::Generation("quota exceeded".into())),
            "quota exceeded"
        );
        assert_eq!(failure_message(&Error::Other("boom".into())), "boom");
    }
}
