//! Plain-text extraction from rich-text bodies

use super::Paragraph;

/// Concatenate paragraph texts, separated by a single space
pub fn as_text(body: &[Paragraph]) -> String {
    body.iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(texts: &[&str]) -> Vec<Paragraph> {
        texts
            .iter()
            .map(|t| Paragraph {
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_as_text() {
        assert_eq!(as_text(&paragraphs(&["Hello", "world"])), "Hello world");
        assert_eq!(as_text(&[]), "");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   \n\t "), 0);
        assert_eq!(word_count("one  two\nthree\tfour"), 4);
    }
}
