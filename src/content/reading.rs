//! Reading time estimate

use super::ContentSection;

/// Average reading speed used for the estimate
pub const WORDS_PER_MINUTE: usize = 200;

/// Count words the way the estimate expects: every heading and every text
/// block is split on single spaces, so an empty heading still counts as one.
pub fn count_words(content: &[ContentSection]) -> usize {
    content
        .iter()
        .map(|section| {
            let heading = section.heading.split(' ').count();
            let body: usize = section
                .body
                .blocks()
                .iter()
                .filter_map(|block| block.text())
                .map(|text| text.split(' ').count())
                .sum();
            heading + body
        })
        .sum()
}

/// Minutes needed to read the content, rounded up
pub fn reading_time(content: &[ContentSection]) -> usize {
    count_words(content).div_ceil(WORDS_PER_MINUTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RichText;
    use serde_json::json;

    fn section(heading: &str, paragraphs: &[String]) -> ContentSection {
        let blocks: Vec<_> = paragraphs
            .iter()
            .map(|text| json!({"type": "paragraph", "text": text, "spans": []}))
            .collect();
        ContentSection {
            heading: heading.to_string(),
            body: serde_json::from_value::<RichText>(json!(blocks)).unwrap(),
        }
    }

    fn words(n: usize) -> String {
        vec!["palavra"; n].join(" ")
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(reading_time(&[]), 0);
    }

    #[test]
    fn test_short_content() {
        let content = [section("A B", &["C D E".to_string()])];
        assert_eq!(count_words(&content), 5);
        assert_eq!(reading_time(&content), 1);
    }

    #[test]
    fn test_rounds_up_at_boundaries() {
        // 2 heading words + 398 body words
        let exact = [section("A B", &[words(198), words(200)])];
        assert_eq!(count_words(&exact), 400);
        assert_eq!(reading_time(&exact), 2);

        let over = [
            section("A B", &[words(198), words(200)]),
            section("C", &[]),
        ];
        assert_eq!(count_words(&over), 401);
        assert_eq!(reading_time(&over), 3);
    }

    #[test]
    fn test_non_text_blocks_are_ignored() {
        let content = [ContentSection {
            heading: "Imagem".to_string(),
            body: serde_json::from_value(json!([
                {"type": "image", "url": "https://images.prismic.io/x.png"},
                {"type": "paragraph", "text": "legenda da imagem", "spans": []}
            ]))
            .unwrap(),
        }];
        assert_eq!(count_words(&content), 4);
    }
}
