//! Splitting markdown documents into heading-delimited sections.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::extractor::truncate_chars;

static H3_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^###[^\n]*\n").unwrap());
static H2_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##[^\n]*\n").unwrap());

const MIN_H3_SECTION_CHARS: usize = 200;
const MIN_H2_SECTION_CHARS: usize = 300;
const MAX_H2_SECTION_CHARS: usize = 5000;

/// One extraction unit of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// Split a markdown document into sections.
///
/// `###` headings delimit sections; a section is kept when its content is
/// longer than 200 characters, and text before the first heading is titled
/// "Introduction". A document without `###` headings is split at `##`
/// headings instead, keeping parts longer than 300 characters (cut to 5000)
/// titled `Section_<i>`.
pub fn split_into_sections(text: &str) -> Vec<Section> {
    if !H3_HEADING.is_match(text) {
        return split_at_h2(text);
    }

    let mut sections = Vec::new();
    let mut title = "Introduction".to_string();
    let mut last_end = 0;

    for heading in H3_HEADING.find_iter(text) {
        push_if_long(&mut sections, &title, &text[last_end..heading.start()]);
        title = heading.as_str().trim_start_matches('#').trim().to_string();
        last_end = heading.end();
    }
    push_if_long(&mut sections, &title, &text[last_end..]);
    sections
}

fn push_if_long(sections: &mut Vec<Section>, title: &str, content: &str) {
    if !content.trim().is_empty() && content.chars().count() > MIN_H3_SECTION_CHARS {
        sections.push(Section {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        });
    }
}

fn split_at_h2(text: &str) -> Vec<Section> {
    // Headings count as parts too, so indices match a split that keeps them
    let mut parts = Vec::new();
    let mut last_end = 0;
    for heading in H2_HEADING.find_iter(text) {
        parts.push(&text[last_end..heading.start()]);
        parts.push(heading.as_str());
        last_end = heading.end();
    }
    parts.push(&text[last_end..]);

    parts
        .into_iter()
        .enumerate()
        .filter(|(_, part)| part.trim().chars().count() > MIN_H2_SECTION_CHARS)
        .map(|(i, part)| Section {
            title: format!("Section_{}", i),
            content: truncate_chars(part.trim(), MAX_H2_SECTION_CHARS).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(n: usize) -> String {
        "x".repeat(n)
    }

    #[test]
    fn test_split_at_h3_headings() {
        let doc = format!(
            "# Case\n{}\n### Zeugin Frau Schmidt\n{}\n### Zeuge Peter Klein\n{}\n",
            filler(250),
            filler(300),
            filler(150)
        );

        let sections = split_into_sections(&doc);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Introduction");
        assert!(sections[0].content.starts_with("# Case"));
        assert_eq!(sections[1].title, "Zeugin Frau Schmidt");
        assert_eq!(sections[1].content, filler(300));
    }

    #[test]
    fn test_without_h3_headings_split_at_h2() {
        let doc = format!("## Part one\n{}\n## Part two\n{}\n", filler(6000), filler(100));

        let sections = split_into_sections(&doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Section_2");
        assert_eq!(sections[0].content.chars().count(), 5000);
    }

    #[test]
    fn test_nothing_long_enough() {
        assert!(split_into_sections("### a\nshort\n## b\nshort").is_empty());
        assert!(split_into_sections("").is_empty());
    }
}
