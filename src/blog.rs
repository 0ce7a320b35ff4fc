//! Blog posts, comments and the derived values the reader and editor views show.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::identity::{AuthorRef, UserId};
use crate::richtext::html_converter::html_to_plain_text;

pub const EXCERPT_LENGTH: usize = 100;
pub const WORDS_PER_MINUTE: usize = 200;
pub const DRAFT_STATUS_LENGTH: usize = 20;
pub const DEFAULT_CATEGORY: &str = "General";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";
/// Stories per page in listings
pub const PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: String,
    pub text: String,
    pub user: AuthorRef,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Stored as HTML
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Missing or `null` for stories whose author account is gone
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub likes: Vec<UserId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// State captured before an optimistic like toggle, used to roll it back
/// when the remote call fails.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeSnapshot {
    likes: Vec<UserId>,
    pub liked: bool,
}

impl Blog {
    pub fn plain_text(&self) -> String {
        strip_html(&self.content)
    }

    pub fn excerpt(&self) -> String {
        excerpt(&self.plain_text())
    }

    pub fn read_time_label(&self) -> String {
        read_time_label(&self.plain_text())
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn is_liked_by(&self, user: Option<&UserId>) -> bool {
        user.is_some_and(|user| self.likes.contains(user))
    }

    pub fn category_label(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(AuthorRef::name)
            .unwrap_or(ANONYMOUS_AUTHOR)
    }

    pub fn cover_image_index(&self, image_count: usize) -> usize {
        cover_image_index(&self.id, image_count)
    }

    /// Flip `user`'s like before the server confirms it.
    /// Returns what is needed to undo the flip.
    pub fn toggle_like(&mut self, user: Option<&UserId>) -> Result<LikeSnapshot> {
        let user = user
            .filter(|user| !user.is_empty())
            .ok_or(Error::NotSignedIn("like this story"))?;

        let snapshot = LikeSnapshot {
            likes: self.likes.clone(),
            liked: self.likes.contains(user),
        };

        if snapshot.liked {
            self.likes.retain(|id| id != user);
        } else {
            self.likes.push(user.clone());
        }
        Ok(snapshot)
    }

    pub fn rollback_like(&mut self, snapshot: LikeSnapshot) {
        self.likes = snapshot.likes;
    }
}

/// A story being written, before it is published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    /// HTML
    pub content: String,
}

impl BlogDraft {
    /// Title and content must both carry visible text
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || strip_html(&self.content).trim().is_empty() {
            return Err(Error::Validation(
                "Please enter a Title and content.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn status(&self) -> String {
        draft_status(&self.title)
    }

    pub fn set_tags(&mut self, input: &str) {
        self.tags = parse_tags(input);
    }
}

pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    html_to_plain_text(html)
}

/// The first characters of `text` with whitespace collapsed, always followed by `...`
pub fn excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut excerpt: String = collapsed.graphemes(true).take(EXCERPT_LENGTH).collect();
    excerpt.push_str("...");
    excerpt
}

/// Whitespace-separated tokens, punctuation-only ones included
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes needed to read `text`, never less than one (empty text included)
pub fn read_time_minutes(text: &str) -> usize {
    word_count(text).div_ceil(WORDS_PER_MINUTE).max(1)
}

pub fn read_time_label(text: &str) -> String {
    format!("{} min read", read_time_minutes(text))
}

/// `Jan 5`
pub fn format_short_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d").to_string()
}

/// `January 5, 2025`
pub fn format_long_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Stable pick of one of `image_count` cover images for a story id
pub fn cover_image_index(id: &str, image_count: usize) -> usize {
    if image_count == 0 || id.is_empty() {
        return 0;
    }
    let sum: u64 = id.chars().map(|c| c as u64).sum();
    (sum % image_count as u64) as usize
}

/// Split a comma separated tag list, dropping blanks
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Heading shown while a story is being written
pub fn draft_status(title: &str) -> String {
    if title.is_empty() {
        return "New Story".to_string();
    }
    let start: String = title.chars().take(DRAFT_STATUS_LENGTH).collect();
    format!("Drafting: {}...", start)
}

pub fn validate_comment(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("Comment cannot be empty".to_string()));
    }
    Ok(text)
}

/// Stories whose title contains `search`, ignoring case
pub fn filter_by_title<'a>(blogs: &'a [Blog], search: &str) -> Vec<&'a Blog> {
    let search = search.to_lowercase();
    blogs
        .iter()
        .filter(|blog| blog.title.to_lowercase().contains(&search))
        .collect()
}

/// Listings grow by [`PAGE_SIZE`] stories per page loaded
pub fn paginate<T>(items: &[T], pages_loaded: usize) -> &[T] {
    let end = pages_loaded.saturating_mul(PAGE_SIZE).min(items.len());
    &items[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn blog(id: &str, title: &str) -> Blog {
        Blog {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            content: "<p>Hello <strong>brave</strong> new world</p>".to_string(),
            category: None,
            tags: Vec::new(),
            author: Some(AuthorRef::Id(UserId::from("author"))),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_excerpt_and_read_time() {
        let story = blog("b1", "Story");
        assert_eq!(story.excerpt(), "Hello brave new world...");
        assert_eq!(story.read_time_label(), "1 min read");
        assert_eq!(read_time_label(""), "1 min read");
        assert_eq!(read_time_minutes("  \n "), 1);

        let long = "word ".repeat(401);
        assert_eq!(read_time_minutes(&long), 3);
        assert_eq!(excerpt(&long).chars().count(), EXCERPT_LENGTH + 3);
    }

    #[test]
    fn test_word_count_splits_on_whitespace() {
        assert_eq!(word_count("Trams - tiles \u{2014} pastéis"), 5);
        assert_eq!(word_count("  one\ttwo\n"), 2);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_dates() {
        let date = Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        assert_eq!(format_short_date(&date), "Jan 5");
        assert_eq!(format_long_date(&date), "January 5, 2025");
    }

    #[test]
    fn test_cover_image_index() {
        // 'a' = 97, 'b' = 98
        assert_eq!(cover_image_index("ab", 4), 195 % 4);
        assert_eq!(cover_image_index("", 4), 0);
        assert_eq!(cover_image_index("ab", 0), 0);
    }

    #[test]
    fn test_labels_fall_back() {
        let mut story = blog("b1", "Story");
        assert_eq!(story.category_label(), "General");
        assert_eq!(story.author_name(), "Anonymous");

        story.category = Some("Travel".to_string());
        story.author = Some(AuthorRef::Profile {
            id: UserId::from("author"),
            name: Some("Ada".to_string()),
        });
        assert_eq!(story.category_label(), "Travel");
        assert_eq!(story.author_name(), "Ada");
    }

    #[test]
    fn test_like_toggle_and_rollback() {
        let mut story = blog("b1", "Story");
        let reader = UserId::from("reader");

        assert!(story.toggle_like(None).is_err());

        let snapshot = story.toggle_like(Some(&reader)).unwrap();
        assert!(!snapshot.liked);
        assert!(story.is_liked_by(Some(&reader)));
        assert_eq!(story.like_count(), 1);

        story.rollback_like(snapshot);
        assert_eq!(story.like_count(), 0);

        story.toggle_like(Some(&reader)).unwrap();
        let snapshot = story.toggle_like(Some(&reader)).unwrap();
        assert!(snapshot.liked);
        assert!(!story.is_liked_by(Some(&reader)));
    }

    #[test]
    fn test_tags_and_draft_status() {
        assert_eq!(parse_tags(" rust, ,web ,"), vec!["rust", "web"]);
        assert_eq!(draft_status(""), "New Story");
        assert_eq!(
            draft_status("A rather long title for a story"),
            "Drafting: A rather long title ..."
        );
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = BlogDraft {
            title: "Title".to_string(),
            content: "<p> </p>".to_string(),
            ..Default::default()
        };
        assert!(draft.validate().is_err());

        draft.content = "<p>Body</p>".to_string();
        assert!(draft.validate().is_ok());

        draft.title = "  ".to_string();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_filter_and_paginate() {
        let blogs: Vec<Blog> = (0..8)
            .map(|i| blog(&format!("b{i}"), &format!("Rust Notes {i}")))
            .collect();
        assert_eq!(filter_by_title(&blogs, "rust notes 7").len(), 1);
        assert_eq!(filter_by_title(&blogs, "").len(), 8);
        assert_eq!(paginate(&blogs, 1).len(), 6);
        assert_eq!(paginate(&blogs, 2).len(), 8);
        assert!(paginate(&blogs, 0).is_empty());
    }

    #[test]
    fn test_comment_validation() {
        assert!(validate_comment("   ").is_err());
        assert_eq!(validate_comment(" nice ").unwrap(), "nice");
    }
}
