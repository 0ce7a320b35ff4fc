//! Canonical user identity and ownership checks.
//!
//! API payloads refer to users in several shapes: a bare id string, or an
//! embedded profile carrying the id as `_id` or `id`. Everything is reduced to
//! a [`UserId`] before it is compared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::blog::{Blog, Comment};

/// Opaque user identifier. Surrounding whitespace is not significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.len() == id.len() {
            UserId(id)
        } else {
            UserId(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::new(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::new(id)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signed-in user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        User {
            id: id.into(),
            name: name.into(),
            email: None,
            profile_image: None,
        }
    }
}

/// Reference to the author of a blog or comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    Id(UserId),
    Profile {
        #[serde(alias = "_id")]
        id: UserId,
        #[serde(default)]
        name: Option<String>,
    },
}

impl AuthorRef {
    pub fn id(&self) -> &UserId {
        match self {
            AuthorRef::Id(id) => id,
            AuthorRef::Profile { id, .. } => id,
        }
    }

    /// Display name, when the payload embedded one
    pub fn name(&self) -> Option<&str> {
        match self {
            AuthorRef::Id(_) => None,
            AuthorRef::Profile { name, .. } => name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        }
    }
}

impl From<&User> for AuthorRef {
    fn from(user: &User) -> Self {
        AuthorRef::Profile {
            id: user.id.clone(),
            name: Some(user.name.clone()),
        }
    }
}

/// Whether `user` is the author referenced by `author`.
/// Anonymous users and empty ids own nothing.
pub fn is_owner(author: &AuthorRef, user: Option<&UserId>) -> bool {
    match user {
        Some(user) if !user.is_empty() => author.id() == user,
        _ => false,
    }
}

/// Blogs without an author belong to nobody
fn owns_blog(blog: &Blog, user: Option<&UserId>) -> bool {
    blog.author
        .as_ref()
        .is_some_and(|author| is_owner(author, user))
}

pub fn can_edit_blog(blog: &Blog, user: Option<&UserId>) -> bool {
    owns_blog(blog, user)
}

pub fn can_delete_blog(blog: &Blog, user: Option<&UserId>) -> bool {
    owns_blog(blog, user)
}

/// Only the comment's author may edit it
pub fn can_edit_comment(comment: &Comment, user: Option<&UserId>) -> bool {
    is_owner(&comment.user, user)
}

/// The comment's author and the blog's author may both delete a comment
pub fn can_delete_comment(comment: &Comment, blog: &Blog, user: Option<&UserId>) -> bool {
    is_owner(&comment.user, user) || owns_blog(blog, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_shapes_share_an_id() {
        let bare: AuthorRef = serde_json::from_str(r#""u1""#).unwrap();
        let mongo: AuthorRef = serde_json::from_str(r#"{"_id": "u1", "name": "Ada"}"#).unwrap();
        let plain: AuthorRef = serde_json::from_str(r#"{"id": " u1 "}"#).unwrap();

        let user = UserId::from("u1");
        for author in [&bare, &mongo, &plain] {
            assert_eq!(author.id(), &user);
            assert!(is_owner(author, Some(&user)));
        }
        assert_eq!(mongo.name(), Some("Ada"));
        assert_eq!(bare.name(), None);
    }

    #[test]
    fn test_anonymous_owns_nothing() {
        let author = AuthorRef::Id(UserId::from("u1"));
        assert!(!is_owner(&author, None));

        let empty = AuthorRef::Id(UserId::from(""));
        assert!(!is_owner(&empty, Some(&UserId::from(""))));
    }

    #[test]
    fn test_user_accepts_either_id_key() {
        let a: User = serde_json::from_str(r#"{"_id": "u7", "name": "Grace"}"#).unwrap();
        let b: User = serde_json::from_str(r#"{"id": "u7", "name": "Grace"}"#).unwrap();
        assert_eq!(a, b);
    }
}
