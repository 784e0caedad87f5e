//! Social feed.
//!
//! Posts are only ever added at the head (newest first). After creation a
//! post changes in exactly two ways: its like counter goes up by one, or a
//! comment is appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};

pub type PostId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: String,
    pub icon: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    #[serde(default)]
    pub comments: Vec<String>,
}

/// Who a post is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub display_name: String,
    pub icon: String,
}

impl Author {
    pub fn new(display_name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            icon: icon.into(),
        }
    }

    pub fn post(&self, text: impl Into<String>, created_at: DateTime<Utc>) -> NewPost {
        NewPost {
            author: self.display_name.clone(),
            icon: self.icon.clone(),
            text: text.into(),
            created_at,
        }
    }
}

/// Content of a post before the feed assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author: String,
    pub icon: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Write side of the feed, as seen by the completion fan-out.
pub trait FeedSink {
    fn prepend(&mut self, post: NewPost) -> PostId;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    /// Newest first
    posts: Vec<Post>,
    next_id: PostId,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// User-authored post.
    pub fn publish(&mut self, post: NewPost) -> Result<PostId> {
        if post.text.trim().is_empty() {
            return Err(ValidationError::Empty { field: "post text" }.into());
        }
        Ok(self.prepend(post))
    }

    pub fn like(&mut self, id: PostId) -> Result<u64> {
        let post = self.get_mut(id)?;
        post.likes += 1;
        Ok(post.likes)
    }

    pub fn comment(&mut self, id: PostId, text: &str) -> Result<usize> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty { field: "comment" }.into());
        }
        let post = self.get_mut(id)?;
        post.comments.push(text.to_string());
        Ok(post.comments.len())
    }

    fn get_mut(&mut self, id: PostId) -> Result<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found("Post", id))
    }
}

impl FeedSink for Feed {
    fn prepend(&mut self, post: NewPost) -> PostId {
        self.next_id += 1;
        let id = self.next_id;
        self.posts.insert(
            0,
            Post {
                id,
                author: post.author,
                icon: post.icon,
                text: post.text,
                created_at: post.created_at,
                likes: 0,
                comments: Vec::new(),
            },
        );
        id
    }
}
