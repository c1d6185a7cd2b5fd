use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record that can be looked up by its id.
pub trait Identified {
  fn id(&self) -> Uuid;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: Uuid,
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn new(name: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      created_at: now,
      updated_at: now,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id: Uuid,
  pub title: String,
  pub content: String,
  #[serde(rename = "author")]
  pub author_id: Uuid,
  pub allow_comments: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Post {
  /// Creates a post that accepts comments.
  pub fn new(author_id: Uuid, title: impl Into<String>, content: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      title: title.into(),
      content: content.into(),
      author_id,
      allow_comments: true,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn disable_comments(&mut self) {
    self.allow_comments = false;
  }

  pub fn enable_comments(&mut self) {
    self.allow_comments = true;
  }
}

/// A comment on a post, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub id: Uuid,
  #[serde(rename = "post")]
  pub post_id: Uuid,
  #[serde(rename = "parent")]
  pub parent_id: Option<Uuid>,
  pub content: String,
  #[serde(rename = "author")]
  pub author_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Comment {
  pub fn new(post_id: Uuid, author_id: Uuid, content: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      post_id,
      parent_id: None,
      content: content.into(),
      author_id,
      created_at: now,
      updated_at: now,
    }
  }

  /// Makes this comment a reply to `parent`.
  pub fn in_reply_to(mut self, parent: Uuid) -> Self {
    self.parent_id = Some(parent);
    self
  }
}

impl Identified for User {
  fn id(&self) -> Uuid {
    self.id
  }
}

impl Identified for Post {
  fn id(&self) -> Uuid {
    self.id
  }
}

impl Identified for Comment {
  fn id(&self) -> Uuid {
    self.id
  }
}
