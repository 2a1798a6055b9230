//! The book record shared by the local store and remote search results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored in place of a missing author list.
pub const UNKNOWN_AUTHOR: &str = "Unknown";
/// Stored in place of a missing description.
pub const NO_DESCRIPTION: &str = "No description available";

/// A book, either persisted (`id` is set) or only known from a remote search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Assigned by the store on insert. `None` for remote results that were never saved.
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Image URL, or empty when there is no image.
    pub thumbnail: String,
}

impl Book {
    /// An unsaved book. Empty author/description fall back to the sentinels.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let author = author.into();
        let description = description.into();
        Self {
            id: None,
            title: title.into(),
            author: if author.trim().is_empty() {
                UNKNOWN_AUTHOR.to_string()
            } else {
                author
            },
            description: if description.trim().is_empty() {
                NO_DESCRIPTION.to_string()
            } else {
                description
            },
            thumbnail: String::new(),
        }
    }

    /// A book entered by hand. Title and author must both be filled in.
    pub fn from_form(
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, BookError> {
        let title = title.into();
        let author = author.into();
        if title.trim().is_empty() {
            return Err(BookError::MissingTitle);
        }
        if author.trim().is_empty() {
            return Err(BookError::MissingAuthor);
        }
        Ok(Self::new(title, author, description))
    }

    /// Reject edits that blank out the title or author.
    pub fn check(&self) -> Result<(), BookError> {
        if self.title.trim().is_empty() {
            return Err(BookError::MissingTitle);
        }
        if self.author.trim().is_empty() {
            return Err(BookError::MissingAuthor);
        }
        Ok(())
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_thumbnail(&self) -> bool {
        !self.thumbnail.is_empty()
    }

    /// True when both books carry the same data, ignoring `id`.
    pub fn same_content(&self, other: &Book) -> bool {
        self.title == other.title
            && self.author == other.author
            && self.description == other.description
            && self.thumbnail == other.thumbnail
    }

    /// Human-readable block handed to whatever share mechanism the front end has.
    pub fn share_text(&self) -> String {
        format!(
            "Check out this book!\nTitle: {}\nAuthor: {}\nDescription: {}",
            self.title, self.author, self.description
        )
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.author)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("a book needs a title")]
    MissingTitle,
    #[error("a book needs an author")]
    MissingAuthor,
}
