//! Top-level folder allowlists.
//!
//! An object key is admitted when its first `/`-separated segment exactly
//! equals one of the configured folder names. Matching is case-sensitive and
//! never prefix-based: `public` admits `public/a.png` but not `publicity/a.png`.

use serde::{Deserialize, Serialize};

/// An ordered set of folder names admitted by a route.
///
/// # Examples
///
/// ```
/// use keygate_core::FolderAllowlist;
///
/// let allowlist = FolderAllowlist::parse(" public, images ,,");
/// assert_eq!(allowlist.folders(), ["public", "images"]);
/// assert!(allowlist.permits("images/logo.png"));
/// assert!(!allowlist.permits("private/logo.png"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderAllowlist {
    folders: Vec<String>,
}

impl FolderAllowlist {
    /// Parse a comma-separated list. Entries are trimmed; empty entries dropped.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    /// The configured folder names, in configuration order.
    #[must_use]
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Whether no folder is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Whether `key`'s first segment is one of the configured folders.
    #[must_use]
    pub fn permits(&self, key: &str) -> bool {
        let first_segment = top_level_folder(key);
        self.folders.iter().any(|folder| folder == first_segment)
    }
}

impl<S: AsRef<str>> FromIterator<S> for FolderAllowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            folders: iter
                .into_iter()
                .map(|f| f.as_ref().trim().to_owned())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }
}

/// The first `/`-separated segment of an object key.
#[must_use]
pub fn top_level_folder(key: &str) -> &str {
    key.split('/').next().unwrap_or_default()
}
