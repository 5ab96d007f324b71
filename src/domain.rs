use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid id: {0:?}")]
    Invalid(String),
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| IdError::Invalid(s.to_string()))
            }
        }
    };
}

numeric_id!(
    /// Identifier of a library record (an item in the reference manager).
    RecordId
);
numeric_id!(
    /// Identifier of a library collection.
    CollectionId
);
numeric_id!(TagId);
numeric_id!(
    /// Identifier of an attachment item. Higher IDs were created later.
    AttachmentId
);

/// The set of record identifiers processed together in one sync pass.
pub type RecordIds = BTreeSet<RecordId>;

/// An identifier as delivered by the host's change notifier.
///
/// Most notifications carry plain numeric IDs. Relation notifications
/// (`collection-item`, `item-tag`) carry compound IDs written as `"a-b"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierId {
    Plain(u64),
    Compound(Vec<u64>),
}

impl NotifierId {
    /// Returns the component at `index` of a compound ID.
    ///
    /// A plain ID only has a component at index `0`.
    pub fn component(&self, index: usize) -> Option<u64> {
        match self {
            NotifierId::Plain(id) if index == 0 => Some(*id),
            NotifierId::Plain(_) => None,
            NotifierId::Compound(parts) => parts.get(index).copied(),
        }
    }
}

impl FromStr for NotifierId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !trimmed.contains('-') {
            return trimmed
                .parse::<u64>()
                .map(NotifierId::Plain)
                .map_err(|_| IdError::Invalid(s.to_string()));
        }

        let parts = trimmed
            .split('-')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| IdError::Invalid(s.to_string()))?;

        Ok(NotifierId::Compound(parts))
    }
}

impl fmt::Display for NotifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierId::Plain(id) => write!(f, "{id}"),
            NotifierId::Compound(parts) => {
                let joined = parts
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join("-");
                f.write_str(&joined)
            }
        }
    }
}

/// Role a creator plays on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorRole {
    /// The item type's primary creator type (author for most types).
    Primary,
    Editor,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub first_name: String,
    pub last_name: String,
    pub role: CreatorRole,
}

impl Creator {
    /// Formats the creator as `"Last, First"`, omitting empty parts.
    pub fn display_name(&self) -> String {
        [self.last_name.as_str(), self.first_name.as_str()]
            .iter()
            .filter(|name| !name.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A child attachment of a library record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub title: String,
    pub url: Option<String>,
    pub note: String,
}

/// Contents to write into a link attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDraft {
    pub title: String,
    pub url: String,
    pub note: String,
}

/// Reference to a record created in the note database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecordRef {
    /// Web URL of the created row, as returned by the service.
    pub web_url: String,
}
