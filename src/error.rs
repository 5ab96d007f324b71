use thiserror::Error;

#[derive(Debug, Error)]
pub enum WoteroError {
    #[error(transparent)]
    Prefs(#[from] crate::prefs::PrefsError),

    #[error(transparent)]
    Sync(#[from] crate::sync::SyncError),

    #[error(transparent)]
    Item(#[from] crate::sync::ItemSyncError),

    #[error(transparent)]
    Remote(#[from] crate::wolai::RemoteError),

    #[error(transparent)]
    Library(#[from] crate::library::LibraryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type WoteroResult<T> = Result<T, WoteroError>;
