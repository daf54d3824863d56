use crate::acl::AclError;
use crate::api::ApiError;
use crate::messages;
use crate::telegram::TransportError;
use serde::{Deserialize, Serialize};

pub mod admin;
pub mod engine;
pub mod library;
pub mod render;

pub use admin::AdminWorkflow;
pub use engine::AddWorkflow;
pub use library::LibraryOps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Series,
    Movie,
}

impl MediaKind {
    pub fn noun(self) -> &'static str {
        match self {
            MediaKind::Series => "series",
            MediaKind::Movie => "movies",
        }
    }

    pub fn lookup_path(self) -> &'static str {
        match self {
            MediaKind::Series => "series/lookup",
            MediaKind::Movie => "movie/lookup",
        }
    }

    /// Path listing items already tracked by the backend; used both for the
    /// library listing and the duplicate guard.
    pub fn list_path(self) -> &'static str {
        match self {
            MediaKind::Series => "series",
            MediaKind::Movie => "movie",
        }
    }

    pub fn add_path(self) -> &'static str {
        self.list_path()
    }

    /// Key of the external catalog id in the backend's json (TVDB / TMDB).
    pub fn catalog_id_key(self) -> &'static str {
        match self {
            MediaKind::Series => "tvdbId",
            MediaKind::Movie => "tmdbId",
        }
    }
}

/// Which step the next free-text reply should be interpreted as. Stored in
/// the session under the reserved state slot; absence means no workflow is in
/// progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Add(MediaKind, AddStep),
    Admin(AdminStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStep {
    /// Reply selects one lookup candidate by its display label.
    Confirm,
    /// Reply answers the Yes/No "is this correct" prompt.
    Verify,
    /// Reply answers the Yes/No "use default settings" prompt (movies only).
    Defaults,
    /// Reply selects a quality profile by name.
    Profile,
    /// Reply selects a monitoring policy.
    Monitor,
    /// Reply selects a series type.
    Kind,
    /// Reply selects a root folder by path.
    Folder,
    /// Reply answers the season-folder Yes/No prompt and triggers submission.
    SeasonFolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStep {
    /// Reply selects an allowed user to revoke.
    Revoke,
    /// Reply answers the revoke Yes/No confirmation.
    RevokeConfirm,
    /// Reply selects a revoked user to restore.
    Unrevoke,
    /// Reply answers the unrevoke Yes/No confirmation.
    UnrevokeConfirm,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: i64,
    pub monitored: bool,
}

/// One selectable lookup result. Lives only for the duration of a single
/// workflow; the display id is its 1-based index within the result set.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub id: usize,
    pub title: String,
    pub plot: String,
    pub year: Option<i64>,
    pub catalog_id: i64,
    pub title_slug: String,
    pub poster_url: Option<String>,
    pub seasons: Vec<Season>,
    /// Keyboard label: title plus year when known. Selection replies must
    /// match this exactly.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChoice {
    pub name: String,
    pub profile_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderChoice {
    pub path: String,
    pub folder_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("expected session slot is missing or expired")]
    Corrupted,
    #[error("reply `{0}` does not match any cached option")]
    NoMatch(String),
    #[error("nothing found for `{0}`")]
    NothingFound(String),
    #[error("item `{0}` is already tracked")]
    AlreadyTracked(String),
    #[error("aborted by user")]
    Aborted,
    #[error("backend returned no quality profiles")]
    NoProfiles,
    #[error("backend returned no root folders")]
    NoFolders,
    #[error("unrecognized monitoring policy `{0}`")]
    UnknownPolicy(String),
    #[error("backend rejected add of `{0}`")]
    AddRejected(String),
    #[error("calendar is empty for the requested window")]
    NothingInCalendar,
    #[error("the {0} list is empty")]
    NoUsersInList(&'static str),
    #[error("{0}")]
    Backend(#[from] ApiError),
    #[error(transparent)]
    Acl(#[from] AclError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WorkflowError {
    /// The text delivered to the user through the normal reply path, with
    /// any keyboard stripped.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Corrupted | WorkflowError::UnknownPolicy(_) => messages::went_wrong(),
            // Unmatched replies keep the session alive, so the text invites
            // another pick instead of announcing a cancellation.
            WorkflowError::NoMatch(_) => messages::no_match(),
            WorkflowError::NothingFound(query) => messages::unable_to_locate(query),
            WorkflowError::AlreadyTracked(title) => messages::already_tracked(title),
            WorkflowError::Aborted => messages::aborted(),
            WorkflowError::NoProfiles => messages::couldnt_get_profiles(),
            WorkflowError::NoFolders => messages::couldnt_get_folders(),
            WorkflowError::AddRejected(title) => messages::couldnt_add(title),
            WorkflowError::NothingInCalendar => messages::nothing_in_calendar(),
            WorkflowError::NoUsersInList(list) => messages::no_users_in_list(list),
            WorkflowError::Backend(err) => err.to_string(),
            WorkflowError::Acl(err) => err.to_string(),
            WorkflowError::Transport(err) => err.to_string(),
        }
    }

    /// Whether the whole session must be aborted. A stale or evicted slot
    /// invalidates the entire in-flight workflow; an unmatched reply leaves
    /// state untouched so the user can pick again.
    pub fn clears_session(&self) -> bool {
        matches!(
            self,
            WorkflowError::Corrupted | WorkflowError::Aborted | WorkflowError::UnknownPolicy(_)
        )
    }
}
