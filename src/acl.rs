use crate::shared::fs_atomic::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum AclError {
    #[error("failed to read access list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in access list {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write access list {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("user `{0}` is not in the access list")]
    UnknownUser(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserRecord {
    /// Username when set, else first and last name joined, else the raw id.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_ref().filter(|v| !v.trim().is_empty()) {
            return username.clone();
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if full.trim().is_empty() {
            self.id.to_string()
        } else {
            full
        }
    }
}

/// Durable allow/revoke list. The file is the source of truth and is
/// rewritten wholesale on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessControl {
    pub allowed_users: Vec<UserRecord>,
    pub revoked_users: Vec<UserRecord>,
}

impl AccessControl {
    /// Missing file starts an empty list; malformed json aborts startup.
    pub fn load(path: &Path) -> Result<Self, AclError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| AclError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| AclError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), AclError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AclError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let body = serde_json::to_vec_pretty(self).map_err(|e| AclError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        atomic_write_file(path, &body).map_err(|e| AclError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_users.iter().any(|u| u.id == user_id)
    }

    pub fn is_revoked(&self, user_id: i64) -> bool {
        self.revoked_users.iter().any(|u| u.id == user_id)
    }

    pub fn authorize(&mut self, user: UserRecord) {
        if !self.is_allowed(user.id) {
            self.allowed_users.push(user);
        }
    }

    /// Moves exactly one allowed user, matched by display name, to the
    /// revoked list.
    pub fn revoke(&mut self, display_name: &str) -> Result<UserRecord, AclError> {
        let index = self
            .allowed_users
            .iter()
            .position(|u| u.display_name() == display_name)
            .ok_or_else(|| AclError::UnknownUser(display_name.to_string()))?;
        let user = self.allowed_users.remove(index);
        self.revoked_users.push(user.clone());
        Ok(user)
    }

    /// Moves exactly one revoked user, matched by display name, back to the
    /// allowed list.
    pub fn unrevoke(&mut self, display_name: &str) -> Result<UserRecord, AclError> {
        let index = self
            .revoked_users
            .iter()
            .position(|u| u.display_name() == display_name)
            .ok_or_else(|| AclError::UnknownUser(display_name.to_string()))?;
        let user = self.revoked_users.remove(index);
        self.allowed_users.push(user.clone());
        Ok(user)
    }
}
