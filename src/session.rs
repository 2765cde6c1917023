use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ServiceError, ServiceResult};

const SESSION_FILE: &str = "session.json";

/// Signed-in user's token as persisted between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub email: String,
}

/// Resolve the directory holding the session and settings files.
///
/// An explicit directory (CLI flag or `WHATIAMTODO_CONFIG_DIR`) wins over the
/// platform config dir.
pub fn config_dir(explicit: Option<&Path>) -> ServiceResult<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    dirs::config_dir()
        .map(|d| d.join(crate::metadata::PKG_NAME))
        .ok_or_else(|| ServiceError::Config("couldn't find a config dir".to_string()))
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nobody is signed in.
    pub fn load(&self) -> ServiceResult<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let session: Session = serde_json::from_str(&contents)?;
        if session.access_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Persist using a temporary file and an atomic rename to avoid partial writes.
    pub fn save(&self, session: &Session) -> ServiceResult<()> {
        write_json_atomically(&self.path, session)
    }

    pub fn clear(&self) -> ServiceResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> ServiceResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = path.with_extension("tmp");
    let mut f = create_private(&temp)?;
    let content = serde_json::to_string_pretty(value)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()?;
    fs::rename(temp, path)?;
    Ok(())
}

// The session file holds a bearer token: owner read/write only.
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    File::create(path)
}
