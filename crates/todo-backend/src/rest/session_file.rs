//! Session file I/O.
//!
//! Reads and writes the persisted session (`~/.todo/session.json` by default)
//! with owner-only permissions (0o600).

use std::path::Path;

use serde::{Deserialize, Serialize};
use todo_auth::Session;
use todo_core::BackendError;

/// Current file format version.
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    version: u32,
    saved_at: String,
    session: Session,
}

/// Load the persisted session.
///
/// Returns `None` if the file doesn't exist, is unreadable, or has an
/// unsupported version.
pub fn load_session(path: &Path) -> Option<Session> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read session file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<StoredSession>(&data) {
        Ok(stored) if stored.version == VERSION => Some(stored.session),
        Ok(stored) => {
            tracing::warn!("unsupported session file version: {}", stored.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse session file: {e}");
            None
        }
    }
}

/// Persist `session`, creating parent directories as needed.
pub fn save_session(path: &Path, session: &Session) -> Result<(), BackendError> {
    let io_err = |e: std::io::Error| BackendError::new(format!("failed to write session file: {e}"));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let stored = StoredSession {
        version: VERSION,
        saved_at: chrono::Utc::now().to_rfc3339(),
        session: session.clone(),
    };
    let json = serde_json::to_string_pretty(&stored)
        .map_err(|e| BackendError::new(format!("failed to encode session: {e}")))?;
    std::fs::write(path, json).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Remove the persisted session. A missing file is fine.
pub fn clear_session(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove session file: {e}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
