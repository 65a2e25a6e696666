//! Encrypted refresh-credential storage.
//!
//! One record per user, holding the user id and the sealed refresh token.
//! Plaintext tokens never leave this module except through [`get`], and a
//! record that fails decryption (wrong key, corruption, tampering) reads as
//! absent: operationally a corrupted credential is the same as "not
//! authorized", so the user is simply sent back through the consent flow.
//!
//! [`get`]: CredentialStore::get

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::SecretCipher;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Serialize, Deserialize)]
struct CredentialRecord {
    user_id: String,
    refresh_token_enc: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    credentials: Vec<CredentialRecord>,
}

/// Encrypted, file-backed refresh-credential store.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    cipher: SecretCipher,
}

impl CredentialStore {
    /// Creates a store over the given record file.
    pub fn new(path: impl Into<PathBuf>, cipher: SecretCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    /// Encrypts and persists a user's refresh token, replacing any existing
    /// record for the same user. Idempotent under repeated identical saves.
    pub fn save(&self, user_id: &str, refresh_token: &str) -> EngineResult<()> {
        let mut data = self.read_all();
        let sealed = self.cipher.seal(refresh_token)?;

        match data
            .credentials
            .iter_mut()
            .find(|record| record.user_id == user_id)
        {
            Some(record) => record.refresh_token_enc = sealed,
            None => data.credentials.push(CredentialRecord {
                user_id: user_id.to_string(),
                refresh_token_enc: sealed,
            }),
        }

        self.write_all(&data)?;
        debug!(user_id, "saved refresh credential");
        Ok(())
    }

    /// Returns the user's decrypted refresh token.
    ///
    /// Absent records and records that fail decryption both return `None`;
    /// decryption failures are logged but never propagate.
    pub fn get(&self, user_id: &str) -> Option<String> {
        let data = self.read_all();
        let record = data
            .credentials
            .iter()
            .find(|record| record.user_id == user_id)?;

        match self.cipher.open(&record.refresh_token_enc) {
            Ok(token) => Some(token),
            Err(err) => {
                warn!(
                    user_id,
                    "stored credential failed to decrypt, treating as absent: {err}"
                );
                None
            }
        }
    }

    /// Returns the record file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> CredentialFile {
        if !self.path.exists() {
            return CredentialFile::default();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to read credential file {:?}: {err}", self.path);
                return CredentialFile::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(err) => {
                warn!(
                    "credential file {:?} is not valid JSON, starting empty: {err}",
                    self.path
                );
                CredentialFile::default()
            }
        }
    }

    fn write_all(&self, data: &CredentialFile) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::configuration(format!("failed to create data directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| EngineError::internal(format!("failed to serialize records: {}", e)))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            EngineError::configuration(format!("failed to write credential file: {}", e))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            EngineError::configuration(format!("failed to rename credential file: {}", e))
        })?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        Ok(())
    }
}
