//! Registry persistence: read/write the supervisor's YAML registry file
//! under an OS advisory lock, with atomic (write-temp, rename) commits.
//!
//! Locking uses `fs2::FileExt::try_lock_exclusive` on a sibling `.lock`
//! file, the common pattern for daemon pid/lock files; the store itself
//! follows a connection/pool-wrapper shape, owning the path and mediating
//! every read/write against it rather than exposing the file directly.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::domain::errors::RegistryError;
use crate::domain::models::Registry;

/// Default ceiling on how long `write` waits to acquire the lock before
/// giving up, so a crashed holder cannot wedge the supervisor forever.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the registry file path and mediates every read/write against it.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl RegistryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock_timeout: DEFAULT_LOCK_TIMEOUT }
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Read the registry. A missing file is not an error — it means no
    /// project has ever been registered — and yields an empty registry.
    pub fn read(&self) -> Result<Registry, RegistryError> {
        if !self.path.exists() {
            return Ok(Registry::empty());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| RegistryError::Io(e.to_string()))?;
        serde_yaml::from_str(&contents).map_err(|e| RegistryError::Malformed(e.to_string()))
    }

    /// Read-modify-write the registry under an exclusive advisory lock,
    /// so a concurrent `piv` invocation (e.g. `deregister` while `monitor`
    /// is mid-cycle) cannot interleave writes.
    pub fn update<F>(&self, mutate: F) -> Result<Registry, RegistryError>
    where
        F: FnOnce(&mut Registry) -> Result<(), RegistryError>,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| RegistryError::Io(e.to_string()))?;
        }

        let lock_path = self.path.with_extension("lock");
        let lock_file = self.acquire_lock(&lock_path)?;

        let mut registry = self.read()?;
        mutate(&mut registry)?;
        self.write_atomic(&registry)?;

        fs2::FileExt::unlock(&lock_file).ok();
        Ok(registry)
    }

    fn acquire_lock(&self, lock_path: &Path) -> Result<File, RegistryError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| RegistryError::Io(e.to_string()))?;

        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(50)),
                Err(_) => return Err(RegistryError::LockTimeout(self.lock_timeout)),
            }
        }
    }

    /// Write the registry to a temp file in the same directory, then
    /// rename over the target — a rename within one filesystem is atomic,
    /// so a reader never observes a half-written registry.
    fn write_atomic(&self, registry: &Registry) -> Result<(), RegistryError> {
        let yaml = serde_yaml::to_string(registry).map_err(|e| RegistryError::Malformed(e.to_string()))?;

        let tmp_path = self.path.with_extension("yaml.tmp");
        {
            let mut tmp_file = File::create(&tmp_path).map_err(|e| RegistryError::Io(e.to_string()))?;
            tmp_file.write_all(yaml.as_bytes()).map_err(|e| RegistryError::Io(e.to_string()))?;
            tmp_file.sync_all().map_err(|e| RegistryError::Io(e.to_string()))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| RegistryError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::project::{CycleMetadata, Project, ProjectStatus};
    use chrono::Utc;

    fn project(name: &str) -> Project {
        Project {
            name: name.to_string(),
            path: format!("/tmp/{name}"),
            status: ProjectStatus::Idle,
            heartbeat: Utc::now(),
            current_phase: None,
            last_completed_phase: None,
            piv_commands_version: "v1".to_string(),
            orchestrator_pid: None,
            registered_at: Utc::now(),
            cycle_metadata: CycleMetadata::default(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(dir.path().join("registry.yaml"));
        let registry = store.read().unwrap();
        assert!(registry.projects.is_empty());
    }

    #[test]
    fn update_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        let store = RegistryStore::new(&path);

        store
            .update(|r| {
                r.register(project("demo"));
                Ok(())
            })
            .unwrap();

        let reopened = RegistryStore::new(&path);
        let registry = reopened.read().unwrap();
        assert!(registry.find_by_name("demo").is_some());
    }

    #[test]
    fn write_is_atomic_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        let store = RegistryStore::new(&path);

        store
            .update(|r| {
                r.register(project("demo"));
                Ok(())
            })
            .unwrap();

        assert!(!path.with_extension("yaml.tmp").exists());
        assert!(path.exists());
    }

    #[test]
    fn update_propagates_mutation_error_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        let store = RegistryStore::new(&path);

        let result = store.update(|_r| Err(RegistryError::ProjectNotFound("ghost".to_string())));
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
