//! Transactional rewriting of the shared constants file.
//!
//! The compiler reads environment-specific addresses from one constants
//! source file. Before a build the file is rewritten with a
//! [`ReplacementSet`]; afterwards the original content is written back.
//!
//! [`ConstantsFile::prepare`] hands out a [`ConstantsGuard`] that owns the
//! pre-mutation [`ConstantsSnapshot`]. The guard borrows the file mutably, so
//! at most one mutation can be in flight. Restoring happens either explicitly
//! through [`ConstantsGuard::restore`], which reports write failures, or on
//! drop when the enclosed step returned early or panicked.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ReplacementSet;
use crate::error::{Error, Result};

/// Content of the constants file captured before a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantsSnapshot {
    content: String,
}

impl ConstantsSnapshot {
    pub fn as_str(&self) -> &str {
        &self.content
    }
}

/// Handle to the shared constants file.
#[derive(Debug)]
pub struct ConstantsFile {
    path: PathBuf,
}

impl ConstantsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current content.
    pub fn snapshot(&self) -> Result<ConstantsSnapshot> {
        let content = fs::read_to_string(&self.path).map_err(|e| Error::read(&self.path, e))?;
        Ok(ConstantsSnapshot { content })
    }

    /// Apply `set` to the file and return a guard holding the original.
    ///
    /// A failed write is rolled back to the snapshot before the error is
    /// returned; if the rollback fails too, [`Error::Restore`] is returned.
    pub fn prepare(&mut self, set: &ReplacementSet) -> Result<ConstantsGuard<'_>> {
        self.prepare_with(set, |path, content| fs::write(path, content))
    }

    fn prepare_with(
        &mut self,
        set: &ReplacementSet,
        write: impl FnOnce(&Path, &str) -> io::Result<()>,
    ) -> Result<ConstantsGuard<'_>> {
        let snapshot = self.snapshot()?;
        let mutated = set.apply(snapshot.as_str());

        if let Err(e) = write(&self.path, &mutated) {
            let err = Error::write(&self.path, e);
            self.write_back(&snapshot).inspect_err(|_| tracing::error!("{}", err))?;
            return Err(err);
        }
        tracing::debug!(
            "Applied {} constant(s) to {}",
            set.len(),
            self.path.display()
        );

        Ok(ConstantsGuard {
            file: self,
            snapshot: Some(snapshot),
        })
    }

    /// Run `step` with `set` applied, restoring the file afterwards.
    ///
    /// A restore failure takes precedence over the step's own result: the
    /// file may still hold substituted values and the caller must stop.
    pub fn transaction<T>(
        &mut self,
        set: &ReplacementSet,
        step: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let guard = self.prepare(set)?;
        let outcome = step();

        match (outcome, guard.restore()) {
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(restore_err)) => Err(restore_err),
            (Err(step_err), Err(restore_err)) => {
                tracing::error!("Step failed before restore: {}", step_err);
                Err(restore_err)
            }
        }
    }

    fn write_back(&self, snapshot: &ConstantsSnapshot) -> Result<()> {
        fs::write(&self.path, snapshot.as_str()).map_err(|source| Error::Restore {
            path: self.path.clone(),
            source,
        })
    }
}

/// An in-flight mutation of the constants file.
///
/// Dropping the guard restores the snapshot; failures there can only be
/// logged, so prefer [`ConstantsGuard::restore`].
#[must_use = "dropping the guard restores the constants file immediately"]
#[derive(Debug)]
pub struct ConstantsGuard<'a> {
    file: &'a mut ConstantsFile,
    snapshot: Option<ConstantsSnapshot>,
}

impl ConstantsGuard<'_> {
    /// The content the file will be restored to.
    pub fn snapshot(&self) -> Option<&ConstantsSnapshot> {
        self.snapshot.as_ref()
    }

    /// Write the snapshot back.
    pub fn restore(mut self) -> Result<()> {
        match self.snapshot.take() {
            Some(snapshot) => self.file.write_back(&snapshot),
            None => Ok(()),
        }
    }
}

impl Drop for ConstantsGuard<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            if let Err(e) = self.file.write_back(&snapshot) {
                tracing::error!("{}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ORIGINAL: &str = "const MARKETPLACE = address(\"MARKETPLACE_ADDRESS\");\n\
                            const ADMIN = address(\"ADMIN_ADDRESS\");\n";

    fn fixture() -> (TempDir, ConstantsFile, ReplacementSet) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("constants.tolk");
        fs::write(&path, ORIGINAL).expect("Failed to write constants");

        let mut set = ReplacementSet::new();
        set.push("\"MARKETPLACE_ADDRESS\"", "\"EQmarket\"");
        set.push("\"ADMIN_ADDRESS\"", "\"EQadmin\"");

        (temp, ConstantsFile::new(path), set)
    }

    #[test]
    fn test_prepare_then_restore_is_identity() {
        let (_temp, mut file, set) = fixture();

        let guard = file.prepare(&set).expect("Failed to prepare");
        assert_eq!(guard.snapshot().map(|s| s.as_str()), Some(ORIGINAL));
        guard.restore().expect("Failed to restore");

        assert_eq!(fs::read_to_string(file.path()).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_step_sees_substituted_content() {
        let (_temp, mut file, set) = fixture();
        let path = file.path().to_path_buf();

        let seen = file
            .transaction(&set, || Ok(fs::read_to_string(&path)?))
            .expect("Transaction failed");

        assert!(seen.contains("\"EQmarket\""));
        assert!(seen.contains("\"EQadmin\""));
        assert_eq!(fs::read_to_string(&path).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_restore_runs_when_step_fails() {
        let (_temp, mut file, set) = fixture();

        let result: Result<()> =
            file.transaction(&set, || Err(Error::Extraction("boom".to_string())));

        assert!(matches!(result, Err(Error::Extraction(_))));
        assert_eq!(fs::read_to_string(file.path()).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_restore_runs_when_step_panics() {
        let (_temp, mut file, set) = fixture();
        let path = file.path().to_path_buf();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = file.transaction(&set, || -> Result<()> { panic!("compiler crashed") });
        }));

        assert!(caught.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_dropped_guard_restores() {
        let (_temp, mut file, set) = fixture();
        {
            let _guard = file.prepare(&set).expect("Failed to prepare");
        }
        assert_eq!(fs::read_to_string(file.path()).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (_temp, mut file, set) = fixture();
        let constants_path = file.path().to_path_buf();

        // Disk fills up halfway through the substituted content.
        let result = file.prepare_with(&set, |path, content| {
            fs::write(path, &content[..content.len() / 2])?;
            Err(io::Error::other("No space left on device"))
        });

        assert!(matches!(result, Err(Error::Write { .. })));
        assert_eq!(fs::read_to_string(&constants_path).unwrap(), ORIGINAL);
    }

    /// Turn the constants path into a directory so writing it back fails.
    fn block_restore(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        fs::create_dir(path)?;
        Ok(())
    }

    #[test]
    fn test_restore_failure_wins_over_step_result() {
        let (_temp, mut file, set) = fixture();
        let path = file.path().to_path_buf();

        let ok = file.transaction(&set, || block_restore(&path));
        assert!(matches!(ok, Err(Error::Restore { .. })));

        fs::remove_dir(&path).unwrap();
        fs::write(&path, ORIGINAL).unwrap();

        let failed: Result<()> = file.transaction(&set, || {
            block_restore(&path)?;
            Err(Error::Extraction("boom".to_string()))
        });
        assert!(matches!(failed, Err(Error::Restore { .. })));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut file = ConstantsFile::new(temp.path().join("absent.tolk"));

        let err = file.prepare(&ReplacementSet::new()).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(!file.path().exists());
    }
}
