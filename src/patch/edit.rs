use crate::patch::plan::{PatchPlan, PatchedSource, SubstitutionOutcome};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// How zero-match substitutions are treated when patching a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchPolicy {
    /// Missing tokens are logged and skipped.
    #[default]
    Lenient,
    /// A token that matches nowhere in the plan fails the patch before any write.
    Strict,
}

impl PatchPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            PatchPolicy::Strict
        } else {
            PatchPolicy::Lenient
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("File I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} unmatched token(s) in {}: {}", tokens.len(), file.display(), tokens.join(", "))]
    TokensNotFound { file: PathBuf, tokens: Vec<String> },
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchReport should be checked for drift"]
pub struct PatchReport {
    pub file: PathBuf,
    pub outcomes: Vec<SubstitutionOutcome>,
    pub changed: bool,
}

impl PatchReport {
    pub fn total_matches(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.matches).sum()
    }
}

/// Run `plan` over `file` without touching the disk.
pub fn preview_file(plan: &PatchPlan, file: &Path) -> Result<(String, PatchedSource), PatchError> {
    let original = fs::read_to_string(file).map_err(|source| PatchError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let patched = plan.apply_to_str(&original);
    Ok((original, patched))
}

/// Apply `plan` to `file` in place.
///
/// The file is rewritten atomically and only when its content changes.
pub fn apply_to_file(
    plan: &PatchPlan,
    file: &Path,
    policy: PatchPolicy,
) -> Result<PatchReport, PatchError> {
    let (original, patched) = preview_file(plan, file)?;

    let unmatched = patched.unmatched_tokens();
    if policy == PatchPolicy::Strict && !unmatched.is_empty() {
        return Err(PatchError::TokensNotFound {
            file: file.to_path_buf(),
            tokens: unmatched.iter().map(|o| o.token.to_string()).collect(),
        });
    }
    for outcome in patched.zero_match() {
        warn!(
            file = %file.display(),
            step = outcome.step,
            token = outcome.token,
            "patch token not found"
        );
    }

    let changed = patched.text != original;
    if changed {
        atomic_write(file, patched.text.as_bytes()).map_err(|source| PatchError::Io {
            path: file.to_path_buf(),
            source,
        })?;
    }

    let report = PatchReport {
        file: file.to_path_buf(),
        outcomes: patched.outcomes,
        changed,
    };
    info!(
        file = %file.display(),
        steps = ?plan.step_ids(),
        replacements = report.total_matches(),
        "patched build configurator"
    );
    Ok(report)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes. The mtime is bumped so
/// the upstream build notices the edit.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;

    let permissions = fs::metadata(path)?.permissions();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}
