//! Output writing.
//!
//! The document is written to a hidden temp file in the target directory,
//! then hard-linked to its final name. Linking fails if the name is taken,
//! so an existing file is never replaced, and readers only ever see a
//! complete document.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use newsdigest_shared::{DigestError, OutputOptions, Result};

use crate::assembler::FinalDocument;

/// `{prefix}_{code}_{YYYYmmdd_HHMMSS}.md`
pub fn output_file_name(prefix: &str, code: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "{prefix}_{}_{}.md",
        code.to_lowercase(),
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Persist `document` under a new, timestamped name.
///
/// Returns [`DigestError::OutputCollision`] without touching the existing
/// file when the name is already taken.
#[instrument(skip_all, fields(dir = %opts.dir.display()))]
pub fn write(document: &FinalDocument, opts: &OutputOptions) -> Result<PathBuf> {
    std::fs::create_dir_all(&opts.dir).map_err(|e| DigestError::io(&opts.dir, e))?;

    let file_name = output_file_name(&opts.prefix, document.profile.code, document.generated_at);
    let target = opts.dir.join(&file_name);
    if target.exists() {
        return Err(DigestError::OutputCollision { path: target });
    }

    let path = place(&opts.dir, &file_name, document.render().as_bytes())?;
    info!(path = %path.display(), "summary written");
    Ok(path)
}

/// Stage `bytes` in a temp file in `dir`, then link it to `file_name`.
///
/// The link fails if the name appeared since the caller checked it; the temp
/// file is removed either way.
fn place(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = dir.join(file_name);
    let temp = TempFile::new(dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::now_v7())));
    write_new(temp.path(), bytes)?;

    match std::fs::hard_link(temp.path(), &target) {
        Ok(()) => Ok(target),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(DigestError::OutputCollision { path: target })
        }
        Err(e) => Err(DigestError::io(&target, e)),
    }
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create_new(path).map_err(|e| DigestError::io(path, e))?;
    file.write_all(bytes).map_err(|e| DigestError::io(path, e))?;
    file.sync_all().map_err(|e| DigestError::io(path, e))
}

/// Removes the temp file when dropped, on success and on every early return.
struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!(path = %self.path.display(), error = %e, "could not remove temp file"),
        }
    }
}
