use std::collections::BTreeMap;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[cfg(test)]
#[path = "./sink.tests.rs"]
mod sink_tests;

/// Possible errors from file materialization. None of them is retried here;
/// the dispatcher decides whether the event gets another chance.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// Target path cannot be created or written.
    #[error("path '{0}' is not writable: {1}")]
    PathUnwritable(PathBuf, #[source] io::Error),

    /// Filesystem ran out of space mid-batch.
    #[error("disk full while writing '{0}': {1}")]
    DiskFull(PathBuf, #[source] io::Error),

    /// Requested file mode cannot be applied.
    #[error("cannot apply file mode {0:o} to '{1}': {2}")]
    ModeInvalid(u32, PathBuf, #[source] io::Error),
}

/// Materializes a batch of files into `dir` with the given mode.\
/// Each file goes through a sibling temp file, fsync and rename, so a reader observes
/// either the previous content or the complete new content, never a partial write.
pub async fn write_files(dir: &Path, files: &BTreeMap<String, Vec<u8>>, mode: u32) -> Result<(), SinkError> {
    if fs::metadata(dir).await.is_err() {
        fs::create_dir_all(dir)
            .await
            .map_err(|error| classify_io(dir, error))?;
        fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|error| SinkError::ModeInvalid(0o755, dir.to_path_buf(), error))?;
    }

    for (name, content) in files {
        write_one(dir, name, content, mode).await?;
    }

    Ok(())
}

async fn write_one(dir: &Path, name: &str, content: &[u8], mode: u32) -> Result<(), SinkError> {
    let target = dir.join(name);
    if already_written(&target, content, mode).await {
        return Ok(());
    }

    let temp = dir.join(format!(".{name}.tmp"));

    let mut file = fs::File::create(&temp)
        .await
        .map_err(|error| classify_io(&temp, error))?;
    file.write_all(content).await.map_err(|error| classify_io(&temp, error))?;
    file.sync_all().await.map_err(|error| classify_io(&temp, error))?;
    drop(file);

    fs::set_permissions(&temp, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|error| SinkError::ModeInvalid(mode, temp.clone(), error))?;

    fs::rename(&temp, &target)
        .await
        .map_err(|error| classify_io(&target, error))?;

    Ok(())
}

/// Returns `true` if the target already holds exactly this content with this mode,
/// making a rewrite unobservable.
async fn already_written(target: &Path, content: &[u8], mode: u32) -> bool {
    let Ok(metadata) = fs::metadata(target).await else {
        return false;
    };
    if metadata.permissions().mode() & 0o7777 != mode {
        return false;
    }

    match fs::read(target).await {
        Ok(existing) => existing == content,
        Err(_) => false,
    }
}

fn classify_io(path: &Path, error: io::Error) -> SinkError {
    match error.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => SinkError::DiskFull(path.to_path_buf(), error),
        _ => SinkError::PathUnwritable(path.to_path_buf(), error),
    }
}
