use crate::shared::Result;
use std::fs;
use std::path::Path;

/// Maximum size of a config or state file we are willing to load (1 MB)
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum amount of scanner stdout kept in memory (32 MB)
pub const MAX_SCANNER_OUTPUT_SIZE: usize = 32 * 1024 * 1024;

/// Validates that `path` is a regular file, not a symlink, and not larger than `max_size`.
///
/// Uses `symlink_metadata()` so that the link itself is inspected rather than
/// its target.
pub fn validate_regular_file(path: &Path, file_description: &str, max_size: u64) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read {} metadata for {}: {}",
            file_description,
            path.display(),
            e
        )
    })?;

    if metadata.is_symlink() {
        anyhow::bail!(
            "Security: {} is a symbolic link. For security reasons, symbolic links are not allowed for the {}.",
            path.display(),
            file_description
        );
    }

    if !metadata.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }

    if metadata.len() > max_size {
        anyhow::bail!(
            "Security: {} is too large ({} bytes). Maximum allowed size is {} bytes.",
            path.display(),
            metadata.len(),
            max_size
        );
    }

    Ok(())
}

/// Creates `dir` (and parents) if needed and rejects it when it is a symlink.
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    if let Ok(metadata) = fs::symlink_metadata(dir) {
        if metadata.is_symlink() {
            anyhow::bail!(
                "Security: output directory {} is a symbolic link. Writing through symbolic links is not allowed.",
                dir.display()
            );
        }
        if !metadata.is_dir() {
            anyhow::bail!("{} exists but is not a directory", dir.display());
        }
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| {
        anyhow::anyhow!("Failed to create directory {}: {}", dir.display(), e)
    })?;
    Ok(())
}
