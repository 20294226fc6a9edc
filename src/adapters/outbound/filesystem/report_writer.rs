use crate::ports::outbound::ReportSink;
use crate::shared::security::prepare_output_dir;
use crate::shared::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// ReportDirectoryWriter adapter for writing report artifacts to a directory
///
/// The directory is created on first write. Artifact names must be plain
/// file names; anything that could resolve outside the directory is rejected.
pub struct ReportDirectoryWriter {
    output_dir: PathBuf,
}

impl ReportDirectoryWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Rejects empty names, path separators and parent references
    fn validate_file_name(file_name: &str) -> Result<()> {
        if file_name.is_empty()
            || file_name == "."
            || file_name.contains("..")
            || file_name.contains('/')
            || file_name.contains('\\')
        {
            anyhow::bail!(
                "Security: invalid artifact name '{}'. Artifact names must be plain file names.",
                file_name
            );
        }
        Ok(())
    }

    /// Refuses to overwrite through a symlink planted at the target path
    fn validate_target(path: &Path) -> Result<()> {
        if let Ok(metadata) = fs::symlink_metadata(path) {
            if metadata.is_symlink() {
                anyhow::bail!(
                    "Security: {} is a symbolic link. For security reasons, writing to symbolic links is not allowed.",
                    path.display()
                );
            }
        }
        Ok(())
    }
}

impl ReportSink for ReportDirectoryWriter {
    fn write_artifact(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        Self::validate_file_name(file_name)?;
        prepare_output_dir(&self.output_dir)?;

        let path = self.output_dir.join(file_name);
        Self::validate_target(&path)?;

        fs::write(&path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "report artifact written");
        Ok(path)
    }
}
