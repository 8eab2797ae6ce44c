use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Lowercased extension of an uploaded filename, if it is plain ASCII
/// alphanumerics. Directory components from either path style are ignored.
pub fn upload_extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    Path::new(base)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
}

/// An uploaded image held on disk for the duration of one request. The file
/// has a unique name and is removed when the guard is dropped.
#[derive(Debug)]
pub struct ScratchImage {
    file: NamedTempFile,
}

impl ScratchImage {
    pub async fn create(
        dir: &Path,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> std::io::Result<Self> {
        let dir = dir.to_path_buf();
        let suffix = upload_extension(original_name)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!(path = %file.path().display(), "Stored scratch image");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
