use crate::Result;
use std::path::Path;

/// Removes all contents of the directory, creating it if it doesn't exist
pub(crate) async fn empty_dir(path: &Path) -> Result {
    fs_err::tokio::create_dir_all(path).await?;

    let mut entries = fs_err::tokio::read_dir(path).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            fs_err::tokio::remove_dir_all(&path).await?;
        } else {
            fs_err::tokio::remove_file(&path).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn empties_existing_and_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("uploads");

        empty_dir(&target).await.unwrap();
        assert!(target.is_dir());

        std::fs::create_dir_all(target.join("nested")).unwrap();
        std::fs::write(target.join("nested/a.png"), "").unwrap();
        std::fs::write(target.join("upload"), "").unwrap();

        empty_dir(&target).await.unwrap();
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
    }
}
