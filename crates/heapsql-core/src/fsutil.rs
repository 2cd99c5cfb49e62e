use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes `contents` to `path` atomically: write to a sibling `.tmp`
/// file, fsync it, then rename over the destination. The catalog and
/// every index document go through this so a reader never observes a
/// half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("")
    ));
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(contents)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Appends `line` to the file at `path`, fsyncing before returning so
/// a subsequent directory update is guaranteed to observe a durable
/// heap record. Creates the file if absent.
pub fn append_and_sync(path: &Path, line: &str, fsync: bool) -> std::io::Result<u64> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let offset = file.metadata()?.len();
    file.write_all(line.as_bytes())?;
    if fsync {
        file.sync_all()?;
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!dir.path().join("catalog.json.tmp").exists());
    }

    #[test]
    fn append_returns_the_offset_of_the_new_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let off1 = append_and_sync(&path, "a\n", true).unwrap();
        let off2 = append_and_sync(&path, "bb\n", true).unwrap();
        assert_eq!(off1, 0);
        assert_eq!(off2, 2);
    }
}
