use std::fs;
use std::io;
use std::path::Path;

/// blake3 hex digest of a file's contents.
///
/// Used to compare the live declared configuration against the copy embedded
/// in the most recent snapshot. Callers decide how to treat I/O errors; drift
/// detection fails open on them.
pub fn file_fingerprint(path: &Path) -> io::Result<String> {
    let data = fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_contents_produce_identical_fingerprints() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.conf");
        let b = dir.path().join("b.conf");
        fs::write(&a, "service.web.enable = true\n").unwrap();
        fs::write(&b, "service.web.enable = true\n").unwrap();
        assert_eq!(
            file_fingerprint(&a).unwrap(),
            file_fingerprint(&b).unwrap()
        );
    }

    #[test]
    fn different_contents_differ() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.conf");
        let b = dir.path().join("b.conf");
        fs::write(&a, "service.web.enable = true\n").unwrap();
        fs::write(&b, "service.web.enable = false\n").unwrap();
        assert_ne!(
            file_fingerprint(&a).unwrap(),
            file_fingerprint(&b).unwrap()
        );
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_fingerprint(&dir.path().join("absent")).is_err());
    }
}
