use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR: &str = "offside_review";
const PITCH_DIR: &str = "pitch";
const LOG_DIR: &str = "logs";

/// `$XDG_CACHE_HOME/offside_review`, else `~/.cache/offside_review`, else
/// the system temp dir.
pub fn cache_root() -> PathBuf {
    cache_root_from(
        std::env::var("XDG_CACHE_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn cache_root_from(xdg: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(base) = xdg.filter(|b| !b.trim().is_empty()) {
        return PathBuf::from(base).join(CACHE_DIR);
    }
    if let Some(home) = home.filter(|h| !h.trim().is_empty()) {
        return PathBuf::from(home).join(".cache").join(CACHE_DIR);
    }
    std::env::temp_dir().join(CACHE_DIR)
}

pub fn pitch_dir() -> PathBuf {
    cache_root().join(PITCH_DIR)
}

pub fn log_dir() -> PathBuf {
    cache_root().join(LOG_DIR)
}

/// Writes through a sibling temp file and renames it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_xdg_then_home() {
        assert_eq!(
            cache_root_from(Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg/offside_review")
        );
        assert_eq!(
            cache_root_from(Some("  ".into()), Some("/home/u".into())),
            PathBuf::from("/home/u/.cache/offside_review")
        );
        assert!(cache_root_from(None, None).ends_with(CACHE_DIR));
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.bin");
        write_atomic(&path, b"abc").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abc");
        assert!(!dir.path().join("nested").join("out.bin.tmp").exists());
    }
}
