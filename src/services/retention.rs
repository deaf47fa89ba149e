// File retention for rotated artifacts (run logs, config backups)

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Delete the oldest files in `dir` whose names satisfy `matches`, leaving the newest `keep`.
///
/// Age is modification time; file names break ties, so timestamped names sort correctly even
/// on filesystems with coarse mtimes. Returns how many files were removed.
pub fn prune_oldest<F>(dir: &Path, keep: usize, matches: F) -> io::Result<usize>
where
    F: Fn(&str) -> bool,
{
    let mut candidates: Vec<(SystemTime, String)> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !matches(&name) {
                return None;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, name))
        })
        .collect();

    let excess = candidates.len().saturating_sub(keep);
    if excess == 0 {
        return Ok(0);
    }

    candidates.sort();
    let mut removed = 0;
    for (_, name) in candidates.into_iter().take(excess) {
        if fs::remove_file(dir.join(&name)).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prune_keeps_newest_matching() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("run_{}.log", i)), "x").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let removed = prune_oldest(dir.path(), 2, |n| n.starts_with("run_")).unwrap();

        assert_eq!(removed, 3);
        assert!(dir.path().join("run_3.log").exists());
        assert!(dir.path().join("run_4.log").exists());
        assert!(!dir.path().join("run_0.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_prune_under_limit_is_noop() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("run_0.log"), "x").unwrap();
        assert_eq!(prune_oldest(dir.path(), 5, |_| true).unwrap(), 0);
    }

    #[test]
    fn test_prune_missing_dir_errors() {
        let dir = tempdir().unwrap();
        assert!(prune_oldest(&dir.path().join("absent"), 1, |_| true).is_err());
    }
}
