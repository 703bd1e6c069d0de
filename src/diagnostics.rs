use std::path::Path;

use crate::config::Config;

pub fn check(cfg: &Config, data_dir: &Path) -> anyhow::Result<()> {
    let mut errors: Vec<String> = Vec::new();

    // Check 1: data dir creatable and writable
    if let Err(e) = check_writable(data_dir) {
        errors.push(format!(
            "data dir {} is not writable: {e}\n  \
             → pass a different location with --data-dir",
            data_dir.display()
        ));
    }

    // Check 2: pinentry binary found
    if let Err(e) = std::process::Command::new(&cfg.pinentry)
        .arg("--version")
        .output()
    {
        errors.push(format!(
            "pinentry binary not found: '{}': {e}\n  \
             → install pinentry or pass --pinentry <path>",
            cfg.pinentry
        ));
    }

    if errors.is_empty() {
        return Ok(());
    }

    for err in &errors {
        eprintln!("ERROR: {err}");
    }
    anyhow::bail!("{} preflight check(s) failed", errors.len());
}

fn check_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let marker = dir.join(".write-check");
    std::fs::write(&marker, b"")?;
    std::fs::remove_file(&marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writable_dir_passes() {
        let dir = tempfile::tempdir().unwrap();
        check_writable(&dir.path().join("nested")).unwrap();
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_file_in_place_of_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(check_writable(&blocker).is_err());
    }
}
