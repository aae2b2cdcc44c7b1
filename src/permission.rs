use crate::messages::PermissionState;
use std::path::Path;

/// Storage-write permission, desktop style: granted means the output
/// directory exists (or can be created) and accepts a scratch file.
pub fn check(output_dir: &Path) -> PermissionState {
    match probe_writable(output_dir) {
        Ok(()) => PermissionState::Granted,
        Err(e) => {
            tracing::debug!("Storage probe failed for {:?}: {}", output_dir, e);
            PermissionState::NotGranted
        }
    }
}

/// Re-run the grant check, creating the directory first. This is the
/// user-triggered retry path for the `allow` command.
pub fn request(output_dir: &Path) -> PermissionState {
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        tracing::warn!("Cannot create output directory {:?}: {}", output_dir, e);
        return PermissionState::NotGranted;
    }
    check(output_dir)
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "output directory does not exist",
        ));
    }

    // Temp file is removed on drop
    tempfile::Builder::new()
        .prefix(".vidrec-probe-")
        .tempfile_in(dir)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_for_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check(dir.path()), PermissionState::Granted);
    }

    #[test]
    fn test_not_granted_for_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(check(&missing), PermissionState::NotGranted);
    }

    #[test]
    fn test_request_denied_when_dir_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        // create_dir_all fails because a path component is a regular file
        assert_eq!(request(&blocker.join("out")), PermissionState::NotGranted);
    }

    #[test]
    fn test_request_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos").join("out");

        assert_eq!(check(&nested), PermissionState::NotGranted);
        assert_eq!(request(&nested), PermissionState::Granted);
        assert_eq!(check(&nested), PermissionState::Granted);
    }
}
