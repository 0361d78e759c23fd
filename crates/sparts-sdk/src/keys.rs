//! Private key files: one hex-encoded secp256k1 key, surrounding whitespace ignored.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use sparts_crypto::{Signer, Zeroizing};

use crate::error::SdkResult;

/// Load a signer from a key file. An unparsable key is a `BadKey` error.
pub fn load_signer(path: &Path) -> SdkResult<Signer> {
    let text = Zeroizing::new(std::fs::read_to_string(path)?);
    Ok(Signer::from_private_hex(text.trim())?)
}

/// Write `signer`'s private key to `path`, readable by the owner only on Unix.
pub fn save_signer(signer: &Signer, path: &Path) -> SdkResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut text = signer.private_key().to_hex();
    text.push('\n');
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // An existing file keeps its old mode; tighten it before any key byte lands.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    tracing::debug!(path = %path.display(), public_key = %signer.public_key(), "key saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparts_types::ErrorKind;

    #[test]
    fn save_then_load_yields_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("me.priv");
        let signer = Signer::generate();
        save_signer(&signer, &path).unwrap();
        let loaded = load_signer(&path).unwrap();
        assert_eq!(loaded.public_key(), signer.public_key());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        let signer = Signer::generate();
        std::fs::write(&path, format!("  {}\n\n", signer.private_key().to_hex().as_str())).unwrap();
        assert_eq!(load_signer(&path).unwrap().public_key(), signer.public_key());
    }

    #[test]
    fn garbage_key_is_bad_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        std::fs::write(&path, "not hex at all").unwrap();
        assert_eq!(load_signer(&path).unwrap_err().kind(), ErrorKind::BadKey);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_signer(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, crate::SdkError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn saved_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        save_signer(&Signer::generate(), &path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn overwriting_a_readable_file_makes_it_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        std::fs::write(&path, "old contents that are longer than a key file line").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let signer = Signer::generate();
        save_signer(&signer, &path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_signer(&path).unwrap().public_key(), signer.public_key());
    }
}
