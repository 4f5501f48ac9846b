//! Standalone X25519 key-pair generator. The store itself never uses the pair;
//! it only hashes whatever private-key file the caller points it at.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::info;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum KeyPairError {
    #[error("unable to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Locations of the files written by [`generate_keypair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// Writes `<name>.priv` and `<name>.pub` into `dir`, each holding the base64
/// encoding of a fresh X25519 key. Existing files are overwritten.
pub fn generate_keypair(dir: &Path, name: &str) -> Result<KeyPairPaths, KeyPairError> {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    let paths = KeyPairPaths {
        private_key: dir.join(format!("{name}.priv")),
        public_key: dir.join(format!("{name}.pub")),
    };

    let mut secret_bytes = secret.to_bytes();
    let mut encoded = STANDARD.encode(secret_bytes);
    secret_bytes.zeroize();
    let written = write_private(&paths.private_key, encoded.as_bytes());
    encoded.zeroize();
    written?;

    fs::write(&paths.public_key, STANDARD.encode(public.as_bytes())).map_err(|source| {
        KeyPairError::Io {
            path: paths.public_key.clone(),
            source,
        }
    })?;

    info!(
        private_key = %paths.private_key.display(),
        public_key = %paths.public_key.display(),
        "generated key pair"
    );
    Ok(paths)
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<(), KeyPairError> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let io_err = |source: io::Error| KeyPairError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(io_err)?;
    // mode() only applies on creation
    fs::set_permissions(path, Permissions::from_mode(0o600)).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<(), KeyPairError> {
    fs::write(path, contents).map_err(|source| KeyPairError::Io {
        path: path.to_path_buf(),
        source,
    })
}
