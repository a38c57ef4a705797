use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;

const READ_CHUNK: usize = 8192;

/// Computes a fixed-size content hash for a file.
///
/// Callers check that the file exists before invoking the provider; an
/// error here means the file vanished or could not be read in between.
pub trait DigestProvider: Send + Sync {
    fn digest(&self, path: &Path) -> std::io::Result<[u8; DIGEST_LEN]>;
}

/// Streams the file through SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl DigestProvider for Sha256Digest {
    fn digest(&self, path: &Path) -> std::io::Result<[u8; DIGEST_LEN]> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; READ_CHUNK];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().into())
    }
}

/// Lowercase hex, 64 characters.
pub fn to_hex(digest: &[u8; DIGEST_LEN]) -> String {
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_matches_known_vector() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let digest = Sha256Digest.digest(&path).unwrap();
        assert_eq!(
            to_hex(&digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn content_spanning_several_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big");
        let data = vec![b'a'; READ_CHUNK * 3 + 17];
        std::fs::write(&path, &data).unwrap();

        let digest = Sha256Digest.digest(&path).unwrap();
        let expected: [u8; DIGEST_LEN] = Sha256::digest(&data).into();
        assert_eq!(digest, expected);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Sha256Digest.digest(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn hex_is_lowercase_and_full_width() {
        let hex = to_hex(&[0xAB; DIGEST_LEN]);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c == 'a' || c == 'b'));
    }
}
