use sha2::{Digest, Sha256};

/// Maps a cache key to the file name its entry is stored under.
///
/// Keys are arbitrary strings (usually URIs), so they are hashed to get a
/// name that is safe on every filesystem.
pub fn entry_file_name(key: &str, extension: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{}.{extension}", hex::encode(digest))
}
