// Checksum hash indices for fetched files

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use tracing::info;

use crate::application::fileio::{self, FileIoError};
use crate::domain::DomainError;

/// Hash algorithm for checksum indices (`<platform>_hash` in the fetch block)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashLevel {
    #[default]
    Md5,
    Sha256,
    Sha512,
}

impl FromStr for HashLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(HashLevel::Md5),
            "sha256" => Ok(HashLevel::Sha256),
            "sha512" => Ok(HashLevel::Sha512),
            _ => Err(DomainError::UnsupportedHashLevel(s.to_string())),
        }
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hex-encoded hash index of the file at `path`
pub fn hash_file(path: &Path, level: HashLevel) -> Result<String, FileIoError> {
    let to_error = |source| FileIoError::Io {
        action: "Hashing",
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(to_error)?;
    match level {
        HashLevel::Md5 => digest_reader::<Md5>(file),
        HashLevel::Sha256 => digest_reader::<Sha256>(file),
        HashLevel::Sha512 => digest_reader::<Sha512>(file),
    }
    .map_err(to_error)
}

/// Append `<hash>  <local_path>` (the `md5sum` layout) to the checksum file
pub fn write_fetch_checksum(
    checksum_filepath: &Path,
    local_path: &Path,
    hash_index: &str,
) -> Result<(), FileIoError> {
    info!(
        checksum_file = %checksum_filepath.display(),
        local_path = %local_path.display(),
        "Recording checksum hash index"
    );
    fileio::append_line(
        checksum_filepath,
        &format!("{}  {}", hash_index, local_path.display()),
    )
}
