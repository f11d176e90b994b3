// File system helpers shared by the staging and SOCA applications

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum FileIoError {
    #[error("File {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{action} {} failed: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("YAML error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, FileIoError>;

fn io_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> FileIoError + 'a {
    move |source| FileIoError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Parse a YAML file into a generic value
pub fn read_yaml(path: &Path) -> Result<serde_yaml::Value> {
    if !path.is_file() {
        return Err(FileIoError::NotFound(path.to_path_buf()));
    }

    let text = fs::read_to_string(path).map_err(io_error("Reading", path))?;
    serde_yaml::from_str(&text).map_err(|source| FileIoError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as YAML into `path` (overwrites)
pub fn write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_yaml::to_string(value).map_err(|source| FileIoError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(io_error("Writing", path))?;
    debug!(path = %path.display(), "Wrote YAML-formatted file");
    Ok(())
}

/// Create the directory tree `path` if it does not already exist
pub fn build_dirpath_tree(path: &Path) -> Result<()> {
    if path.is_dir() {
        info!(path = %path.display(), "Directory tree exists; nothing to be done");
        return Ok(());
    }

    warn!(
        path = %path.display(),
        "Directory tree does not exist; an attempt will be made to create it"
    );
    fs::create_dir_all(path).map_err(io_error("Creating directory tree", path))
}

/// Symbolically link `src` to `dst`, replacing any existing link or file at `dst`.
///
/// A relative `src` is resolved against the current directory first; the
/// link target would otherwise be resolved relative to `dst`'s directory.
pub fn symlink_force(src: &Path, dst: &Path) -> Result<()> {
    let src = std::path::absolute(src).map_err(io_error("Resolving", src))?;
    let src = src.as_path();

    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst).map_err(io_error("Removing", dst))?;
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(io_error("Creating directory tree", parent))?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(src, dst).map_err(io_error("Linking", dst))?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_file(src, dst).map_err(io_error("Linking", dst))?;

    debug!(src = %src.display(), dst = %dst.display(), "Linked file");
    Ok(())
}

/// Copy `src` to `dst`, creating the destination directory
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    if !src.is_file() {
        return Err(FileIoError::NotFound(src.to_path_buf()));
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(io_error("Creating directory tree", parent))?;
    }
    fs::copy(src, dst).map_err(io_error("Copying", src))
}

/// Concatenate `inputs` (in order) into `output`, returning the bytes written
pub fn concatenate(inputs: &[PathBuf], output: &Path) -> Result<u64> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(io_error("Creating directory tree", parent))?;
    }

    let mut out = File::create(output).map_err(io_error("Creating", output))?;
    let mut total = 0;
    for input in inputs {
        let mut reader = File::open(input).map_err(io_error("Opening", input))?;
        total += io::copy(&mut reader, &mut out).map_err(io_error("Concatenating", input))?;
    }
    out.flush().map_err(io_error("Writing", output))?;

    info!(
        output = %output.display(),
        inputs = inputs.len(),
        bytes = total,
        "Concatenated files"
    );
    Ok(total)
}

/// Append a single line to `path`, creating it if needed
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error("Creating directory tree", parent))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error("Opening", path))?;
    writeln!(file, "{line}").map_err(io_error("Writing", path))
}

/// Write plain text into `path` (overwrites)
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(io_error("Writing", path))
}

/// Read plain text from `path`
pub fn read_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(FileIoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(io_error("Reading", path))
}
