//! Agent artifact resolution
//!
//! When the operator does not pass an explicit path, the attach tool works
//! out where its own packaged artifact lives, trying two strategies in
//! order: the executable path the OS reports for the current process, then
//! the first file-backed executable mapping in `/proc/self/maps`. Launchers
//! that unpack a bundled artifact report the member with an `!` separator
//! (`/path/bundle!/inner`), which the second strategy strips back to the
//! container file.

use std::path::PathBuf;

use crate::domain::AttachError;

/// Marker separating a container artifact from a member path inside it.
pub const ARCHIVE_SEPARATOR: char = '!';

/// Resolve the agent artifact's filesystem path.
///
/// # Errors
/// `AttachError::NoArtifact` when neither strategy produces a path; the
/// operator must pass one explicitly.
pub fn resolve_agent_artifact() -> Result<PathBuf, AttachError> {
    if let Some(path) = from_current_exe() {
        return Ok(path);
    }
    if let Some(path) = from_proc_maps() {
        return Ok(path);
    }
    Err(AttachError::NoArtifact)
}

fn from_current_exe() -> Option<PathBuf> {
    std::env::current_exe().ok().filter(|path| path.exists())
}

fn from_proc_maps() -> Option<PathBuf> {
    let maps = std::fs::read_to_string("/proc/self/maps").ok()?;
    first_executable_mapping(&maps).map(strip_archive_member)
}

/// The pathname of the first executable file-backed mapping.
fn first_executable_mapping(maps: &str) -> Option<String> {
    for line in maps.lines() {
        // address perms offset dev inode pathname
        let mut columns = line.split_whitespace();
        let _address = columns.next();
        let Some(perms) = columns.next() else { continue };
        if !perms.contains('x') {
            continue;
        }
        let Some(pathname) = columns.nth(3) else { continue };
        if pathname.starts_with('/') {
            return Some(pathname.to_string());
        }
    }
    None
}

fn strip_archive_member(path: String) -> PathBuf {
    match path.find(ARCHIVE_SEPARATOR) {
        Some(index) => PathBuf::from(&path[..index]),
        None => PathBuf::from(path),
    }
}
