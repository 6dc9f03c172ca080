//! Character discovery.
//!
//! A character is a subdirectory of the frames base directory containing at
//! least one image frame. Frame filenames establish playback order: frames
//! are always listed lexicographically, so callers must name them such that
//! lexicographic order equals animation order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extensions accepted as animation frames, compared case-insensitively.
const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One discovered character, ready for display in a chooser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterInfo {
    pub name: String,
    pub path: PathBuf,
    /// First frame in playback order, usable as a thumbnail.
    pub preview_path: PathBuf,
    pub frame_count: usize,
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// List the frame files of one character directory in playback order.
pub(crate) fn list_frame_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_frame_file(path))
        .collect();
    frames.sort();
    Ok(frames)
}

/// Scan the base directory and return every subdirectory holding at least
/// one frame, sorted by character name.
pub fn scan_characters(base: &Path) -> Result<Vec<CharacterInfo>, String> {
    let entries = fs::read_dir(base)
        .map_err(|e| format!("failed to read characters directory {}: {}", base.display(), e))?;

    let mut characters = Vec::new();
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Ok(frames) = list_frame_files(&path) else {
            continue;
        };
        if frames.is_empty() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        characters.push(CharacterInfo {
            name,
            preview_path: frames[0].clone(),
            frame_count: frames.len(),
            path,
        });
    }

    characters.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(characters)
}

/// Full path to a character's frames directory.
pub fn character_frames_path(base: &Path, character_name: &str) -> PathBuf {
    base.join(character_name)
}

/// First frame of a character, for preview thumbnails. `None` when the
/// character has no frames.
pub fn preview_image(base: &Path, character_name: &str) -> Option<PathBuf> {
    let frames = list_frame_files(&character_frames_path(base, character_name)).ok()?;
    frames.into_iter().next()
}
