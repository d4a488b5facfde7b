//! Frame store: resolving and parsing frame data files
//!
//! A frame file is newline-delimited, comma-separated unsigned 32-bit
//! integers in decimal or `0x`-hex. Lines starting with `#` or `//` are
//! comments; blank lines are ignored. A field that fails to parse is
//! coerced to 0 rather than rejected (the permissive policy the hardware
//! team relies on for hand-edited capture files).

use crate::config::parse_u32;
use crate::error::{FeederError, Result};
use std::path::{Path, PathBuf};

/// One bright-cycle's worth of 32-bit words, destined for a single FIFO load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    words: Vec<u32>,
}

impl Frame {
    /// Create a frame from its words.
    #[must_use]
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// The frame's words, in push order.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Number of words in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the frame holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Ordered, read-only collection of frames built once at startup.
#[derive(Debug, Clone)]
pub struct FrameSet {
    frames: Vec<Frame>,
}

impl FrameSet {
    /// Create a frame set from frames already in feed order.
    #[must_use]
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// The frames, in feed order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the set holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }
}

/// Resolve the list of frame data files to load.
///
/// With a directory, the explicit list is replaced by every regular `.csv`
/// file in that directory, sorted ascending by full path. Otherwise the
/// explicit list is used in its given order.
///
/// # Errors
///
/// Returns `FeederError::Config` if the resulting list is empty, or an I/O
/// error if the directory cannot be read.
pub fn resolve_inputs(explicit: &[PathBuf], directory: Option<&Path>) -> Result<Vec<PathBuf>> {
    let paths = match directory {
        Some(dir) => {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                    found.push(path);
                }
            }
            found.sort();
            tracing::debug!("Directory scan of {} found {} .csv files", dir.display(), found.len());
            found
        }
        None => explicit.to_vec(),
    };

    if paths.is_empty() {
        return Err(FeederError::config("no frame data files to load"));
    }
    Ok(paths)
}

/// Parse one frame data file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let text = std::fs::read_to_string(path)?;
    let frame = parse_frame(&text);
    tracing::debug!("Loaded {} ({} words)", path.display(), frame.len());
    Ok(frame)
}

/// Load every resolved path in order, producing the frame set.
///
/// Loading is sequential: file I/O dominates and the feed order must be
/// preserved.
///
/// # Errors
///
/// Returns an I/O error for an unreadable file, or `FeederError::Config`
/// if the resulting set is empty.
pub fn load_all(paths: &[PathBuf]) -> Result<FrameSet> {
    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        frames.push(load_frame(path)?);
    }

    if frames.is_empty() {
        return Err(FeederError::config("frame set is empty"));
    }

    tracing::info!("Loaded {} frame(s)", frames.len());
    Ok(FrameSet { frames })
}

fn parse_frame(text: &str) -> Frame {
    let mut words = Vec::new();

    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        for field in line.split(',') {
            let field = field.trim_start_matches([' ', '\t']).trim_end();
            // Unparsable fields coerce to 0, matching strtoul() behavior
            words.push(parse_u32(field).unwrap_or(0));
        }
    }

    Frame { words }
}
