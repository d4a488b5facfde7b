//! Frame sequencing policy
//!
//! Decides which frame each channel-load cycle feeds. Each frame index is
//! visited `repeat_factor` times consecutively before advancing.

/// Cursor over `frame_count` frames with a fixed repeat factor.
#[derive(Debug)]
pub struct SequencePolicy {
    frame_count: usize,
    repeat_factor: u32,
    cursor: Option<(usize, u32)>,
}

impl SequencePolicy {
    /// Create a policy over `frame_count` frames, visiting each
    /// `repeat_factor` times. `repeat_factor` must be >= 1.
    #[must_use]
    pub fn new(frame_count: usize, repeat_factor: u32) -> Self {
        debug_assert!(repeat_factor >= 1);
        Self {
            frame_count,
            repeat_factor,
            cursor: None,
        }
    }

    /// Total number of channel-load cycles the policy will yield.
    #[must_use]
    pub fn total_loads(&self) -> u64 {
        self.frame_count as u64 * u64::from(self.repeat_factor)
    }

    /// Advance the cursor and return the next frame index to load, or
    /// `None` once every frame has been visited `repeat_factor` times.
    pub fn advance(&mut self) -> Option<usize> {
        let (index, repeat) = match self.cursor {
            None => (0, 1),
            Some((index, repeat)) if repeat < self.repeat_factor => (index, repeat + 1),
            Some((index, _)) => (index + 1, 1),
        };

        if index >= self.frame_count {
            return None;
        }
        self.cursor = Some((index, repeat));
        Some(index)
    }
}
