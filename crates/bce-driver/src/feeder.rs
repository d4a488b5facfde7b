//! Frame Feeder Engine
//!
//! Drives the BC_EMU double-buffered FIFO handshake: reset both channels,
//! pick a pass mode, then alternate channels loading frames until the
//! sequence policy is exhausted. All synchronization is polled through the
//! registers; there are no interrupts.

use crate::error::{FeederError, Result};
use crate::frames::FrameSet;
use crate::regs::{EmuRegisters, FifoChannel, BC_EMU_RTL_ID, FIFO_RESET_ALL};
use crate::sequence::SequencePolicy;
use std::time::{Duration, Instant};

/// Tunable feeder parameters.
#[derive(Debug, Clone)]
pub struct FeederOptions {
    /// How many times each frame is loaded before advancing (>= 1)
    pub repeat_factor: u32,

    /// Sleep between register polls
    pub poll_interval: Duration,

    /// Deadline for any single register poll; hardware that never responds
    /// fails with a timeout instead of hanging the process
    pub poll_timeout: Duration,

    /// Pause between word pushes, respecting the FIFO intake rate
    pub word_delay: Duration,
}

impl Default for FeederOptions {
    fn default() -> Self {
        Self {
            repeat_factor: 1,
            poll_interval: Duration::from_millis(1),
            poll_timeout: Duration::from_secs(5),
            word_delay: Duration::from_micros(10),
        }
    }
}

/// Where the engine currently is in its reset/arm/alternate/drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederState {
    /// Not yet started
    Init,
    /// Waiting for the startup reset of both channels
    Resetting,
    /// Pushing frame words into a channel
    Loading(FifoChannel),
    /// Waiting for the hardware to switch to a freshly loaded channel
    Armed(FifoChannel),
    /// A channel is active; the engine is between load cycles
    Active,
    /// Frames exhausted, waiting for the final deselect
    Draining,
    /// Normal completion
    Done,
}

/// The feeder engine. Owns the register interface and the frame set for
/// the duration of the run.
#[derive(Debug)]
pub struct FrameFeeder<R: EmuRegisters> {
    regs: R,
    frames: FrameSet,
    options: FeederOptions,
    state: FeederState,
}

impl<R: EmuRegisters> FrameFeeder<R> {
    /// Create a feeder over a register interface and a frame set.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Config` if the frame set is empty or the
    /// repeat factor is 0. No register is touched here.
    pub fn new(regs: R, frames: FrameSet, options: FeederOptions) -> Result<Self> {
        if frames.is_empty() {
            return Err(FeederError::config("frame set is empty"));
        }
        if options.repeat_factor == 0 {
            return Err(FeederError::config("repeat factor must be >= 1"));
        }

        Ok(Self {
            regs,
            frames,
            options,
            state: FeederState::Init,
        })
    }

    /// Current engine state.
    #[must_use]
    pub const fn state(&self) -> FeederState {
        self.state
    }

    /// Consume the feeder, returning the register interface.
    #[must_use]
    pub fn into_regs(self) -> R {
        self.regs
    }

    /// Run the engine to completion.
    ///
    /// Verifies the RTL identity, resets both FIFOs, selects the pass
    /// mode, then alternates channels through `N * repeat_factor` load
    /// cycles and drains.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Hardware` on an identity mismatch (before any
    /// FIFO register is written) or `FeederError::Timeout` when a register
    /// poll misses its deadline.
    pub fn run(&mut self) -> Result<()> {
        let id = self.regs.rtl_id();
        if id != BC_EMU_RTL_ID {
            return Err(FeederError::hardware(format!(
                "BC_EMU isn't loaded (rtl_id {id}, expected {BC_EMU_RTL_ID})"
            )));
        }

        self.set_state(FeederState::Resetting);
        self.regs.write_fifo_ctl(FIFO_RESET_ALL);
        self.wait_ctl_clear("startup FIFO reset")?;

        let mut policy = SequencePolicy::new(self.frames.len(), self.options.repeat_factor);

        // Continuous mode enables channel alternation; a single load cycle
        // needs only one one-shot pass.
        if policy.total_loads() > 1 {
            self.regs.set_cont_mode(1);
        } else {
            self.regs.set_cont_mode(0);
            self.regs.set_nshot_limit(1);
        }

        tracing::info!(
            "Feeding {} frame(s), repeat factor {} ({} load cycles)",
            self.frames.len(),
            self.options.repeat_factor,
            policy.total_loads()
        );

        let mut channel = FifoChannel::Fifo0;

        loop {
            self.regs.write_fifo_ctl(channel.bit());
            self.wait_ctl_clear("channel FIFO reset")?;

            let Some(index) = policy.advance() else {
                self.set_state(FeederState::Draining);
                self.regs.write_fifo_select(0);
                self.wait_select(0, "final deselect")?;
                self.set_state(FeederState::Done);
                tracing::info!("Frame sequence complete");
                return Ok(());
            };

            self.set_state(FeederState::Loading(channel));
            tracing::debug!("Loading frame {index} into {channel}");

            // The policy never yields an out-of-range index
            let frame = &self.frames.frames()[index];
            for &word in frame.words() {
                self.regs.push_word(channel, word);
                if !self.options.word_delay.is_zero() {
                    std::thread::sleep(self.options.word_delay);
                }
            }

            self.set_state(FeederState::Armed(channel));
            self.regs.write_fifo_select(channel.bit());
            self.wait_select(channel.bit(), "channel switch")?;
            self.set_state(FeederState::Active);

            channel = channel.other();
        }
    }

    fn set_state(&mut self, state: FeederState) {
        tracing::trace!("Feeder state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn wait_ctl_clear(&self, what: &str) -> Result<()> {
        self.poll_until(|regs| regs.read_fifo_ctl(), 0, what)
    }

    fn wait_select(&self, expect: u32, what: &str) -> Result<()> {
        self.poll_until(|regs| regs.read_fifo_select(), expect, what)
    }

    /// Poll a register at the configured cadence until it reads `expect`.
    fn poll_until<F>(&self, read: F, expect: u32, what: &str) -> Result<()>
    where
        F: Fn(&R) -> u32,
    {
        let timeout = self.options.poll_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            if read(&self.regs) == expect {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(FeederError::timeout(what, ms));
            }
            std::thread::sleep(self.options.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{Frame, FrameSet};

    fn frames(words: &[&[u32]]) -> FrameSet {
        FrameSet::new(words.iter().map(|w| Frame::new(w.to_vec())).collect())
    }

    #[derive(Debug, Default)]
    struct NullRegs;

    impl EmuRegisters for NullRegs {
        fn rtl_id(&self) -> u32 {
            BC_EMU_RTL_ID
        }
        fn push_word(&mut self, _channel: FifoChannel, _word: u32) {}
        fn write_fifo_ctl(&mut self, _mask: u32) {}
        fn read_fifo_ctl(&self) -> u32 {
            0
        }
        fn write_fifo_select(&mut self, _mask: u32) {}
        fn read_fifo_select(&self) -> u32 {
            0
        }
        fn set_cont_mode(&mut self, _value: u32) {}
        fn set_nshot_limit(&mut self, _value: u32) {}
    }

    #[test]
    fn empty_frame_set_rejected_at_construction() {
        let err =
            FrameFeeder::new(NullRegs, FrameSet::new(Vec::new()), FeederOptions::default())
                .map(|_| ())
                .unwrap_err();
        assert!(matches!(err, FeederError::Config { .. }));
    }

    #[test]
    fn zero_repeat_factor_rejected() {
        let options = FeederOptions {
            repeat_factor: 0,
            ..FeederOptions::default()
        };
        let err = FrameFeeder::new(NullRegs, frames(&[&[1]]), options)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, FeederError::Config { .. }));
    }

    #[test]
    fn new_feeder_starts_in_init() {
        let feeder =
            FrameFeeder::new(NullRegs, frames(&[&[1]]), FeederOptions::default()).unwrap();
        assert_eq!(feeder.state(), FeederState::Init);
    }
}
