//! Typed BC_EMU register map
//!
//! Replaces raw base-pointer arithmetic with named accessors bound to
//! offsets that are validated once against the mapped BAR size, so a bad
//! offset in the config file fails at bind time instead of faulting on
//! first access.

use crate::error::{FeederError, Result};
use crate::mmio::BarRegion;

/// Value the identity register must read back when the BC_EMU RTL is loaded.
pub const BC_EMU_RTL_ID: u32 = 912_018;

/// `fifo_ctl` mask resetting both channels at once.
pub const FIFO_RESET_ALL: u32 = 0b11;

/// One of the two hardware double-buffer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoChannel {
    /// Channel 0
    Fifo0,
    /// Channel 1
    Fifo1,
}

impl FifoChannel {
    /// The channel's one-hot bit in `fifo_ctl` / `fifo_select`.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Fifo0 => 0b01,
            Self::Fifo1 => 0b10,
        }
    }

    /// The other channel.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Fifo0 => Self::Fifo1,
            Self::Fifo1 => Self::Fifo0,
        }
    }

    /// Channel index, 0 or 1.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Fifo0 => 0,
            Self::Fifo1 => 1,
        }
    }
}

impl std::fmt::Display for FifoChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fifo{}", self.index())
    }
}

/// Byte offsets of the BC_EMU registers inside BAR0, from the config file.
#[derive(Debug, Clone, Copy)]
pub struct RegisterOffsets {
    /// Identity register (read-only, must equal [`BC_EMU_RTL_ID`])
    pub rtl_id: usize,
    /// Channel 0 data register (write-only, one word per write)
    pub fifo0: usize,
    /// Channel 1 data register (write-only, one word per write)
    pub fifo1: usize,
    /// FIFO reset bitmask; self-clears to 0 when the reset completes
    pub fifo_ctl: usize,
    /// Channel switch request; echoes the active mask once switched
    pub fifo_select: usize,
    /// 0 = one-shot, 1 = continuous passes
    pub cont_mode: usize,
    /// Pass count for one-shot mode
    pub nshot_limit: usize,
}

impl RegisterOffsets {
    fn all(&self) -> [(&'static str, usize); 7] {
        [
            ("reg_rtl_id", self.rtl_id),
            ("reg_fifo0", self.fifo0),
            ("reg_fifo1", self.fifo1),
            ("reg_fifo_ctl", self.fifo_ctl),
            ("reg_fifo_select", self.fifo_select),
            ("reg_cont_mode", self.cont_mode),
            ("reg_nshot_limit", self.nshot_limit),
        ]
    }
}

/// The register contract the feeder engine consumes.
///
/// Implemented by [`RegisterMap`] over a mapped BAR, and by scripted mocks
/// in the engine tests.
pub trait EmuRegisters {
    /// Read the identity register.
    fn rtl_id(&self) -> u32;

    /// Push one word into a channel's data register. Push order is
    /// preserved by hardware.
    fn push_word(&mut self, channel: FifoChannel, word: u32);

    /// Write a reset bitmask to `fifo_ctl`.
    fn write_fifo_ctl(&mut self, mask: u32);

    /// Read `fifo_ctl`; 0 once the requested resets have completed.
    fn read_fifo_ctl(&self) -> u32;

    /// Request a channel switch by one-hot mask (0 deactivates both).
    fn write_fifo_select(&mut self, mask: u32);

    /// Read back the active channel mask, or 0 when none is active.
    fn read_fifo_select(&self) -> u32;

    /// Set continuous (1) or one-shot (0) mode.
    fn set_cont_mode(&mut self, value: u32);

    /// Set the pass count for one-shot mode.
    fn set_nshot_limit(&mut self, value: u32);
}

/// Named register accessors over a mapped BAR.
#[derive(Debug)]
pub struct RegisterMap {
    bar: BarRegion,
    offsets: RegisterOffsets,
}

impl RegisterMap {
    /// Bind register offsets to a mapped BAR.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Config` if any offset does not fit inside the
    /// mapped region.
    pub fn bind(bar: BarRegion, offsets: RegisterOffsets) -> Result<Self> {
        for (name, offset) in offsets.all() {
            if offset % 4 != 0 {
                return Err(FeederError::config(format!(
                    "{name} offset {offset:#x} is not 4-byte aligned"
                )));
            }
            if offset + 4 > bar.size() {
                return Err(FeederError::config(format!(
                    "{name} offset {offset:#x} is outside the {:#x}-byte BAR",
                    bar.size()
                )));
            }
        }

        tracing::debug!("Bound BC_EMU register map on {}", bar.pcie_address());
        Ok(Self { bar, offsets })
    }
}

impl EmuRegisters for RegisterMap {
    fn rtl_id(&self) -> u32 {
        self.bar.read32(self.offsets.rtl_id)
    }

    fn push_word(&mut self, channel: FifoChannel, word: u32) {
        let offset = match channel {
            FifoChannel::Fifo0 => self.offsets.fifo0,
            FifoChannel::Fifo1 => self.offsets.fifo1,
        };
        self.bar.write32(offset, word);
    }

    fn write_fifo_ctl(&mut self, mask: u32) {
        self.bar.write32(self.offsets.fifo_ctl, mask);
    }

    fn read_fifo_ctl(&self) -> u32 {
        self.bar.read32(self.offsets.fifo_ctl)
    }

    fn write_fifo_select(&mut self, mask: u32) {
        self.bar.write32(self.offsets.fifo_select, mask);
    }

    fn read_fifo_select(&self) -> u32 {
        self.bar.read32(self.offsets.fifo_select)
    }

    fn set_cont_mode(&mut self, value: u32) {
        self.bar.write32(self.offsets.cont_mode, value);
    }

    fn set_nshot_limit(&mut self, value: u32) {
        self.bar.write32(self.offsets.nshot_limit, value);
    }
}
