//! Driver for the BC_EMU hardware test-pattern generator.
//!
//! Streams pre-recorded 32-bit frame data into the BC_EMU's double-buffered
//! FIFOs over a memory-mapped PCI register interface. Synchronization is
//! purely register polling — the hardware raises no interrupts.
//!
//! # Quick start
//!
//! ```no_run
//! use bce_driver::{
//!     discovery, frames, BarRegion, Config, FeederOptions, FrameFeeder, RegisterMap,
//! };
//! use std::path::Path;
//!
//! # fn main() -> bce_driver::Result<()> {
//! let config = Config::load(Path::new("bce_feeder.conf"))?;
//!
//! let paths = frames::resolve_inputs(&config.data_files, None)?;
//! let frame_set = frames::load_all(&paths)?;
//!
//! let id = discovery::PciId::parse(&config.pci_device)?;
//! let address = discovery::find_device(id)?;
//! discovery::ensure_enabled(&address)?;
//!
//! let bar = BarRegion::map(&address, 0)?;
//! let regs = RegisterMap::bind(bar, config.offsets)?;
//!
//! let options = FeederOptions {
//!     repeat_factor: config.repeat_factor,
//!     ..FeederOptions::default()
//! };
//! FrameFeeder::new(regs, frame_set, options)?.run()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod discovery;
mod error;
pub mod feeder;
pub mod frames;
pub mod mmio;
pub mod regs;
pub mod sequence;

pub use config::{Config, DEFAULT_CONFIG_FILE};
pub use error::{FeederError, Result};
pub use feeder::{FeederOptions, FeederState, FrameFeeder};
pub use frames::{Frame, FrameSet};
pub use mmio::BarRegion;
pub use regs::{EmuRegisters, FifoChannel, RegisterMap, RegisterOffsets, BC_EMU_RTL_ID};
pub use sequence::SequencePolicy;
