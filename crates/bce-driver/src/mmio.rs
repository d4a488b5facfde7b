//! Memory-mapped PCI BAR access
//!
//! Maps a BAR through the sysfs `resourceN` file and exposes volatile
//! 32-bit register accessors. Offsets are validated once by the register
//! map at bind time, so the accessors here assert rather than return
//! errors: an out-of-range access is a bug, not a runtime condition.

use crate::error::{FeederError, Result};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::ptr::NonNull;

/// One memory-mapped PCI BAR region.
pub struct BarRegion {
    ptr: NonNull<u8>,
    size: usize,
    _file: File,
    pcie_address: String,
    bar_index: usize,
}

impl std::fmt::Debug for BarRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarRegion")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("size", &self.size)
            .field("pcie_address", &self.pcie_address)
            .field("bar_index", &self.bar_index)
            .finish()
    }
}

impl BarRegion {
    /// Map a PCI BAR into the process address space.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Hardware` if the resource file cannot be
    /// opened, reports zero size (device not enabled), or mmap fails.
    pub fn map(pcie_address: &str, bar_index: usize) -> Result<Self> {
        let path = format!("/sys/bus/pci/devices/{pcie_address}/resource{bar_index}");

        tracing::debug!("Mapping PCI BAR: {path}");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                FeederError::hardware(format!("cannot open {path}: {e}. Is the device enabled?"))
            })?;

        // BAR sizes fit in usize on 64-bit, our only target
        #[allow(clippy::cast_possible_truncation)]
        let size = file
            .metadata()
            .map_err(|e| FeederError::hardware(format!("cannot stat {path}: {e}")))?
            .len() as usize;

        if size == 0 {
            return Err(FeederError::hardware(format!(
                "BAR{bar_index} of {pcie_address} has size 0 (device not enabled?)"
            )));
        }

        // SAFETY: mmap of a just-opened, non-zero-sized resource file.
        // PROT_READ|PROT_WRITE and MAP_SHARED are what MMIO requires; the
        // file is stored in the struct so the fd outlives the mapping, and
        // Drop unmaps exactly once with the same ptr/size.
        let ptr = unsafe {
            let addr = mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
            .map_err(|e| FeederError::hardware(format!("mmap of {path} failed: {e}")))?;

            NonNull::new(addr.cast::<u8>()).expect("rustix mmap returns non-null on success")
        };

        tracing::info!("Mapped BAR{bar_index} of {pcie_address}: {size:#x} bytes at {ptr:p}");

        Ok(Self {
            ptr,
            size,
            _file: file,
            pcie_address: pcie_address.to_string(),
            bar_index,
        })
    }

    /// Read a 32-bit register.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped size.
    #[must_use]
    pub fn read32(&self, offset: usize) -> u32 {
        assert!(offset + 4 <= self.size, "register offset out of bounds");
        // SAFETY: volatile read required for MMIO; bounds asserted above,
        // ptr valid for self.size from a successful mmap, registers are
        // 4-byte aligned by hardware.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile()
        }
    }

    /// Write a 32-bit register.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped size.
    pub fn write32(&mut self, offset: usize, value: u32) {
        assert!(offset + 4 <= self.size, "register offset out of bounds");
        // SAFETY: volatile write required for MMIO; bounds asserted above,
        // ptr valid for self.size from a successful mmap, registers are
        // 4-byte aligned by hardware.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value);
        }
    }

    /// Mapped size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// PCIe address of the mapped device.
    #[must_use]
    pub fn pcie_address(&self) -> &str {
        &self.pcie_address
    }
}

impl Drop for BarRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/size come from the successful mmap in map(), and
        // Drop runs at most once.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap of BAR{} failed: {e}", self.bar_index);
            }
        }
        tracing::debug!("Unmapped BAR{} of {}", self.bar_index, self.pcie_address);
    }
}

// SAFETY: BarRegion owns its mapping exclusively; moving it between
// threads does not invalidate the mapping and there is no thread-local
// state.
unsafe impl Send for BarRegion {}
