//! The CPU's view of memory: addresses, access widths, and the memory collaborator interface.
//!
//! Everything past the `IMemory` trait (address translation, caches, device controllers) is
//! somebody else's problem. The core only ever issues one synchronous request at a time.

use std::error::Error;

use parse_display::Display;

use crate::arch::vax::AccessMode;

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

mod bus;
mod va;

#[cfg(test)]
mod tests;

pub use bus::*;
pub use va::*;

// ------------------------------------------------------------------------------------------------
// DataSize
// ------------------------------------------------------------------------------------------------

/// The natural width of an operand or memory access.
#[derive(Debug, Display, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum DataSize {
	#[display("byte")] Byte,
	#[display("word")] Word,
	#[display("long")] Long,
	#[display("quad")] Quad,
	#[display("octa")] Octa,
}

impl DataSize {
	/// How many bytes this takes up in memory.
	pub const fn bytes(self) -> usize {
		match self {
			DataSize::Byte => 1,
			DataSize::Word => 2,
			DataSize::Long => 4,
			DataSize::Quad => 8,
			DataSize::Octa => 16,
		}
	}

	/// How many bits of a `u64` value are significant. Octawords only carry their low quad.
	pub const fn bits(self) -> u32 {
		match self {
			DataSize::Byte => 8,
			DataSize::Word => 16,
			DataSize::Long => 32,
			DataSize::Quad | DataSize::Octa => 64,
		}
	}

	/// Mask of the significant bits.
	pub const fn mask(self) -> u64 {
		match self.bits() {
			64 => u64::MAX,
			n  => (1u64 << n) - 1,
		}
	}

	/// The sign bit.
	pub const fn sign_bit(self) -> u64 {
		1u64 << (self.bits() - 1)
	}

	/// Sign-extends the low `bits()` bits of `val` to 64 bits.
	pub const fn sext(self, val: u64) -> i64 {
		let sh = 64 - self.bits();
		((val << sh) as i64) >> sh
	}

	/// Truncates `val` to this size.
	pub const fn trunc(self, val: u64) -> u64 {
		val & self.mask()
	}
}

// ------------------------------------------------------------------------------------------------
// MmuState
// ------------------------------------------------------------------------------------------------

/// The slice of processor state the MMU needs to translate and check an access.
/// Handed (read-only) to the memory collaborator with every request.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct MmuState {
	/// The access mode the request is made in.
	pub mode:  AccessMode,
	/// Whether memory management is enabled.
	pub mapen: bool,
	pub p0br:  u32,
	pub p0lr:  u32,
	pub p1br:  u32,
	pub p1lr:  u32,
	pub sbr:   u32,
	pub slr:   u32,
}

/// Memory-management events the core tells the memory collaborator about.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum MmuEvent {
	/// One of the base/length registers, or MAPEN, was written.
	#[display("mapping changed")]
	MappingChanged,
	/// Throw away the whole translation buffer.
	#[display("invalidate all")]
	InvalidateAll,
	/// Throw away the translation for one address.
	#[display("invalidate {0}")]
	InvalidateSingle(VA),
}

// ------------------------------------------------------------------------------------------------
// MemFault
// ------------------------------------------------------------------------------------------------

/// Which way a memory access was going.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum MemAccess {
	#[display("read")]  Read,
	#[display("write")] Write,
}

/// The kinds of memory faults the collaborator can report.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum MemFaultKind {
	/// Translation found an invalid page table entry.
	#[display("translation not valid")]
	PageNotValid,
	/// The access mode isn't allowed to touch this page.
	#[display("access control violation")]
	AccessViolation,
	/// Nothing answers at this address.
	#[display("non-existent memory")]
	NonExistent,
}

/// A memory fault, as reported by the memory collaborator. The core passes these along verbatim.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
#[display("{kind} on {access} of {addr}")]
pub struct MemFault {
	pub kind:   MemFaultKind,
	pub addr:   VA,
	pub access: MemAccess,
}

impl Error for MemFault {}

impl MemFault {
	/// Shorthand constructors.
	pub fn non_existent(addr: VA, access: MemAccess) -> Self {
		Self { kind: MemFaultKind::NonExistent, addr, access }
	}

	/// Ditto.
	pub fn access_violation(addr: VA, access: MemAccess) -> Self {
		Self { kind: MemFaultKind::AccessViolation, addr, access }
	}

	/// Ditto.
	pub fn page_not_valid(addr: VA, access: MemAccess) -> Self {
		Self { kind: MemFaultKind::PageNotValid, addr, access }
	}
}

/// Alias for a `Result` with a `MemFault` as its error type.
pub type MemResult<T> = Result<T, MemFault>;

// ------------------------------------------------------------------------------------------------
// IMemory
// ------------------------------------------------------------------------------------------------

/// The memory/MMU collaborator. Addresses may be virtual (the collaborator translates them) or
/// physical; values are little-endian, and only the low `size.bits()` bits are meaningful.
pub trait IMemory {
	/// Read a value of the given size.
	fn read(&mut self, addr: VA, size: DataSize, mmu: &MmuState) -> MemResult<u64>;

	/// Write a value of the given size.
	fn write(&mut self, addr: VA, size: DataSize, val: u64, mmu: &MmuState) -> MemResult<()>;

	// --------------------------------------------------------------------------------------------
	// Provided methods

	/// Called after a memory-management register changes.
	fn mmu_event(&mut self, _event: MmuEvent, _mmu: &MmuState) {}
}
