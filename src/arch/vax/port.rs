use log::trace;
use parse_display::Display;

use crate::memory::{ DataSize, IMemory, MemResult, MmuEvent, MmuState, VA };

// ------------------------------------------------------------------------------------------------
// PortStats
// ------------------------------------------------------------------------------------------------

/// How many requests of each kind went through the port.
#[derive(Debug, Display, Default, PartialEq, Eq, Copy, Clone)]
#[display("istream: {istream}, reads: {reads}, writes: {writes}")]
pub struct PortStats {
	/// Instruction stream reads: opcodes, specifiers, displacements, immediates.
	pub istream: usize,
	/// Operand reads, including deferred address fetches.
	pub reads:   usize,
	/// Operand writes.
	pub writes:  usize,
}

impl PortStats {
	/// Total requests of all kinds.
	pub fn total(&self) -> usize {
		self.istream + self.reads + self.writes
	}
}

// ------------------------------------------------------------------------------------------------
// MemoryPort
// ------------------------------------------------------------------------------------------------

/// The CPU's single memory port. Every request is one synchronous call to the memory
/// collaborator; the port just labels and counts them.
pub struct MemoryPort<M: IMemory> {
	mem:   M,
	stats: PortStats,
}

impl<M: IMemory> MemoryPort<M> {
	pub fn new(mem: M) -> Self {
		Self { mem, stats: PortStats::default() }
	}

	/// Instruction stream read.
	pub fn fetch(&mut self, addr: VA, size: DataSize, mmu: &MmuState) -> MemResult<u64> {
		self.stats.istream += 1;
		let val = self.mem.read(addr, size, mmu)?;
		trace!("port: istream {} {} = 0x{:X}", size, addr, val);
		Ok(val)
	}

	/// Data read.
	pub fn read(&mut self, addr: VA, size: DataSize, mmu: &MmuState) -> MemResult<u64> {
		self.stats.reads += 1;
		let val = self.mem.read(addr, size, mmu)?;
		trace!("port: read {} {} = 0x{:X}", size, addr, val);
		Ok(val)
	}

	/// Data write.
	pub fn write(&mut self, addr: VA, size: DataSize, val: u64, mmu: &MmuState) -> MemResult<()> {
		self.stats.writes += 1;
		trace!("port: write {} {} <- 0x{:X}", size, addr, size.trunc(val));
		self.mem.write(addr, size, size.trunc(val), mmu)
	}

	/// Passes a memory-management event along to the collaborator.
	pub fn notify(&mut self, event: MmuEvent, mmu: &MmuState) {
		trace!("port: mmu event: {}", event);
		self.mem.mmu_event(event, mmu);
	}

	/// Request counts so far.
	pub fn stats(&self) -> PortStats {
		self.stats
	}

	/// The memory collaborator.
	pub fn mem(&self) -> &M {
		&self.mem
	}

	/// The memory collaborator, mutably.
	pub fn mem_mut(&mut self) -> &mut M {
		&mut self.mem
	}
}
