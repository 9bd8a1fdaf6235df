use std::fmt::{ Debug, Formatter, Result as FmtResult };

use parse_display::Display;
use delegate::delegate;

use crate::arch::vax::AccessMode;
use crate::memory::{ DataSize, IMemory, MemAccess, MemFault, MemResult, MmuState, VA };

// ------------------------------------------------------------------------------------------------
// Ram
// ------------------------------------------------------------------------------------------------

/// Plain little-endian RAM starting at address 0.
pub struct Ram {
	data: Vec<u8>,
}

#[allow(clippy::len_without_is_empty)]
impl Ram {
	/// Makes `size` bytes of zeroed RAM.
	pub fn new(size: usize) -> Self {
		Self { data: vec![0; size] }
	}

	/// How many bytes of RAM there are.
	pub fn len(&self) -> usize {
		self.data.len()
	}

	/// Copies `bytes` into RAM starting at `addr`.
	pub fn load(&mut self, addr: VA, bytes: &[u8]) -> MemResult<()> {
		let range = self.range(addr, bytes.len(), MemAccess::Write)?;
		self.data[range].copy_from_slice(bytes);
		Ok(())
	}

	/// Read-only view of the bytes at `addr`.
	pub fn slice(&self, addr: VA, len: usize) -> MemResult<&[u8]> {
		let range = self.range(addr, len, MemAccess::Read)?;
		Ok(&self.data[range])
	}

	fn range(&self, addr: VA, len: usize, access: MemAccess) -> MemResult<std::ops::Range<usize>> {
		let start = addr.0 as usize;

		match start.checked_add(len) {
			Some(end) if end <= self.data.len() => Ok(start .. end),
			_ => Err(MemFault::non_existent(addr, access)),
		}
	}

	fn read(&self, addr: VA, size: DataSize) -> MemResult<u64> {
		let n = size.bytes().min(8);
		let range = self.range(addr, size.bytes(), MemAccess::Read)?;
		let bytes = &self.data[range];

		Ok(bytes[.. n].iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64))
	}

	fn write(&mut self, addr: VA, size: DataSize, val: u64) -> MemResult<()> {
		let range = self.range(addr, size.bytes(), MemAccess::Write)?;

		for (i, b) in self.data[range].iter_mut().enumerate() {
			*b = if i < 8 { (val >> (i * 8)) as u8 } else { 0 };
		}

		Ok(())
	}
}

// ------------------------------------------------------------------------------------------------
// IDevice
// ------------------------------------------------------------------------------------------------

/// Something with memory-mapped registers. From the CPU's point of view a device is just a
/// range of addresses whose reads and writes go somewhere other than RAM.
pub trait IDevice {
	/// Human-readable name.
	fn name(&self) -> &str;

	/// Read a register at `offs` bytes from the start of the device's range.
	fn read_reg(&mut self, offs: u32, size: DataSize) -> u64;

	/// Write a register at `offs` bytes from the start of the device's range.
	fn write_reg(&mut self, offs: u32, size: DataSize, val: u64);
}

/// A device that's nothing but a block of storage. Handy as a stand-in for real controllers.
pub struct RegisterBlock {
	name: String,
	regs: Ram,
}

impl RegisterBlock {
	pub fn new(name: &str, size: usize) -> Self {
		Self { name: name.into(), regs: Ram::new(size) }
	}
}

impl IDevice for RegisterBlock {
	fn name(&self) -> &str {
		&self.name
	}

	fn read_reg(&mut self, offs: u32, size: DataSize) -> u64 {
		self.regs.read(VA(offs), size).unwrap_or(0)
	}

	fn write_reg(&mut self, offs: u32, size: DataSize, val: u64) {
		if self.regs.write(VA(offs), size, val).is_err() {
			log::warn!("{}: write past end of register block at +0x{:X}", self.name, offs);
		}
	}
}

// ------------------------------------------------------------------------------------------------
// Bus
// ------------------------------------------------------------------------------------------------

/// One device's slice of the address space.
#[derive(Display)]
#[display("{name} [{base} .. {end})")]
pub struct DeviceRegion {
	/// Human-readable name.
	pub name:        String,
	/// Address of first register.
	pub base:        VA,
	/// Address of first byte *after* this region.
	pub end:         VA,
	/// Whether only kernel mode may touch it.
	pub kernel_only: bool,
}

impl DeviceRegion {
	fn contains(&self, addr: VA, size: DataSize) -> bool {
		addr >= self.base && (addr.0 as u64 + size.bytes() as u64) <= self.end.0 as u64
	}
}

/// The reference memory collaborator: RAM at the bottom of the address space, plus any number of
/// memory-mapped devices. Addresses are used as-is; there is no translation here.
pub struct Bus {
	ram:     Ram,
	regions: Vec<DeviceRegion>,
	devices: Vec<Box<dyn IDevice>>,
}

impl Bus {
	/// A bus with `ram_size` bytes of RAM and no devices.
	pub fn new(ram_size: usize) -> Self {
		Self { ram: Ram::new(ram_size), regions: Vec::new(), devices: Vec::new() }
	}

	/// Maps `dev` at `[base, base + len)`.
	///
	/// # Panics
	///
	/// - if the range overlaps RAM or another device.
	pub fn map_device(&mut self, base: VA, len: u32, kernel_only: bool, dev: Box<dyn IDevice>) {
		let end = base + len;
		assert!(base.0 as usize >= self.ram.len(), "device {} overlaps RAM", dev.name());
		assert!(self.regions.iter().all(|r| end <= r.base || r.end <= base),
			"device {} overlaps another device", dev.name());

		let region = DeviceRegion { name: dev.name().into(), base, end, kernel_only };
		log::debug!("mapped device {}", region);
		self.regions.push(region);
		self.devices.push(dev);
	}

	/// All mapped device regions.
	pub fn regions(&self) -> impl Iterator<Item = &DeviceRegion> {
		self.regions.iter()
	}

	delegate! {
		to self.ram {
			/// Copies `bytes` into RAM starting at `addr`.
			pub fn load(&mut self, addr: VA, bytes: &[u8]) -> MemResult<()>;
			/// Read-only view of RAM.
			pub fn slice(&self, addr: VA, len: usize) -> MemResult<&[u8]>;
			/// How much RAM there is.
			#[call(len)]
			pub fn ram_size(&self) -> usize;
		}
	}

	fn device_for(&self, addr: VA, size: DataSize, mmu: &MmuState, access: MemAccess)
	-> MemResult<Option<usize>> {
		match self.regions.iter().position(|r| r.contains(addr, size)) {
			Some(i) if self.regions[i].kernel_only && mmu.mode != AccessMode::Kernel =>
				Err(MemFault::access_violation(addr, access)),
			found => Ok(found),
		}
	}
}

impl IMemory for Bus {
	fn read(&mut self, addr: VA, size: DataSize, mmu: &MmuState) -> MemResult<u64> {
		if (addr.0 as usize) < self.ram.len() {
			return self.ram.read(addr, size);
		}

		match self.device_for(addr, size, mmu, MemAccess::Read)? {
			Some(i) => {
				let offs = addr - self.regions[i].base;
				let val = self.devices[i].read_reg(offs, size);
				log::trace!("{} read +0x{:X} = 0x{:X}", self.regions[i].name, offs, val);
				Ok(size.trunc(val))
			}
			None => Err(MemFault::non_existent(addr, MemAccess::Read)),
		}
	}

	fn write(&mut self, addr: VA, size: DataSize, val: u64, mmu: &MmuState) -> MemResult<()> {
		if (addr.0 as usize) < self.ram.len() {
			return self.ram.write(addr, size, val);
		}

		match self.device_for(addr, size, mmu, MemAccess::Write)? {
			Some(i) => {
				let offs = addr - self.regions[i].base;
				log::trace!("{} write +0x{:X} = 0x{:X}", self.regions[i].name, offs, val);
				self.devices[i].write_reg(offs, size, size.trunc(val));
				Ok(())
			}
			None => Err(MemFault::non_existent(addr, MemAccess::Write)),
		}
	}
}

impl Debug for Bus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Bus {{ ram: {} bytes", self.ram.len())?;

		for r in &self.regions {
			write!(f, ", {}", r)?;
		}

		write!(f, " }}")
	}
}
