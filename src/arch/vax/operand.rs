use log::trace;

use crate::arch::{ CpuResult, DisasErrorKind, FaultKind };
use crate::memory::{ DataSize, IMemory, VA };
use super::{ Access, MemoryPort, OpSpec, ProcessorState, PC };

// ------------------------------------------------------------------------------------------------
// IStream
// ------------------------------------------------------------------------------------------------

/// A cursor over instruction-stream bytes. Implemented over a byte slice for the disassembler
/// and over the processor's memory port for the pipeline.
pub trait IStream {
	type Error: From<FaultKind>;

	/// Address of the next unconsumed byte.
	fn pos(&self) -> VA;

	/// Consumes a little-endian value of the given size.
	fn next_sized(&mut self, size: DataSize) -> Result<u64, Self::Error>;

	/// Consumes one byte.
	fn next_u8(&mut self) -> Result<u8, Self::Error> {
		Ok(self.next_sized(DataSize::Byte)? as u8)
	}
}

/// Reads the instruction stream out of a byte slice which starts at `va`.
#[derive(Debug, Clone)]
pub struct SliceStream<'a> {
	img:  &'a [u8],
	va:   VA,
	offs: usize,
}

impl<'a> SliceStream<'a> {
	pub fn new(img: &'a [u8], va: VA) -> Self {
		Self { img, va, offs: 0 }
	}

	/// How many bytes have been consumed.
	pub fn offs(&self) -> usize {
		self.offs
	}

	/// Skips bytes (e.g. the opcode, which is decoded separately).
	pub fn skip(&mut self, n: usize) {
		self.offs += n;
	}
}

impl IStream for SliceStream<'_> {
	type Error = DisasErrorKind;

	fn pos(&self) -> VA {
		self.va + self.offs
	}

	fn next_sized(&mut self, size: DataSize) -> Result<u64, DisasErrorKind> {
		let n = size.bytes();

		match self.img.get(self.offs .. self.offs + n) {
			Some(bytes) => {
				self.offs += n;
				Ok(bytes.iter().take(8).rev().fold(0u64, |acc, &b| (acc << 8) | b as u64))
			}
			None => Err(DisasErrorKind::OutOfBytes { offs: self.offs }),
		}
	}
}

/// Reads the instruction stream through the memory port at PC, advancing PC as it goes.
pub(super) struct CpuStream<'a, M: IMemory> {
	pub state: &'a mut ProcessorState,
	pub port:  &'a mut MemoryPort<M>,
}

impl<M: IMemory> IStream for CpuStream<'_, M> {
	type Error = FaultKind;

	fn pos(&self) -> VA {
		self.state.pc()
	}

	fn next_sized(&mut self, size: DataSize) -> CpuResult<u64> {
		let pc = self.state.pc();
		let val = self.port.fetch(pc, size, &self.state.mmu_state())?;
		self.state.advance_pc(size.bytes());
		Ok(val)
	}
}

// ------------------------------------------------------------------------------------------------
// Specifier
// ------------------------------------------------------------------------------------------------

/// The syntactic form of an operand specifier, after its bytes have been consumed but before
/// any registers or memory have been looked at.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SpecMode {
	/// Short literal, 0..=63.
	Literal(u8),
	/// `Rn`
	Register(u8),
	/// `(Rn)`
	RegDeferred(u8),
	/// `-(Rn)`
	AutoDec(u8),
	/// `(Rn)+`
	AutoInc(u8),
	/// `@(Rn)+`
	AutoIncDeferred(u8),
	/// `disp(Rn)` or `@disp(Rn)`. With PC it's relative to the end of the specifier.
	Disp { reg: u8, disp: i32, width: DataSize, deferred: bool },
	/// `I^#val`: autoincrement on PC. `addr` is where the constant sits in the stream.
	Immediate { val: u64, addr: VA },
	/// `@#addr`: autoincrement deferred on PC.
	Absolute(VA),
	/// Branch displacement, already turned into its target.
	Branch(VA),
}

/// One parsed operand specifier.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Specifier {
	/// The base mode.
	pub mode:  SpecMode,
	/// `[Rx]` index register, if indexed.
	pub index: Option<u8>,
	/// Address just past the specifier's last byte.
	pub end:   VA,
}

impl Specifier {
	/// For PC-relative and branch specifiers, the address they refer to.
	pub fn pc_target(&self) -> Option<VA> {
		match self.mode {
			SpecMode::Disp { reg: PC, disp, .. } => Some(self.end + disp),
			SpecMode::Branch(target) => Some(target),
			_ => None,
		}
	}
}

/// Consumes one operand specifier from `s`, checking its mode against how the operand is used.
pub fn parse_specifier<S: IStream>(s: &mut S, spec: OpSpec) -> Result<Specifier, S::Error> {
	if spec.access == Access::Branch {
		let disp = spec.size.sext(s.next_sized(spec.size)?);
		let target = s.pos() + disp as i32;
		return Ok(Specifier { mode: SpecMode::Branch(target), index: None, end: s.pos() });
	}

	let b = s.next_u8()?;

	if b >> 4 == 4 {
		let index = b & 0xF;

		if index == PC {
			return Err(FaultKind::ReservedAddressingMode.into());
		}

		let base = s.next_u8()?;

		if base >> 4 == 4 {
			return Err(FaultKind::ReservedAddressingMode.into());
		}

		let mode = parse_mode(s, base, spec)?;
		check_indexed_base(mode, index)?;
		check_access(mode, spec)?;
		Ok(Specifier { mode, index: Some(index), end: s.pos() })
	} else {
		let mode = parse_mode(s, b, spec)?;
		check_access(mode, spec)?;
		Ok(Specifier { mode, index: None, end: s.pos() })
	}
}

fn parse_mode<S: IStream>(s: &mut S, b: u8, spec: OpSpec) -> Result<SpecMode, S::Error> {
	use SpecMode::*;

	let reg = b & 0xF;

	Ok(match b >> 4 {
		0 ..= 3 => Literal(b & 0x3F),
		5 | 6 | 7 if reg == PC => return Err(FaultKind::ReservedAddressingMode.into()),
		5 => Register(reg),
		6 => RegDeferred(reg),
		7 => AutoDec(reg),
		8 if reg == PC => {
			let addr = s.pos();
			let val = s.next_sized(spec.size)?;
			Immediate { val, addr }
		}
		8 => AutoInc(reg),
		9 if reg == PC => Absolute(VA(s.next_sized(DataSize::Long)? as u32)),
		9 => AutoIncDeferred(reg),
		mode => {
			let (width, deferred) = match mode {
				0xA => (DataSize::Byte, false),
				0xB => (DataSize::Byte, true),
				0xC => (DataSize::Word, false),
				0xD => (DataSize::Word, true),
				0xE => (DataSize::Long, false),
				0xF => (DataSize::Long, true),
				// index mode is handled by the caller.
				_ => return Err(FaultKind::ReservedAddressingMode.into()),
			};

			let disp = width.sext(s.next_sized(width)?) as i32;
			Disp { reg, disp, width, deferred }
		}
	})
}

/// Index mode needs a base that names memory, and the base can't touch the index register.
fn check_indexed_base(mode: SpecMode, index: u8) -> CpuResult<()> {
	use SpecMode::*;

	match mode {
		Literal(..) | Register(..) | Immediate { .. } | Branch(..) =>
			Err(FaultKind::ReservedAddressingMode),
		AutoDec(r) | AutoInc(r) | AutoIncDeferred(r) if r == index =>
			Err(FaultKind::ReservedAddressingMode),
		_ => Ok(()),
	}
}

/// Some modes make no sense for some kinds of access.
fn check_access(mode: SpecMode, spec: OpSpec) -> CpuResult<()> {
	use SpecMode::*;

	let ok = match mode {
		Literal(..) => spec.access == Access::Read,
		Register(r) => {
			// multi-longword operands need consecutive registers below PC.
			let regs = (spec.size.bytes() + 3) / 4;
			spec.access != Access::Addr && (r as usize) + regs <= PC as usize
		}
		Immediate { .. } => !spec.access.writes(),
		_ => true,
	};

	if ok { Ok(()) } else { Err(FaultKind::ReservedAddressingMode) }
}

// ------------------------------------------------------------------------------------------------
// Operand
// ------------------------------------------------------------------------------------------------

/// Where an operand lives once its specifier has been evaluated.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Operand {
	Register(u8),
	Memory(VA),
	/// Literals, immediates and branch targets.
	Immediate(u64),
}

/// An operand whose location is known, and whose value has been read if it's used as a source.
/// Only meaningful during the instruction that produced it.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ResolvedOperand {
	pub operand: Operand,
	pub spec:    OpSpec,
	/// For read and modify operands, the value read; for address operands, the address.
	pub value:   Option<u64>,
}

impl ResolvedOperand {
	/// The operand's value, or 0 if it didn't have one.
	pub fn val(&self) -> u64 {
		self.value.unwrap_or(0)
	}

	/// The operand's memory address, if it has one.
	pub fn address(&self) -> Option<VA> {
		match self.operand {
			Operand::Memory(a) => Some(a),
			_ => None,
		}
	}

	/// (Re)reads the operand's value from its location.
	pub fn read<M: IMemory>(&self, state: &ProcessorState, port: &mut MemoryPort<M>)
	-> CpuResult<u64> {
		let size = self.spec.size;

		if size == DataSize::Octa {
			return Err(FaultKind::Unimplemented);
		}

		match self.operand {
			Operand::Register(r)  => Ok(state.reg_sized(r, size)),
			Operand::Memory(a)    => Ok(port.read(a, size, &state.mmu_state())?),
			Operand::Immediate(v) => Ok(size.trunc(v)),
		}
	}

	/// Stores `val` to the operand's location.
	pub fn write<M: IMemory>(&self, state: &mut ProcessorState, port: &mut MemoryPort<M>, val: u64)
	-> CpuResult<()> {
		let size = self.spec.size;

		if size == DataSize::Octa {
			return Err(FaultKind::Unimplemented);
		}

		match self.operand {
			Operand::Register(r)  => state.set_reg_sized(r, size, val),
			Operand::Memory(a)    => port.write(a, size, val, &state.mmu_state())?,
			Operand::Immediate(_) => return Err(FaultKind::ReservedAddressingMode),
		}

		Ok(())
	}
}

/// Consumes and evaluates one operand specifier at PC: applies autoincrement/autodecrement side
/// effects, follows deferred addresses, and, if `read_value` is set and the operand is a source,
/// reads its value. Also returns the specifier as parsed, for logging.
pub(super) fn resolve_operand<M: IMemory>(
	state:      &mut ProcessorState,
	port:       &mut MemoryPort<M>,
	spec:       OpSpec,
	read_value: bool,
) -> CpuResult<(Specifier, ResolvedOperand)> {
	let sp = parse_specifier(&mut CpuStream { state: &mut *state, port: &mut *port }, spec)?;
	let operand = locate(state, port, &sp, spec)?;

	let value = match (spec.access, operand) {
		(Access::Addr, _) => operand_address(operand),
		(Access::Branch, Operand::Immediate(target)) => Some(target),
		_ if read_value && spec.access.reads() => {
			let r = ResolvedOperand { operand, spec, value: None };
			Some(r.read(state, port)?)
		}
		_ => None,
	};

	trace!("resolve: {:?} -> {:?} = {:?}", sp.mode, operand, value);
	Ok((sp, ResolvedOperand { operand, spec, value }))
}

fn operand_address(operand: Operand) -> Option<u64> {
	match operand {
		Operand::Memory(a) => Some(a.0 as u64),
		_ => None,
	}
}

/// Works out where a parsed specifier points, applying register side effects.
fn locate<M: IMemory>(
	state: &mut ProcessorState,
	port:  &mut MemoryPort<M>,
	sp:    &Specifier,
	spec:  OpSpec,
) -> CpuResult<Operand> {
	use SpecMode::*;

	let n = spec.size.bytes() as u32;

	let base = match sp.mode {
		Literal(v) => return Ok(Operand::Immediate(v as u64)),
		Register(r) => return Ok(Operand::Register(r)),
		Immediate { val, addr } => {
			// address-type access to an immediate means the constant in the stream.
			return Ok(match spec.access {
				Access::Addr | Access::Field => Operand::Memory(addr),
				_ => Operand::Immediate(val),
			});
		}
		Branch(target) => return Ok(Operand::Immediate(target.0 as u64)),

		RegDeferred(r) => VA(state.reg(r)),
		AutoDec(r) => {
			let addr = state.reg(r).wrapping_sub(n);
			state.set_reg(r, addr);
			VA(addr)
		}
		AutoInc(r) => {
			let addr = state.reg(r);
			state.set_reg(r, addr.wrapping_add(n));
			VA(addr)
		}
		AutoIncDeferred(r) => {
			let ptr = state.reg(r);
			let addr = port.read(VA(ptr), DataSize::Long, &state.mmu_state())?;
			state.set_reg(r, ptr.wrapping_add(4));
			VA(addr as u32)
		}
		Disp { reg, disp, deferred, .. } => {
			let base = if reg == PC { sp.end } else { VA(state.reg(reg)) };
			let ea = base + disp;

			if deferred {
				VA(port.read(ea, DataSize::Long, &state.mmu_state())? as u32)
			} else {
				ea
			}
		}
		Absolute(addr) => addr,
	};

	Ok(Operand::Memory(match sp.index {
		Some(x) => base + state.reg(x).wrapping_mul(n),
		None    => base,
	}))
}
