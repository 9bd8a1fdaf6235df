use bitflags::bitflags;
use parse_display::{ Display, FromStr };

use crate::arch::{ CpuResult, FaultKind };
use crate::memory::{ DataSize, MmuEvent, MmuState, VA };

// ------------------------------------------------------------------------------------------------
// Register names
// ------------------------------------------------------------------------------------------------

/// Argument pointer.
pub const AP: u8 = 12;
/// Frame pointer.
pub const FP: u8 = 13;
/// Stack pointer. Which physical register backs it depends on the access mode.
pub const SP: u8 = 14;
/// Program counter.
pub const PC: u8 = 15;

/// Assembler name of a general register.
pub fn reg_name(r: u8) -> &'static str {
	const NAMES: [&str; 16] = [
		"R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7",
		"R8", "R9", "R10", "R11", "AP", "FP", "SP", "PC",
	];

	NAMES[(r & 0xF) as usize]
}

// ------------------------------------------------------------------------------------------------
// Condition codes and PSW bits
// ------------------------------------------------------------------------------------------------

bitflags! {
	/// The four condition codes, in their PSL bit positions.
	#[derive(Default)]
	pub struct Cc: u8 {
		const C = 0b0001;
		const V = 0b0010;
		const Z = 0b0100;
		const N = 0b1000;
	}
}

impl Cc {
	/// N and Z computed from a result of the given size.
	pub fn nz(val: u64, size: DataSize) -> Cc {
		let mut cc = Cc::empty();
		cc.set(Cc::N, val & size.sign_bit() != 0);
		cc.set(Cc::Z, size.trunc(val) == 0);
		cc
	}
}

bitflags! {
	/// Trace and trap-enable bits of the PSW.
	#[derive(Default)]
	pub struct PswTraps: u8 {
		/// Trace.
		const T  = 0x10;
		/// Integer overflow trap enable.
		const IV = 0x20;
		/// Floating underflow trap enable.
		const FU = 0x40;
		/// Decimal overflow trap enable.
		const DV = 0x80;
	}
}

// ------------------------------------------------------------------------------------------------
// AccessMode
// ------------------------------------------------------------------------------------------------

/// The four access modes, most to least privileged.
#[derive(Debug, Display, FromStr, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
#[display(style = "lowercase")]
pub enum AccessMode {
	Kernel,
	Executive,
	Supervisor,
	User,
}

impl Default for AccessMode {
	fn default() -> AccessMode { AccessMode::Kernel }
}

impl AccessMode {
	/// From the two-bit PSL encoding.
	pub fn from_bits(bits: u32) -> AccessMode {
		match bits & 3 {
			0 => AccessMode::Kernel,
			1 => AccessMode::Executive,
			2 => AccessMode::Supervisor,
			_ => AccessMode::User,
		}
	}

	/// To the two-bit PSL encoding.
	pub fn bits(self) -> u32 {
		self as u32
	}

	/// The more privileged of the two.
	pub fn most_privileged(self, other: AccessMode) -> AccessMode {
		self.min(other)
	}
}

// ------------------------------------------------------------------------------------------------
// Psl
// ------------------------------------------------------------------------------------------------

/// Processor status longword, unpacked.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct Psl {
	pub cc:       Cc,
	pub traps:    PswTraps,
	/// Interrupt priority level, 0..=31.
	pub ipl:      u8,
	pub prv_mode: AccessMode,
	pub cur_mode: AccessMode,
	/// Running on the interrupt stack.
	pub is:       bool,
}

impl Psl {
	const IPL_SHIFT: u32 = 16;
	const PRV_SHIFT: u32 = 22;
	const CUR_SHIFT: u32 = 24;
	const IS_BIT:    u32 = 1 << 26;

	/// Packs into the architectural layout.
	pub fn to_u32(&self) -> u32 {
		self.psw() as u32
			| ((self.ipl as u32 & 0x1F) << Psl::IPL_SHIFT)
			| (self.prv_mode.bits() << Psl::PRV_SHIFT)
			| (self.cur_mode.bits() << Psl::CUR_SHIFT)
			| if self.is { Psl::IS_BIT } else { 0 }
	}

	/// Unpacks from the architectural layout. Bits this core doesn't model are dropped.
	pub fn from_u32(val: u32) -> Psl {
		Psl {
			cc:       Cc::from_bits_truncate(val as u8),
			traps:    PswTraps::from_bits_truncate(val as u8),
			ipl:      ((val >> Psl::IPL_SHIFT) & 0x1F) as u8,
			prv_mode: AccessMode::from_bits(val >> Psl::PRV_SHIFT),
			cur_mode: AccessMode::from_bits(val >> Psl::CUR_SHIFT),
			is:       val & Psl::IS_BIT != 0,
		}
	}

	/// The processor status word: the low 16 bits.
	pub fn psw(&self) -> u16 {
		(self.cc.bits() | self.traps.bits()) as u16
	}

	/// Replaces the low byte of the PSW (condition codes and trap enables).
	pub fn set_psw(&mut self, val: u8) {
		self.cc    = Cc::from_bits_truncate(val);
		self.traps = PswTraps::from_bits_truncate(val);
	}
}

// ------------------------------------------------------------------------------------------------
// PrivReg
// ------------------------------------------------------------------------------------------------

/// Internal processor registers reachable through `MTPR`/`MFPR`.
#[derive(Debug, Display, PartialEq, Eq, Hash, Copy, Clone)]
pub enum PrivReg {
	KSP    = 0,
	ESP    = 1,
	SSP    = 2,
	USP    = 3,
	ISP    = 4,
	P0BR   = 8,
	P0LR   = 9,
	P1BR   = 10,
	P1LR   = 11,
	SBR    = 12,
	SLR    = 13,
	PCBB   = 16,
	SCBB   = 17,
	IPL    = 18,
	ASTLVL = 19,
	SIRR   = 20,
	SISR   = 21,
	MAPEN  = 56,
	TBIA   = 57,
	TBIS   = 58,
	SID    = 62,
}

impl PrivReg {
	/// Looks up a register by its `MTPR`/`MFPR` number.
	pub fn from_index(idx: u32) -> Option<PrivReg> {
		use PrivReg::*;

		Some(match idx {
			0  => KSP,
			1  => ESP,
			2  => SSP,
			3  => USP,
			4  => ISP,
			8  => P0BR,
			9  => P0LR,
			10 => P1BR,
			11 => P1LR,
			12 => SBR,
			13 => SLR,
			16 => PCBB,
			17 => SCBB,
			18 => IPL,
			19 => ASTLVL,
			20 => SIRR,
			21 => SISR,
			56 => MAPEN,
			57 => TBIA,
			58 => TBIS,
			62 => SID,
			_  => return None,
		})
	}

	/// Whether writing this register changes how memory is mapped.
	pub fn is_mmu(self) -> bool {
		use PrivReg::*;
		matches!(self, P0BR | P0LR | P1BR | P1LR | SBR | SLR | MAPEN | TBIA | TBIS)
	}

	/// The stack pointer bank slot, if this is one of the stack pointers.
	fn stack_slot(self) -> Option<usize> {
		match self as u32 {
			n @ 0 ..= 4 => Some(n as usize),
			_ => None,
		}
	}
}

// ------------------------------------------------------------------------------------------------
// ProcessorState
// ------------------------------------------------------------------------------------------------

/// Value `MFPR` returns for `SID`.
pub const SYSTEM_ID: u32 = 0x0800_0000;

/// Everything architecturally visible about the processor. `Copy`, so the pipeline can take a
/// snapshot at the start of each instruction and put it back if the instruction faults.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ProcessorState {
	/// R0..R13. R14 lives in `stack`, R15 in `pc`.
	gpr:    [u32; 14],
	pc:     u32,
	/// KSP, ESP, SSP, USP, ISP.
	stack:  [u32; 5],
	psl:    Psl,
	p0br:   u32,
	p0lr:   u32,
	p1br:   u32,
	p1lr:   u32,
	sbr:    u32,
	slr:    u32,
	pcbb:   u32,
	scbb:   u32,
	astlvl: u32,
	sisr:   u16,
	mapen:  bool,
}

impl Default for ProcessorState {
	fn default() -> Self {
		Self::new()
	}
}

impl ProcessorState {
	/// Power-up state: everything zero, kernel mode, IPL 0, not on the interrupt stack.
	pub fn new() -> Self {
		Self {
			gpr:    [0; 14],
			pc:     0,
			stack:  [0; 5],
			psl:    Psl::default(),
			p0br:   0,
			p0lr:   0,
			p1br:   0,
			p1lr:   0,
			sbr:    0,
			slr:    0,
			pcbb:   0,
			scbb:   0,
			astlvl: 4,
			sisr:   0,
			mapen:  false,
		}
	}

	// --------------------------------------------------------------------------------------------
	// General registers

	/// Which stack pointer bank slot R14 currently refers to.
	fn stack_slot(&self) -> usize {
		if self.psl.is { 4 } else { self.psl.cur_mode as usize }
	}

	/// Reads R0..R15. R14 is the active stack pointer.
	pub fn reg(&self, r: u8) -> u32 {
		match r & 0xF {
			SP => self.stack[self.stack_slot()],
			PC => self.pc,
			n  => self.gpr[n as usize],
		}
	}

	/// Writes R0..R15. R14 is the active stack pointer.
	pub fn set_reg(&mut self, r: u8, val: u32) {
		match r & 0xF {
			SP => self.stack[self.stack_slot()] = val,
			PC => self.pc = val,
			n  => self.gpr[n as usize] = val,
		}
	}

	/// Reads a register as an operand of the given size. Quads come from Rn (low) and Rn+1
	/// (high); octawords only carry their low quad.
	pub fn reg_sized(&self, r: u8, size: DataSize) -> u64 {
		match size {
			DataSize::Quad | DataSize::Octa =>
				(self.reg(r) as u64) | ((self.reg(r.wrapping_add(1)) as u64) << 32),
			_ => size.trunc(self.reg(r) as u64),
		}
	}

	/// Writes a register as an operand of the given size. Bytes and words replace only the low
	/// bits; quads write Rn and Rn+1.
	pub fn set_reg_sized(&mut self, r: u8, size: DataSize, val: u64) {
		match size {
			DataSize::Byte | DataSize::Word => {
				let mask = size.mask() as u32;
				let old = self.reg(r);
				self.set_reg(r, (old & !mask) | (val as u32 & mask));
			}
			DataSize::Long => self.set_reg(r, val as u32),
			DataSize::Quad | DataSize::Octa => {
				self.set_reg(r, val as u32);
				self.set_reg(r.wrapping_add(1), (val >> 32) as u32);
			}
		}
	}

	/// The program counter.
	pub fn pc(&self) -> VA {
		VA(self.pc)
	}

	/// Sets the program counter.
	pub fn set_pc(&mut self, pc: VA) {
		self.pc = pc.0;
	}

	/// Moves the program counter forward by `n` bytes.
	pub fn advance_pc(&mut self, n: usize) {
		self.pc = self.pc.wrapping_add(n as u32);
	}

	/// The active stack pointer.
	pub fn sp(&self) -> u32 {
		self.reg(SP)
	}

	/// A stack pointer out of the bank, regardless of which one is active.
	pub fn banked_sp(&self, mode: AccessMode) -> u32 {
		self.stack[mode as usize]
	}

	/// The interrupt stack pointer.
	pub fn isp(&self) -> u32 {
		self.stack[4]
	}

	// --------------------------------------------------------------------------------------------
	// PSL

	/// The whole PSL.
	pub fn psl(&self) -> Psl {
		self.psl
	}

	/// Replaces the whole PSL. R14 follows the new mode and IS bit.
	pub fn set_psl(&mut self, psl: Psl) {
		self.psl = psl;
	}

	/// The condition codes.
	pub fn cc(&self) -> Cc {
		self.psl.cc
	}

	/// Sets the condition codes.
	pub fn set_cc(&mut self, cc: Cc) {
		self.psl.cc = cc;
	}

	/// The current access mode.
	pub fn mode(&self) -> AccessMode {
		self.psl.cur_mode
	}

	/// Switches access modes. The old mode becomes the previous mode, and R14 switches to the
	/// new mode's stack pointer.
	pub fn set_mode(&mut self, mode: AccessMode) {
		self.psl.prv_mode = self.psl.cur_mode;
		self.psl.cur_mode = mode;
	}

	/// Switches onto or off of the interrupt stack.
	pub fn set_interrupt_stack(&mut self, is: bool) {
		self.psl.is = is;
	}

	/// Current interrupt priority level.
	pub fn ipl(&self) -> u8 {
		self.psl.ipl
	}

	/// Whether the current mode is kernel.
	pub fn is_kernel(&self) -> bool {
		self.psl.cur_mode == AccessMode::Kernel
	}

	/// The highest pending software interrupt level, if any.
	pub fn pending_software_interrupt(&self) -> Option<u8> {
		match self.sisr {
			0 => None,
			s => Some(15 - s.leading_zeros() as u8),
		}
	}

	// --------------------------------------------------------------------------------------------
	// Privileged registers

	/// `MFPR`. Kernel mode only.
	pub fn mfpr(&self, idx: u32) -> CpuResult<u32> {
		use PrivReg::*;

		if !self.is_kernel() {
			return Err(FaultKind::PrivilegedInstruction);
		}

		let reg = PrivReg::from_index(idx).ok_or(FaultKind::ReservedOperand)?;

		Ok(match reg {
			KSP | ESP | SSP | USP | ISP => match reg.stack_slot() {
				Some(slot) => self.stack[slot],
				None       => return Err(FaultKind::ReservedOperand),
			},
			P0BR   => self.p0br,
			P0LR   => self.p0lr,
			P1BR   => self.p1br,
			P1LR   => self.p1lr,
			SBR    => self.sbr,
			SLR    => self.slr,
			PCBB   => self.pcbb,
			SCBB   => self.scbb,
			IPL    => self.psl.ipl as u32,
			ASTLVL => self.astlvl,
			SISR   => self.sisr as u32,
			MAPEN  => self.mapen as u32,
			SID    => SYSTEM_ID,

			// write-only
			SIRR | TBIA | TBIS => return Err(FaultKind::ReservedOperand),
		})
	}

	/// `MTPR`. Kernel mode only. If the write affects memory mapping, returns the event the
	/// memory collaborator should hear about.
	pub fn mtpr(&mut self, idx: u32, val: u32) -> CpuResult<Option<MmuEvent>> {
		use PrivReg::*;

		if !self.is_kernel() {
			return Err(FaultKind::PrivilegedInstruction);
		}

		let reg = PrivReg::from_index(idx).ok_or(FaultKind::ReservedOperand)?;

		match reg {
			KSP | ESP | SSP | USP | ISP => match reg.stack_slot() {
				Some(slot) => self.stack[slot] = val,
				None       => return Err(FaultKind::ReservedOperand),
			},
			P0BR   => self.p0br = val,
			P0LR   => self.p0lr = val,
			P1BR   => self.p1br = val,
			P1LR   => self.p1lr = val,
			SBR    => self.sbr = val,
			SLR    => self.slr = val,
			PCBB   => self.pcbb = val,
			SCBB   => self.scbb = val,
			IPL    => self.psl.ipl = (val & 0x1F) as u8,
			ASTLVL => self.astlvl = val & 7,
			SIRR   => match val & 0xF {
				0 => {}
				n => self.sisr |= 1 << n,
			},
			SISR   => self.sisr = (val & 0xFFFE) as u16,
			MAPEN  => self.mapen = val & 1 != 0,
			TBIA   => {}
			TBIS   => {}
			SID    => return Err(FaultKind::ReservedOperand),
		}

		Ok(match reg {
			TBIA => Some(MmuEvent::InvalidateAll),
			TBIS => Some(MmuEvent::InvalidateSingle(VA(val))),
			r if r.is_mmu() => Some(MmuEvent::MappingChanged),
			_ => None,
		})
	}

	/// What the MMU needs to know to translate a request made right now.
	pub fn mmu_state(&self) -> MmuState {
		MmuState {
			mode:  self.psl.cur_mode,
			mapen: self.mapen,
			p0br:  self.p0br,
			p0lr:  self.p0lr,
			p1br:  self.p1br,
			p1lr:  self.p1lr,
			sbr:   self.sbr,
			slr:   self.slr,
		}
	}
}
