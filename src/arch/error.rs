use std::error::Error;

use parse_display::Display;

use crate::arch::vax::AccessMode;
use crate::memory::{ MemFault, VA };

// ------------------------------------------------------------------------------------------------
// ArithTrap
// ------------------------------------------------------------------------------------------------

/// Arithmetic exceptions reported by the ALU. Whether one aborts the instruction is up to the
/// per-opcode trap policy.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum ArithTrap {
	#[display("integer overflow")]
	IntegerOverflow,
	#[display("integer divide by zero")]
	IntegerDivideByZero,
	#[display("subscript range")]
	SubscriptRange,
}

// ------------------------------------------------------------------------------------------------
// FaultKind
// ------------------------------------------------------------------------------------------------

/// Everything that can stop an instruction from completing.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum FaultKind {
	/// Reserved or unknown opcode.
	#[display("illegal instruction")]
	IllegalInstruction,

	/// Illegal addressing mode/register pairing, or a mode illegal for the operand's access.
	#[display("reserved addressing mode")]
	ReservedAddressingMode,

	/// An operand value the instruction can't accept (bad privileged register number, etc.)
	#[display("reserved operand")]
	ReservedOperand,

	/// Privileged instruction attempted outside kernel mode.
	#[display("privileged instruction")]
	PrivilegedInstruction,

	/// Passed along verbatim from the memory collaborator.
	#[display("memory fault: {0}")]
	Memory(MemFault),

	/// Reported by the ALU, and the opcode's policy says to abort.
	#[display("arithmetic trap: {0}")]
	Arithmetic(ArithTrap),

	/// BPT instruction.
	#[display("breakpoint")]
	Breakpoint,

	/// The instruction decodes fine but this core doesn't execute it.
	#[display("unimplemented instruction")]
	Unimplemented,

	/// CHMx instruction. This one is a trap: the instruction completes.
	#[display("change mode to {mode} (code {code})")]
	ChangeMode { mode: AccessMode, code: u16 },
}

impl FaultKind {
	/// Traps happen *after* an instruction completes; everything else backs the instruction out.
	pub fn is_trap(&self) -> bool {
		matches!(self, FaultKind::ChangeMode { .. })
	}
}

impl From<MemFault> for FaultKind {
	fn from(f: MemFault) -> Self {
		FaultKind::Memory(f)
	}
}

/// Alias for a `Result` with a `FaultKind` as its error type. Used inside an instruction step.
pub type CpuResult<T> = Result<T, FaultKind>;

// ------------------------------------------------------------------------------------------------
// Fault
// ------------------------------------------------------------------------------------------------

/// What the pipeline hands the exception-dispatch collaborator when it enters the `Error` stage.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
#[display("{kind} at PC {pc}")]
pub struct Fault {
	/// What went wrong.
	pub kind:    FaultKind,
	/// Address of the instruction that faulted.
	pub pc:      VA,
	/// Where PC is now. Same as `pc` for faults; the following instruction for traps.
	pub next_pc: VA,
}

impl Error for Fault {}

/// Alias for a `Result` with a `Fault` as its error type.
pub type StepResult<T> = Result<T, Fault>;

// ------------------------------------------------------------------------------------------------
// DisasErrorKind
// ------------------------------------------------------------------------------------------------

/// The kinds of disassembly errors.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum DisasErrorKind {
	/// Unknown instruction - undefined opcode.
	#[display("unknown instruction")]
	UnknownInstruction,

	/// Ran out of bytes.
	#[display("out of bytes at offset {offs}")]
	OutOfBytes { offs: usize },

	/// An operand specifier that can't be decoded.
	#[display("bad operand: {0}")]
	BadOperand(FaultKind),
}

impl From<FaultKind> for DisasErrorKind {
	fn from(kind: FaultKind) -> Self {
		DisasErrorKind::BadOperand(kind)
	}
}

// ------------------------------------------------------------------------------------------------
// DisasError
// ------------------------------------------------------------------------------------------------

/// The disassembly error type.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
#[display("disassembly error at VA {va}: {kind}")]
pub struct DisasError {
	/// VA passed to `disas_instr`.
	pub va:   VA,
	/// kind of error.
	pub kind: DisasErrorKind,
}

impl Error for DisasError {}

impl DisasError {
	/// Shorthand constructors.
	pub fn out_of_bytes(va: VA, offs: usize) -> DisasError {
		DisasError { va, kind: DisasErrorKind::OutOfBytes { offs } }
	}

	/// Ditto.
	pub fn unknown_instruction(va: VA) -> DisasError {
		DisasError { va, kind: DisasErrorKind::UnknownInstruction }
	}
}

/// Alias for a `Result` with a `DisasError` as its error type.
pub type DisasResult<T> = Result<T, DisasError>;
