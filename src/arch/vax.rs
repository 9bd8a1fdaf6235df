//! The VAX architecture: opcode tables, operand specifiers, and the instruction pipeline.

use parse_display::Display;

use crate::memory::DataSize;

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

mod alu;
mod decode;
mod descs;
mod disas;
mod execute;
mod opcodes;
mod operand;
mod pipeline;
mod port;
mod regs;

#[cfg(test)]
mod exec_tests;

pub use alu::{ Alu, IAlu, AluOp, AluOutput, StdAlu };
pub use decode::{ decode, decode_opcode, is_escape, OpcodeBytes, ReservedOpcode };
pub use descs::{ lookup_desc, all_descs };
pub use disas::{ Disassembler, DisasAll, Instruction, Printer };
pub use opcodes::Opcode;
pub use operand::{ parse_specifier, IStream, Operand, ResolvedOperand, SliceStream, SpecMode,
	Specifier };
pub use execute::branch_taken;
pub use pipeline::{ Cpu, IFaultSink, Stage, StepOutcome };
pub use port::{ MemoryPort, PortStats };
pub use regs::*;

// ------------------------------------------------------------------------------------------------
// Access
// ------------------------------------------------------------------------------------------------

/// How an instruction uses one of its operands.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Access {
	/// Value is read.
	#[display("r")] Read,
	/// Value is written without being read first.
	#[display("w")] Write,
	/// Value is read and then written back.
	#[display("m")] Modify,
	/// The operand's address is used, not its value.
	#[display("a")] Addr,
	/// Base of a bit field: like `Addr`, but a register is allowed too.
	#[display("v")] Field,
	/// Branch displacement. Not a specifier at all, just bytes in the instruction stream.
	#[display("b")] Branch,
}

impl Access {
	/// Whether the operand's value gets read during operand fetch.
	pub fn reads(self) -> bool {
		matches!(self, Access::Read | Access::Modify)
	}

	/// Whether the operand is a destination.
	pub fn writes(self) -> bool {
		matches!(self, Access::Write | Access::Modify)
	}
}

// ------------------------------------------------------------------------------------------------
// OpSpec
// ------------------------------------------------------------------------------------------------

/// The declared shape of one operand: how it's accessed and how big it is.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct OpSpec {
	pub access: Access,
	pub size:   DataSize,
}

impl OpSpec {
	pub const fn new(access: Access, size: DataSize) -> Self {
		Self { access, size }
	}
}

// ------------------------------------------------------------------------------------------------
// InstClass
// ------------------------------------------------------------------------------------------------

/// Mnemonic class. The execute stage dispatches on this first.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone, Hash)]
pub enum InstClass {
	/// Moves, clears, conversions, address moves, pushes.
	Move,
	/// Two-operand arithmetic (`ADDL2`, `INCL`, `MNEGL`, ...)
	Arith2,
	/// Three-or-more-operand arithmetic (`ADDL3`, `EMUL`, `INDEX`, ...)
	Arith3,
	/// Bitwise operations.
	Logical,
	/// Compare and test; only condition codes change.
	Compare,
	/// Conditional, unconditional, loop and case branches.
	Branch,
	/// `JMP`, `JSB`, `BSBx`, `RSB`.
	JumpSub,
	/// `MTPR`, `MFPR`.
	Privileged,
	/// Arithmetic shifts and rotates.
	Shift,
	/// PSL manipulation, register push/pop, `HALT`, `NOP`, `BPT`, `CHMx`.
	Control,

	/// Character string instructions. Decode only.
	String,
	/// Packed decimal instructions. Decode only.
	Decimal,
	/// Queue instructions. Decode only.
	Queue,
	/// Variable-length bit field instructions. Decode only.
	BitField,
	/// Procedure calls and process context. Decode only.
	System,
}

impl InstClass {
	/// Whether instructions of this class are only decoded, never executed.
	pub fn is_decode_only(self) -> bool {
		use InstClass::*;
		match self {
			Move | Arith2 | Arith3 | Logical | Compare | Branch | JumpSub | Privileged | Shift
			| Control => false,
			String | Decimal | Queue | BitField | System => true,
		}
	}
}

// ------------------------------------------------------------------------------------------------
// InstDesc
// ------------------------------------------------------------------------------------------------

/// A VAX instruction descriptor. One per opcode, immutable, `'static`.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct InstDesc {
	/// The opcode, which also names the instruction.
	pub opcode: Opcode,
	/// Which class it belongs to.
	pub class:  InstClass,
	/// The operands, in instruction-stream order.
	pub ops:    &'static [OpSpec],
}

impl InstDesc {
	/// How many operands.
	pub fn num_ops(&self) -> usize {
		self.ops.len()
	}

	/// How many opcode bytes.
	pub fn opcode_len(&self) -> usize {
		if (self.opcode as u16) > 0xFF { 2 } else { 1 }
	}

	/// Whether this instruction only gets decoded.
	pub fn is_decode_only(&self) -> bool {
		self.class.is_decode_only()
	}
}
