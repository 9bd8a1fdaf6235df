use smallvec::SmallVec;

use crate::arch::{ DisasError, DisasResult };
use crate::memory::{ DataSize, VA };
use super::{
	decode_opcode, parse_specifier, reg_name, InstDesc, Opcode, SliceStream,
	SpecMode, Specifier, PC,
};

// ------------------------------------------------------------------------------------------------
// Instruction
// ------------------------------------------------------------------------------------------------

/// A statically decoded instruction: what the bytes say, not what they'd do.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
	va:     VA,
	desc:   &'static InstDesc,
	ops:    SmallVec<[Specifier; 6]>,
	size:   usize,
}

impl Instruction {
	pub(super) fn new(va: VA, desc: &'static InstDesc, ops: SmallVec<[Specifier; 6]>, size: usize)
	-> Self {
		Self { va, desc, ops, size }
	}

	/// Where it starts.
	pub fn va(&self) -> VA            { self.va }
	/// Its descriptor.
	pub fn desc(&self) -> &InstDesc   { self.desc }
	/// Its opcode.
	pub fn opcode(&self) -> Opcode    { self.desc.opcode }
	/// How many bytes long it is, opcode and specifiers included.
	pub fn size(&self) -> usize       { self.size }
	/// Its operand specifiers.
	pub fn ops(&self) -> &[Specifier] { &self.ops }
	/// Where the next instruction starts.
	pub fn next_va(&self) -> VA       { self.va + self.size }

	/// For branches, the branch target.
	pub fn branch_target(&self) -> Option<VA> {
		self.ops.iter().rev().find_map(|op| match op.mode {
			SpecMode::Branch(target) => Some(target),
			_ => None,
		})
	}
}

// ------------------------------------------------------------------------------------------------
// Disassembler
// ------------------------------------------------------------------------------------------------

/// The VAX disassembler.
#[derive(Debug, Default, Copy, Clone)]
pub struct Disassembler;

impl Disassembler {
	/// Disassembles the instruction at the start of `img`, which lives at `va`.
	pub fn disas_instr(&self, img: &[u8], va: VA) -> DisasResult<Instruction> {
		let (desc, bytes) = decode_opcode(img).map_err(|kind| {
			log::trace!("ran into opcode bytes {:02X?} at {}", &img[.. img.len().min(2)], va);
			DisasError { va, kind }
		})?;

		let mut s = SliceStream::new(img, va);
		s.skip(bytes.len());

		let mut ops = SmallVec::new();

		for &spec in desc.ops {
			ops.push(parse_specifier(&mut s, spec).map_err(|kind| DisasError { va, kind })?);
		}

		Ok(Instruction::new(va, desc, ops, s.offs()))
	}

	/// Iterates over the instructions in `img`, one after another, starting at `va`.
	pub fn disas_all<'a>(&self, img: &'a [u8], va: VA) -> DisasAll<'a> {
		DisasAll { disas: *self, img, va, offs: 0, err: None }
	}
}

/// Iterator over consecutive instructions in a slice. Stops at the end of the slice or at the
/// first thing it can't decode; `error` tells which.
#[derive(Debug)]
pub struct DisasAll<'a> {
	disas: Disassembler,
	img:   &'a [u8],
	va:    VA,
	offs:  usize,
	err:   Option<DisasError>,
}

impl DisasAll<'_> {
	/// Why iteration stopped early, if it did.
	pub fn error(&self) -> Option<DisasError> {
		self.err
	}

	/// How many bytes have been consumed.
	pub fn offs(&self) -> usize {
		self.offs
	}
}

impl Iterator for DisasAll<'_> {
	type Item = Instruction;

	fn next(&mut self) -> Option<Instruction> {
		if self.err.is_some() || self.offs >= self.img.len() {
			return None;
		}

		match self.disas.disas_instr(&self.img[self.offs ..], self.va + self.offs) {
			Ok(inst) => {
				self.offs += inst.size();
				Some(inst)
			}
			Err(e) => {
				self.err = Some(e);
				None
			}
		}
	}
}

// ------------------------------------------------------------------------------------------------
// Printer
// ------------------------------------------------------------------------------------------------

/// Formats instructions in VAX MACRO syntax.
#[derive(Debug, Default, Copy, Clone)]
pub struct Printer;

impl Printer {
	pub fn new() -> Self {
		Self
	}

	/// The mnemonic, e.g. `MOVL`.
	pub fn fmt_mnemonic(&self, i: &Instruction) -> String {
		i.opcode().to_string()
	}

	/// All the operands, comma-separated.
	pub fn fmt_operands(&self, i: &Instruction) -> String {
		i.ops().iter()
			.map(|op| self.fmt_specifier(op))
			.collect::<Vec<_>>()
			.join(", ")
	}

	/// The whole instruction.
	pub fn fmt_instr(&self, i: &Instruction) -> String {
		if i.ops().is_empty() {
			self.fmt_mnemonic(i)
		} else {
			format!("{:<7} {}", self.fmt_mnemonic(i), self.fmt_operands(i))
		}
	}

	/// One operand specifier.
	pub fn fmt_specifier(&self, op: &Specifier) -> String {
		use SpecMode::*;

		let base = match op.mode {
			Literal(v)         => format!("S^#{}", self.fmt_imm(v as u64)),
			Register(r)        => reg_name(r).to_string(),
			RegDeferred(r)     => format!("({})", reg_name(r)),
			AutoDec(r)         => format!("-({})", reg_name(r)),
			AutoInc(r)         => format!("({})+", reg_name(r)),
			AutoIncDeferred(r) => format!("@({})+", reg_name(r)),
			Immediate { val, .. } => format!("I^#{}", self.fmt_imm(val)),
			Absolute(addr)     => format!("@#{}", self.fmt_addr(addr)),
			Branch(target)     => self.fmt_addr(target),

			Disp { reg, disp, width, deferred } => {
				let at = if deferred { "@" } else { "" };
				let w = width_prefix(width);

				match op.pc_target() {
					Some(target) if reg == PC => format!("{}{}^{}", at, w, self.fmt_addr(target)),
					_ => format!("{}{}^{}({})", at, w, disp, reg_name(reg)),
				}
			}
		};

		match op.index {
			Some(x) => format!("{}[{}]", base, reg_name(x)),
			None    => base,
		}
	}

	fn fmt_imm(&self, imm: u64) -> String {
		if imm < 0x10 { format!("{}", imm) } else { format!("^X{:X}", imm) }
	}

	fn fmt_addr(&self, addr: VA) -> String {
		format!("^X{:08X}", addr.0)
	}
}

fn width_prefix(width: DataSize) -> &'static str {
	match width {
		DataSize::Byte => "B",
		DataSize::Word => "W",
		_              => "L",
	}
}
