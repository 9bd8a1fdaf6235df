use std::error::Error;

use parse_display::Display;

use crate::arch::DisasErrorKind;
use super::{ InstDesc, lookup_desc };

// ------------------------------------------------------------------------------------------------
// OpcodeBytes
// ------------------------------------------------------------------------------------------------

/// The one or two opcode bytes at the start of an instruction.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum OpcodeBytes {
	#[display("{0:02X}")]
	Single(u8),
	#[display("{0:02X} {1:02X}")]
	Escaped(u8, u8),
}

#[allow(clippy::len_without_is_empty)]
impl OpcodeBytes {
	/// The opcode value the descriptor tables are keyed by.
	pub fn value(self) -> u16 {
		match self {
			OpcodeBytes::Single(b)       => b as u16,
			OpcodeBytes::Escaped(esc, b) => ((esc as u16) << 8) | (b as u16),
		}
	}

	/// How many bytes of the instruction stream these take up.
	pub fn len(self) -> usize {
		match self {
			OpcodeBytes::Single(..)  => 1,
			OpcodeBytes::Escaped(..) => 2,
		}
	}
}

// ------------------------------------------------------------------------------------------------
// ReservedOpcode
// ------------------------------------------------------------------------------------------------

/// The opcode bytes don't name any instruction this core knows.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
#[display("reserved opcode 0x{0:02X}")]
pub struct ReservedOpcode(pub u16);

impl Error for ReservedOpcode {}

// ------------------------------------------------------------------------------------------------
// Decoding
// ------------------------------------------------------------------------------------------------

/// Whether `b` is one of the escape bytes that select an extended opcode table.
pub fn is_escape(b: u8) -> bool {
	matches!(b, 0xFD ..= 0xFF)
}

/// Maps opcode bytes to their descriptor.
pub fn decode(bytes: OpcodeBytes) -> Result<&'static InstDesc, ReservedOpcode> {
	let val = bytes.value();

	// a lone escape byte is never an opcode, even if someone builds one.
	if let OpcodeBytes::Single(b) = bytes {
		if is_escape(b) {
			return Err(ReservedOpcode(val));
		}
	}

	lookup_desc(val).ok_or(ReservedOpcode(val))
}

/// Decodes the opcode at the start of `img`, for static disassembly.
pub fn decode_opcode(img: &[u8]) -> Result<(&'static InstDesc, OpcodeBytes), DisasErrorKind> {
	let bytes = match img {
		[] => return Err(DisasErrorKind::OutOfBytes { offs: 0 }),
		[esc] if is_escape(*esc) => return Err(DisasErrorKind::OutOfBytes { offs: 1 }),
		[esc, b, ..] if is_escape(*esc) => OpcodeBytes::Escaped(*esc, *b),
		[b, ..] => OpcodeBytes::Single(*b),
	};

	match decode(bytes) {
		Ok(desc) => Ok((desc, bytes)),
		Err(..)  => Err(DisasErrorKind::UnknownInstruction),
	}
}
