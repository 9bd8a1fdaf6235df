use enum_dispatch::enum_dispatch;

use crate::arch::ArithTrap;
use crate::memory::DataSize;
use super::Cc;

// ------------------------------------------------------------------------------------------------
// AluOp
// ------------------------------------------------------------------------------------------------

/// Operations the ALU knows. Operand order is always "left, right": for `Sub` that's minuend
/// then subtrahend, for `Div` dividend then divisor, for `Bic` value then mask.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum AluOp {
	Add,
	Sub,
	/// Add with carry in.
	Adwc,
	/// Subtract with borrow in.
	Sbwc,
	Mul,
	Div,
	/// Bit set (or).
	Bis,
	/// Bit clear (and-not).
	Bic,
	Xor,
	/// Complement.
	Com,
	/// Negate.
	Neg,
	Mov,
	/// Zero-extending move. `size` is the destination size.
	MovZ,
	/// Sign-extending or truncating conversion to the given size. `size` is the source size.
	Cvt(DataSize),
	Cmp,
	Tst,
	/// Bit test (and, codes only).
	Bit,
	/// Arithmetic shift: `[value, count]`, count is a signed byte.
	Ash,
	/// Rotate long: `[value, count]`.
	Rot,
	/// Extended multiply: `[mulr, muld, add]`, 64-bit result.
	Emul,
	/// Extended divide: `[quad dividend, divisor]`, quotient in `value`, remainder in `extra`.
	Ediv,
	/// Array index computation: `[subscript, low, high, size, index_in]`.
	Index,
}

// ------------------------------------------------------------------------------------------------
// AluOutput
// ------------------------------------------------------------------------------------------------

/// What comes out of the ALU.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct AluOutput {
	/// The result, truncated to the result size.
	pub value: u64,
	/// Second result (EDIV remainder). Zero otherwise.
	pub extra: u64,
	/// New condition codes.
	pub cc:    Cc,
	/// Arithmetic exception, if any. The caller decides what to do about it.
	pub trap:  Option<ArithTrap>,
}

impl AluOutput {
	fn new(value: u64, cc: Cc) -> Self {
		Self { value, extra: 0, cc, trap: None }
	}

	fn with_trap(mut self, trap: Option<ArithTrap>) -> Self {
		self.trap = trap;
		self
	}
}

// ------------------------------------------------------------------------------------------------
// IAlu
// ------------------------------------------------------------------------------------------------

/// The ALU collaborator. Pure: no state, no side effects.
#[enum_dispatch(Alu)]
pub trait IAlu {
	/// Computes `op` over `args` (missing arguments count as 0) at the given size.
	fn apply(&self, op: AluOp, args: &[u64], size: DataSize, cc_in: Cc) -> AluOutput;
}

/// All the ALUs a `Cpu` can be built with.
#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum Alu {
	StdAlu,
}

impl Default for Alu {
	fn default() -> Alu { StdAlu.into() }
}

// ------------------------------------------------------------------------------------------------
// StdAlu
// ------------------------------------------------------------------------------------------------

/// Reference two's-complement ALU with VAX condition code rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdAlu;

impl IAlu for StdAlu {
	fn apply(&self, op: AluOp, args: &[u64], size: DataSize, cc_in: Cc) -> AluOutput {
		let arg = |i: usize| args.get(i).copied().unwrap_or(0);
		let (a, b) = (size.trunc(arg(0)), size.trunc(arg(1)));
		let carry_in = cc_in.contains(Cc::C) as u64;

		match op {
			AluOp::Add  => add(a, b, 0, size),
			AluOp::Adwc => add(a, b, carry_in, size),
			AluOp::Sub  => sub(a, b, 0, size),
			AluOp::Sbwc => sub(a, b, carry_in, size),
			AluOp::Mul  => mul(a, b, size),
			AluOp::Div  => div(a, b, size),

			AluOp::Bis  => logical(a | b, size, cc_in),
			AluOp::Bic  => logical(a & !b, size, cc_in),
			AluOp::Xor  => logical(a ^ b, size, cc_in),
			AluOp::Com  => logical(!a, size, cc_in),
			AluOp::Mov  => logical(a, size, cc_in),
			AluOp::MovZ => logical(a, size, cc_in),

			AluOp::Neg => {
				let r = size.trunc(a.wrapping_neg());
				let mut cc = Cc::nz(r, size);
				cc.set(Cc::V, a != 0 && a == size.sign_bit());
				cc.set(Cc::C, r != 0);
				let trap = overflow_trap(cc);
				AluOutput::new(r, cc).with_trap(trap)
			}

			AluOp::Cvt(dst) => {
				let val = size.sext(a);
				let r = dst.trunc(val as u64);
				let mut cc = Cc::nz(r, dst);
				cc.set(Cc::V, dst.sext(r) != val);
				let trap = overflow_trap(cc);
				AluOutput::new(r, cc).with_trap(trap)
			}

			AluOp::Cmp => {
				let mut cc = Cc::empty();
				cc.set(Cc::N, size.sext(a) < size.sext(b));
				cc.set(Cc::Z, a == b);
				cc.set(Cc::C, a < b);
				AluOutput::new(0, cc)
			}

			AluOp::Tst => AluOutput::new(0, Cc::nz(a, size)),
			AluOp::Bit => AluOutput::new(0, Cc::nz(a & b, size) | (cc_in & Cc::C)),

			AluOp::Ash   => ash(size.sext(a), arg(1) as u8 as i8, size),
			AluOp::Rot   => {
				let sh = (arg(1) as u8 as i8).rem_euclid(32) as u32;
				logical((a as u32).rotate_left(sh) as u64, DataSize::Long, cc_in)
			}
			AluOp::Emul  => emul(arg(0) as u32 as i32, arg(1) as u32 as i32, arg(2) as u32 as i32),
			AluOp::Ediv  => ediv(arg(0) as i64, arg(1) as u32 as i32),
			AluOp::Index => index(args),
		}
	}
}

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

fn overflow_trap(cc: Cc) -> Option<ArithTrap> {
	if cc.contains(Cc::V) { Some(ArithTrap::IntegerOverflow) } else { None }
}

/// N and Z from the result, V cleared, C passed through.
fn logical(r: u64, size: DataSize, cc_in: Cc) -> AluOutput {
	let r = size.trunc(r);
	AluOutput::new(r, Cc::nz(r, size) | (cc_in & Cc::C))
}

fn add(a: u64, b: u64, c: u64, size: DataSize) -> AluOutput {
	let full = (a as u128) + (b as u128) + (c as u128);
	let r = size.trunc(full as u64);
	let mut cc = Cc::nz(r, size);
	cc.set(Cc::V, (!(a ^ b) & (a ^ r)) & size.sign_bit() != 0);
	cc.set(Cc::C, full >> size.bits() != 0);
	let trap = overflow_trap(cc);
	AluOutput::new(r, cc).with_trap(trap)
}

fn sub(a: u64, b: u64, c: u64, size: DataSize) -> AluOutput {
	let r = size.trunc(a.wrapping_sub(b).wrapping_sub(c));
	let mut cc = Cc::nz(r, size);
	cc.set(Cc::V, ((a ^ b) & (a ^ r)) & size.sign_bit() != 0);
	cc.set(Cc::C, (a as u128) < (b as u128) + (c as u128));
	let trap = overflow_trap(cc);
	AluOutput::new(r, cc).with_trap(trap)
}

fn mul(a: u64, b: u64, size: DataSize) -> AluOutput {
	let full = (size.sext(a) as i128) * (size.sext(b) as i128);
	let r = size.trunc(full as u64);
	let mut cc = Cc::nz(r, size);
	cc.set(Cc::V, size.sext(r) as i128 != full);
	let trap = overflow_trap(cc);
	AluOutput::new(r, cc).with_trap(trap)
}

/// Division by zero and the one overflowing case both leave the dividend as the result.
fn div(a: u64, b: u64, size: DataSize) -> AluOutput {
	let (divd, divr) = (size.sext(a), size.sext(b));

	if divr == 0 {
		let mut cc = Cc::nz(a, size);
		cc.insert(Cc::V);
		return AluOutput::new(a, cc).with_trap(Some(ArithTrap::IntegerDivideByZero));
	}

	let q = divd / divr;
	let r = size.trunc(q as u64);

	if size.sext(r) != q {
		let mut cc = Cc::nz(a, size);
		cc.insert(Cc::V);
		return AluOutput::new(a, cc).with_trap(Some(ArithTrap::IntegerOverflow));
	}

	AluOutput::new(r, Cc::nz(r, size))
}

fn ash(val: i64, cnt: i8, size: DataSize) -> AluOutput {
	let bits = size.bits() as i32;
	let cnt = cnt as i32;

	let (r, v) = if cnt >= 0 {
		let r = if cnt >= bits { 0 } else { size.trunc((val as u64) << cnt) };
		// overflow if shifting back doesn't give the original.
		let lost = if cnt >= bits { val != 0 } else { size.sext(r) >> cnt != val };
		(r, lost)
	} else {
		let sh = (-cnt).min(bits - 1);
		(size.trunc((val >> sh) as u64), false)
	};

	let mut cc = Cc::nz(r, size);
	cc.set(Cc::V, v);
	let trap = overflow_trap(cc);
	AluOutput::new(r, cc).with_trap(trap)
}

fn emul(mulr: i32, muld: i32, add: i32) -> AluOutput {
	let r = (mulr as i64) * (muld as i64) + (add as i64);
	AluOutput::new(r as u64, Cc::nz(r as u64, DataSize::Quad))
}

fn ediv(divd: i64, divr: i32) -> AluOutput {
	let long = DataSize::Long;

	if divr == 0 {
		let q = long.trunc(divd as u64);
		let cc = Cc::nz(q, long) | Cc::V;
		return AluOutput::new(q, cc).with_trap(Some(ArithTrap::IntegerDivideByZero));
	}

	let divr = divr as i64;

	match (divd.checked_div(divr), divd.checked_rem(divr)) {
		(Some(q), Some(rem)) if q == (q as i32) as i64 => {
			let q = long.trunc(q as u64);
			let mut out = AluOutput::new(q, Cc::nz(q, long));
			out.extra = long.trunc(rem as u64);
			out
		}
		_ => {
			let q = long.trunc(divd as u64);
			let cc = Cc::nz(q, long) | Cc::V;
			AluOutput::new(q, cc).with_trap(Some(ArithTrap::IntegerOverflow))
		}
	}
}

fn index(args: &[u64]) -> AluOutput {
	let long = DataSize::Long;
	let arg = |i: usize| args.get(i).copied().unwrap_or(0) as u32 as i32 as i64;
	let (sub, low, high, size, index_in) = (arg(0), arg(1), arg(2), arg(3), arg(4));

	// only the low longword is kept, and overflow isn't reported.
	let r = long.trunc((index_in + sub).wrapping_mul(size) as u64);
	let trap = if sub < low || sub > high { Some(ArithTrap::SubscriptRange) } else { None };

	AluOutput::new(r, Cc::nz(r, long)).with_trap(trap)
}
