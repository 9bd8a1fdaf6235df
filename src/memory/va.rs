use std::ops::{ Add, AddAssign, Sub, SubAssign };
use std::fmt::{ UpperHex, Formatter, Result as FmtResult };

use parse_display::Display;

// ------------------------------------------------------------------------------------------------
// VA
// ------------------------------------------------------------------------------------------------

/// newtype for addresses. VAX addresses are 32 bits and all arithmetic on them wraps.
#[derive(Debug, Display, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[display("0x{0:08X}")]
pub struct VA(pub u32);

impl UpperHex for VA {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		UpperHex::fmt(&self.0, f)
	}
}

impl Add<u32> for VA {
	type Output = Self;
	#[inline] fn add(self, other: u32) -> Self {
		VA(self.0.wrapping_add(other))
	}
}

impl Add<i32> for VA {
	type Output = Self;
	#[inline] fn add(self, other: i32) -> Self {
		VA(self.0.wrapping_add(other as u32))
	}
}

impl Add<usize> for VA {
	type Output = Self;
	#[inline] fn add(self, other: usize) -> Self {
		VA(self.0.wrapping_add(other as u32))
	}
}

impl AddAssign<u32> for VA {
	#[inline] fn add_assign(&mut self, other: u32) {
		self.0 = self.0.wrapping_add(other);
	}
}

impl AddAssign<usize> for VA {
	#[inline] fn add_assign(&mut self, other: usize) {
		self.0 = self.0.wrapping_add(other as u32);
	}
}

impl Sub<VA> for VA {
	type Output = u32;
	#[inline] fn sub(self, other: Self) -> u32 {
		self.0.wrapping_sub(other.0)
	}
}

impl Sub<u32> for VA {
	type Output = Self;
	#[inline] fn sub(self, other: u32) -> Self {
		VA(self.0.wrapping_sub(other))
	}
}

impl SubAssign<u32> for VA {
	#[inline] fn sub_assign(&mut self, other: u32) {
		self.0 = self.0.wrapping_sub(other);
	}
}

impl From<u32> for VA {
	fn from(v: u32) -> Self { VA(v) }
}
