use super::*;
use crate::arch::vax::AccessMode;

fn kernel() -> MmuState {
	MmuState::default()
}

fn user() -> MmuState {
	MmuState { mode: AccessMode::User, ..MmuState::default() }
}

#[test]
fn data_sizes() {
	assert_eq!(DataSize::Byte.bytes(), 1);
	assert_eq!(DataSize::Octa.bytes(), 16);
	assert_eq!(DataSize::Word.mask(), 0xFFFF);
	assert_eq!(DataSize::Quad.mask(), u64::MAX);
	assert_eq!(DataSize::Long.sign_bit(), 0x8000_0000);

	assert_eq!(DataSize::Byte.sext(0xFF), -1);
	assert_eq!(DataSize::Byte.sext(0x7F), 127);
	assert_eq!(DataSize::Word.sext(0x1_8000), -0x8000);
	assert_eq!(DataSize::Long.trunc(0x1_2345_6789), 0x2345_6789);
}

#[test]
fn va_arithmetic() {
	assert_eq!(VA(0x1000) + 4u32, VA(0x1004));
	assert_eq!(VA(0x1000) + -4i32, VA(0xFFC));
	assert_eq!(VA(0x1010) - VA(0x1000), 0x10);
	assert_eq!(VA(0) + -1i32, VA(0xFFFF_FFFF));
	assert_eq!(VA(0x2000).to_string(), "0x00002000");
}

#[test]
fn ram_is_little_endian() {
	let mut bus = Bus::new(0x100);
	bus.write(VA(0x10), DataSize::Long, 0x1234_5678, &kernel()).unwrap();

	assert_eq!(bus.slice(VA(0x10), 4).unwrap(), &[0x78, 0x56, 0x34, 0x12]);
	assert_eq!(bus.read(VA(0x10), DataSize::Word, &kernel()).unwrap(), 0x5678);
	assert_eq!(bus.read(VA(0x12), DataSize::Byte, &kernel()).unwrap(), 0x34);

	bus.write(VA(0x20), DataSize::Quad, 0x0102_0304_0506_0708, &kernel()).unwrap();
	assert_eq!(bus.read(VA(0x20), DataSize::Quad, &kernel()).unwrap(), 0x0102_0304_0506_0708);
	assert_eq!(bus.read(VA(0x24), DataSize::Long, &kernel()).unwrap(), 0x0102_0304);
}

#[test]
fn ram_bounds() {
	let mut bus = Bus::new(0x100);

	assert!(bus.read(VA(0xFC), DataSize::Long, &kernel()).is_ok());

	// straddles the end of RAM
	let err = bus.read(VA(0xFE), DataSize::Long, &kernel()).unwrap_err();
	assert_eq!(err, MemFault::non_existent(VA(0xFE), MemAccess::Read));

	let err = bus.write(VA(0x1000), DataSize::Byte, 0, &kernel()).unwrap_err();
	assert_eq!(err.kind, MemFaultKind::NonExistent);
	assert_eq!(err.access, MemAccess::Write);

	assert!(bus.load(VA(0xF0), &[0; 0x20]).is_err());
}

#[test]
fn devices() {
	let mut bus = Bus::new(0x1000);
	bus.map_device(VA(0x2000), 0x10, false, Box::new(RegisterBlock::new("regs", 0x10)));
	bus.map_device(VA(0x3000), 0x10, true,  Box::new(RegisterBlock::new("csr", 0x10)));

	assert_eq!(bus.regions().count(), 2);

	bus.write(VA(0x2004), DataSize::Long, 0xCAFE_F00D, &user()).unwrap();
	assert_eq!(bus.read(VA(0x2004), DataSize::Long, &user()).unwrap(), 0xCAFE_F00D);
	assert_eq!(bus.read(VA(0x2006), DataSize::Word, &kernel()).unwrap(), 0xCAFE);

	// kernel-only region
	bus.write(VA(0x3000), DataSize::Long, 7, &kernel()).unwrap();
	let err = bus.read(VA(0x3000), DataSize::Long, &user()).unwrap_err();
	assert_eq!(err, MemFault::access_violation(VA(0x3000), MemAccess::Read));

	// hole between RAM and devices
	let err = bus.read(VA(0x1800), DataSize::Long, &kernel()).unwrap_err();
	assert_eq!(err.kind, MemFaultKind::NonExistent);
}

#[test]
#[should_panic]
fn overlapping_devices() {
	let mut bus = Bus::new(0x1000);
	bus.map_device(VA(0x2000), 0x10, false, Box::new(RegisterBlock::new("a", 0x10)));
	bus.map_device(VA(0x2008), 0x10, false, Box::new(RegisterBlock::new("b", 0x10)));
}
