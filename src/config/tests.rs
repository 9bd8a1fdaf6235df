use super::*;

fn args(s: &str) -> ConfigResult<MachineConfig> {
	MachineConfig::from_args(s.split_whitespace())
}

#[test]
fn defaults() {
	let config = args("boot.bin").unwrap();

	assert_eq!(config.image.as_deref(), Some("boot.bin"));
	assert_eq!(config.load_addr, VA(0x200));
	assert_eq!(config.cpu.reset_pc, VA(0x200));
	assert_eq!(config.cpu.reset_mode, AccessMode::Kernel);
	assert_eq!(config.verbosity, 0);
	assert!(!config.disasm);
}

#[test]
fn flags() {
	let config = args("-vv --ram 0x4000 --load 4096 --pc 0x1010 --mode user --steps 50 \
		--trap addl2=abort --trap DIVL3=flag --disasm boot.bin -v").unwrap();

	assert_eq!(config.verbosity, 3);
	assert_eq!(config.ram_size, 0x4000);
	assert_eq!(config.load_addr, VA(0x1000));
	assert_eq!(config.cpu.reset_pc, VA(0x1010));
	assert_eq!(config.cpu.reset_mode, AccessMode::User);
	assert_eq!(config.step_limit, 50);
	assert!(config.disasm);

	assert_eq!(config.cpu.trap_policy(Opcode::ADDL2), TrapPolicy::Abort);
	assert_eq!(config.cpu.trap_policy(Opcode::DIVL3), TrapPolicy::Flag);
	assert_eq!(config.cpu.trap_policy(Opcode::DIVL2), TrapPolicy::Abort);
	assert_eq!(config.cpu.trap_policy(Opcode::SUBL2), TrapPolicy::Flag);
}

#[test]
fn bad_arguments() {
	assert_eq!(args("").unwrap_err().kind, ConfigErrorKind::NoImage);
	assert_eq!(args("--bogus x.bin").unwrap_err().kind,
		ConfigErrorKind::UnknownFlag("--bogus".into()));
	assert_eq!(args("a.bin b.bin").unwrap_err().kind,
		ConfigErrorKind::UnknownFlag("b.bin".into()));
	assert_eq!(args("x.bin --ram").unwrap_err().kind,
		ConfigErrorKind::MissingValue("--ram".into()));
	assert_eq!(args("--ram 0xZZ x.bin").unwrap_err().kind,
		ConfigErrorKind::BadValue { flag: "--ram".into(), value: "0xZZ".into() });
	assert_eq!(args("--mode root x.bin").unwrap_err().kind,
		ConfigErrorKind::BadValue { flag: "--mode".into(), value: "root".into() });
	assert_eq!(args("--trap ADDF2=abort x.bin").unwrap_err().kind,
		ConfigErrorKind::BadValue { flag: "--trap".into(), value: "ADDF2=abort".into() });
}
