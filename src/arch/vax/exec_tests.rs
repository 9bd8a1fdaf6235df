use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::arch::{ ArithTrap, Fault, FaultKind };
use crate::config::{ CpuConfig, TrapPolicy };
use crate::memory::{ Bus, DataSize, IMemory, MemAccess, MemFault, MemResult, MmuEvent, MmuState, VA };

// ------------------------------------------------------------------------------------------------
// Harness
// ------------------------------------------------------------------------------------------------

/// Programs are assembled by hand and loaded here.
const ORG: u32 = 0x2000;
const STACK: u32 = 0x8000;

fn cpu_with(code: &[u8], config: CpuConfig) -> Cpu<Bus> {
	let mut bus = Bus::new(0x10000);
	bus.load(VA(ORG), code).unwrap();

	let mut cpu = Cpu::new(bus, CpuConfig { reset_pc: VA(ORG), ..config });
	cpu.set_reg(SP, STACK);
	cpu
}

fn cpu(code: &[u8]) -> Cpu<Bus> {
	cpu_with(code, CpuConfig::default())
}

fn user_cpu(code: &[u8]) -> Cpu<Bus> {
	cpu_with(code, CpuConfig { reset_mode: AccessMode::User, ..CpuConfig::default() })
}

fn peek(cpu: &mut Cpu<Bus>, addr: u32) -> u32 {
	cpu.mem_mut().read(VA(addr), DataSize::Long, &MmuState::default()).unwrap() as u32
}

fn poke(cpu: &mut Cpu<Bus>, addr: u32, val: u32) {
	cpu.mem_mut().write(VA(addr), DataSize::Long, val as u64, &MmuState::default()).unwrap();
}

fn retired(opcode: Opcode, pc: u32) -> StepOutcome {
	StepOutcome::Retired { opcode, pc: VA(pc) }
}

fn fault(kind: FaultKind, pc: u32, next_pc: u32) -> Fault {
	Fault { kind, pc: VA(pc), next_pc: VA(next_pc) }
}

/// Collects every fault the pipeline reports.
#[derive(Default, Clone)]
struct FaultLog(Rc<RefCell<Vec<(Fault, AccessMode)>>>);

impl IFaultSink for FaultLog {
	fn fault(&mut self, fault: &Fault, state: &ProcessorState) {
		self.0.borrow_mut().push((*fault, state.mode()));
	}
}

/// RAM that remembers the MMU events it hears about.
struct MmuLog {
	bus:    Bus,
	events: Vec<MmuEvent>,
}

impl IMemory for MmuLog {
	fn read(&mut self, addr: VA, size: DataSize, mmu: &MmuState) -> MemResult<u64> {
		self.bus.read(addr, size, mmu)
	}

	fn write(&mut self, addr: VA, size: DataSize, val: u64, mmu: &MmuState) -> MemResult<()> {
		self.bus.write(addr, size, val, mmu)
	}

	fn mmu_event(&mut self, event: MmuEvent, _mmu: &MmuState) {
		self.events.push(event);
	}
}

// ------------------------------------------------------------------------------------------------
// Data movement and operand fetch
// ------------------------------------------------------------------------------------------------

#[test]
fn move_literal() {
	// MOVL S^#42, R1
	let mut cpu = cpu(&[0xD0, 0x2A, 0x51]);
	cpu.state_mut().set_cc(Cc::N | Cc::Z | Cc::V | Cc::C);

	assert_eq!(cpu.step(), Ok(retired(Opcode::MOVL, ORG)));
	assert_eq!(cpu.reg(1), 42);
	assert_eq!(cpu.pc(), VA(ORG + 3));
	assert_eq!(cpu.cc(), Cc::C);
	assert_eq!(cpu.stage(), Stage::Fetch);
	assert_eq!(cpu.retired(), 1);

	let stats = cpu.port_stats();
	assert_eq!(stats.istream, 3);
	assert_eq!(stats.reads, 0);
	assert_eq!(stats.writes, 0);
	assert_eq!(stats.total(), 3);
}

#[test]
fn move_immediate() {
	// MOVL I^#^X2A, R1
	let mut cpu = cpu(&[0xD0, 0x8F, 0x2A, 0x00, 0x00, 0x00, 0x51]);
	cpu.step().unwrap();

	assert_eq!(cpu.reg(1), 42);
	assert_eq!(cpu.pc(), VA(ORG + 7));
	assert_eq!(cpu.port_stats().istream, 4);
	assert_eq!(cpu.port_stats().reads, 0);
}

#[test]
fn add_three_operand() {
	// ADDL3 R1, R2, R3
	let mut cpu = cpu(&[0xC1, 0x51, 0x52, 0x53]);
	cpu.set_reg(1, 5);
	cpu.set_reg(2, 7);
	cpu.state_mut().set_cc(Cc::N | Cc::Z | Cc::V | Cc::C);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(3), 12);
	assert_eq!(cpu.cc(), Cc::empty());
}

#[test]
fn store_displacement() {
	// MOVL R1, B^100(R2)
	let mut cpu = cpu(&[0xD0, 0x51, 0xA2, 0x64]);
	cpu.set_reg(1, 0xDEAD_BEEF);
	cpu.set_reg(2, 0x1000);

	cpu.step().unwrap();
	assert_eq!(cpu.mem().slice(VA(0x1064), 4).unwrap(), &[0xEF, 0xBE, 0xAD, 0xDE]);
	assert_eq!(cpu.port_stats().writes, 1);
	assert_eq!(cpu.port_stats().reads, 0);
	assert_eq!(cpu.cc(), Cc::N);
}

#[test]
fn compare_only_sets_codes() {
	// CMPL S^#5, R1
	let mut cpu = cpu(&[0xD1, 0x05, 0x51]);
	cpu.set_reg(1, 5);

	cpu.step().unwrap();
	assert_eq!(cpu.cc(), Cc::Z);
	assert_eq!(cpu.reg(1), 5);
	assert_eq!(cpu.port_stats().writes, 0);
}

#[test]
fn same_register_autoincrement_twice() {
	// MOVL (R2)+, (R2)+
	let mut cpu = cpu(&[0xD0, 0x82, 0x82]);
	cpu.set_reg(2, 0x1000);
	poke(&mut cpu, 0x1000, 0x1111_1111);
	poke(&mut cpu, 0x1004, 0x2222_2222);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(2), 0x1008);
	assert_eq!(peek(&mut cpu, 0x1004), 0x1111_1111);
}

#[test]
fn autoincrement_then_autodecrement() {
	// ADDL2 (R3)+, -(R3)
	let mut cpu = cpu(&[0xC0, 0x83, 0x73]);
	cpu.set_reg(3, 0x1000);
	poke(&mut cpu, 0x1000, 3);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(3), 0x1000);
	assert_eq!(peek(&mut cpu, 0x1000), 6);
}

#[test]
fn deferred_reads_are_counted() {
	// MOVL @(R2)+, R1
	let mut cpu = cpu(&[0xD0, 0x92, 0x51]);
	cpu.set_reg(2, 0x1000);
	poke(&mut cpu, 0x1000, 0x1100);
	poke(&mut cpu, 0x1100, 9);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(1), 9);
	assert_eq!(cpu.reg(2), 0x1004);
	assert_eq!(cpu.port_stats().reads, 2);
}

#[test]
fn indexed_source() {
	// MOVL B^0(R2)[R3], R1
	let mut cpu = cpu(&[0xD0, 0x43, 0xA2, 0x00, 0x51]);
	cpu.set_reg(2, 0x1000);
	cpu.set_reg(3, 2);
	poke(&mut cpu, 0x1008, 77);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(1), 77);
}

#[test]
fn push_and_address_moves() {
	// PUSHL R1; MOVAL B^8(R2), R3; MOVAO (R1), R4
	let mut cpu = cpu(&[0xDD, 0x51, 0xDE, 0xA2, 0x08, 0x53, 0xFD, 0x7E, 0x61, 0x54]);
	cpu.set_reg(1, 0x1234);
	cpu.set_reg(2, 0x3000);

	cpu.run(3).unwrap();
	assert_eq!(cpu.reg(SP), STACK - 4);
	assert_eq!(peek(&mut cpu, STACK - 4), 0x1234);
	assert_eq!(cpu.reg(3), 0x3008);
	assert_eq!(cpu.reg(4), 0x1234);
}

#[test]
fn quad_moves_use_register_pairs() {
	// MOVQ R0, R6; CLRQ R0
	let mut cpu = cpu(&[0x7D, 0x50, 0x56, 0x7C, 0x50]);
	cpu.set_reg(0, 0x1111);
	cpu.set_reg(1, 0x2222);

	cpu.run(2).unwrap();
	assert_eq!(cpu.reg(6), 0x1111);
	assert_eq!(cpu.reg(7), 0x2222);
	assert_eq!((cpu.reg(0), cpu.reg(1)), (0, 0));
	assert_eq!(cpu.cc(), Cc::Z);
}

#[test]
fn byte_destinations_keep_the_rest_of_the_register() {
	// MOVB S^#7, R0; MOVZBL R0, R1
	let mut cpu = cpu(&[0x90, 0x07, 0x50, 0x9A, 0x50, 0x51]);
	cpu.set_reg(0, 0xFFFF_FF00);
	cpu.set_reg(1, 0xFFFF_FFFF);

	cpu.run(2).unwrap();
	assert_eq!(cpu.reg(0), 0xFFFF_FF07);
	assert_eq!(cpu.reg(1), 7);
}

// ------------------------------------------------------------------------------------------------
// Arithmetic
// ------------------------------------------------------------------------------------------------

#[test]
fn divide_by_zero_aborts_by_default() {
	// DIVL2 R1, R2
	let mut cpu = cpu(&[0xC6, 0x51, 0x52]);
	cpu.set_reg(1, 0);
	cpu.set_reg(2, 100);

	let expected = fault(FaultKind::Arithmetic(ArithTrap::IntegerDivideByZero), ORG, ORG);
	assert_eq!(cpu.step(), Err(expected));
	assert_eq!(cpu.reg(2), 100);
	assert_eq!(cpu.pc(), VA(ORG));
}

#[test]
fn divide_by_zero_can_just_flag() {
	let mut config = CpuConfig::default();
	config.traps.insert(Opcode::DIVL2, TrapPolicy::Flag);

	let mut cpu = cpu_with(&[0xC6, 0x51, 0x52], config);
	cpu.set_reg(1, 0);
	cpu.set_reg(2, 100);

	assert_eq!(cpu.step(), Ok(retired(Opcode::DIVL2, ORG)));
	assert_eq!(cpu.reg(2), 100);
	assert!(cpu.cc().contains(Cc::V));
}

#[test]
fn overflow_flags_by_default() {
	// ADDL2 R1, R2
	let mut cpu = cpu(&[0xC0, 0x51, 0x52]);
	cpu.set_reg(1, 1);
	cpu.set_reg(2, 0x7FFF_FFFF);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(2), 0x8000_0000);
	assert_eq!(cpu.cc(), Cc::N | Cc::V);
}

#[test]
fn extended_multiply_and_divide() {
	// EMUL R1, R2, S^#0, R4; EDIV S^#16, R4, R6, R7
	let mut cpu = cpu(&[0x7A, 0x51, 0x52, 0x00, 0x54, 0x7B, 0x10, 0x54, 0x56, 0x57]);
	cpu.set_reg(1, 0x10000);
	cpu.set_reg(2, 0x10000);

	cpu.run(2).unwrap();
	assert_eq!((cpu.reg(4), cpu.reg(5)), (0, 1));
	assert_eq!(cpu.reg(6), 0x1000_0000);
	assert_eq!(cpu.reg(7), 0);
}

#[test]
fn index_keeps_the_low_longword() {
	// INDEX R1, R2, R3, R4, R5, R6
	let code = [0x0A, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56];
	let mut cpu = cpu(&code);
	cpu.set_reg(1, 0x8000_0000);
	cpu.set_reg(2, 0x8000_0000);
	cpu.set_reg(3, 0x7FFF_FFFF);
	cpu.set_reg(4, 0x8000_0000);
	cpu.set_reg(5, 0x8000_0000);
	cpu.set_reg(6, 0xFFFF_FFFF);
	cpu.state_mut().set_cc(Cc::V | Cc::C);

	assert_eq!(cpu.step(), Ok(retired(Opcode::INDEX, ORG)));
	assert_eq!(cpu.reg(6), 0);
	assert_eq!(cpu.cc(), Cc::Z);

	// subscript out of range aborts by default
	let mut cpu = self::cpu(&code);
	cpu.set_reg(1, 10);
	cpu.set_reg(3, 9);
	let kind = FaultKind::Arithmetic(ArithTrap::SubscriptRange);
	assert_eq!(cpu.step(), Err(fault(kind, ORG, ORG)));
}

#[test]
fn adawi_needs_an_aligned_word() {
	// ADAWI S^#1, (R1)
	let mut cpu = cpu(&[0x58, 0x01, 0x61]);
	cpu.set_reg(1, 0x1001);
	assert_eq!(cpu.step(), Err(fault(FaultKind::ReservedOperand, ORG, ORG)));
}

// ------------------------------------------------------------------------------------------------
// Control flow
// ------------------------------------------------------------------------------------------------

#[test]
fn branch_byte() {
	// BRB .+12
	let mut cpu = cpu(&[0x11, 0x0A]);
	cpu.step().unwrap();
	assert_eq!(cpu.pc(), VA(0x200C));
}

#[test]
fn conditional_branch_not_taken() {
	// BEQL .+12
	let mut cpu = cpu(&[0x13, 0x0A]);
	cpu.step().unwrap();
	assert_eq!(cpu.pc(), VA(0x2002));
}

#[test]
fn subroutine_call_and_return() {
	// JSB @#^X3000; HALT
	let mut cpu = cpu(&[0x16, 0x9F, 0x00, 0x30, 0x00, 0x00, 0x00]);
	// INCL R0; RSB
	cpu.mem_mut().load(VA(0x3000), &[0xD6, 0x50, 0x05]).unwrap();

	assert_eq!(cpu.run(10), Ok(Some(StepOutcome::Halted { pc: VA(0x2006) })));
	assert_eq!(cpu.reg(0), 1);
	assert_eq!(cpu.reg(SP), STACK);
	assert_eq!(peek(&mut cpu, STACK - 4), 0x2006);
	assert_eq!(cpu.retired(), 4);
	assert!(cpu.is_halted());

	// stays halted, and keeps reporting where
	assert_eq!(cpu.step(), Ok(StepOutcome::Halted { pc: VA(0x2006) }));
	assert_eq!(cpu.step(), Ok(StepOutcome::Halted { pc: VA(0x2006) }));
	assert_eq!(cpu.pc(), VA(0x2007));
	assert_eq!(cpu.retired(), 4);
}

#[test]
fn branch_to_subroutine() {
	// BSBB .+6; HALT; NOP; NOP; NOP; RSB
	let mut cpu = cpu(&[0x10, 0x04, 0x00, 0x01, 0x01, 0x01, 0x05]);
	assert_eq!(cpu.run(10), Ok(Some(StepOutcome::Halted { pc: VA(0x2002) })));
}

#[test]
fn subtract_one_loop() {
	// 1$: INCL R1; SOBGTR R0, 1$; HALT
	let mut cpu = cpu(&[0xD6, 0x51, 0xF5, 0x50, 0xFB, 0x00]);
	cpu.set_reg(0, 3);

	assert_eq!(cpu.run(100), Ok(Some(StepOutcome::Halted { pc: VA(0x2005) })));
	assert_eq!(cpu.reg(1), 3);
	assert_eq!(cpu.reg(0), 0);
	assert_eq!(cpu.retired(), 7);
}

#[test]
fn add_one_loop() {
	// 1$: INCL R1; AOBLSS S^#3, R0, 1$; HALT
	let mut cpu = cpu(&[0xD6, 0x51, 0xF2, 0x03, 0x50, 0xFA, 0x00]);

	assert_eq!(cpu.run(100), Ok(Some(StepOutcome::Halted { pc: VA(0x2006) })));
	assert_eq!(cpu.reg(1), 3);
	assert_eq!(cpu.reg(0), 3);
}

#[test]
fn add_compare_loop() {
	// 1$: INCL R1; ACBL S^#10, S^#2, R0, 1$; HALT
	let mut cpu = cpu(&[0xD6, 0x51, 0xF1, 0x0A, 0x02, 0x50, 0xF8, 0xFF, 0x00]);

	assert_eq!(cpu.run(100), Ok(Some(StepOutcome::Halted { pc: VA(0x2008) })));
	assert_eq!(cpu.reg(1), 6);
	assert_eq!(cpu.reg(0), 12);
}

#[test]
fn case_table() {
	// CASEL R0, S^#0, S^#2 followed by three word displacements
	let code = [0xCF, 0x50, 0x00, 0x02, 0x10, 0x00, 0x20, 0x00, 0x30, 0x00];

	let mut cpu = self::cpu(&code);
	cpu.set_reg(0, 1);
	cpu.step().unwrap();
	assert_eq!(cpu.pc(), VA(0x2024));

	// out of range falls through past the table
	let mut cpu = self::cpu(&code);
	cpu.set_reg(0, 5);
	cpu.step().unwrap();
	assert_eq!(cpu.pc(), VA(0x200A));

	let mut cpu = self::cpu(&code);
	cpu.set_reg(0, 0xFFFF_FFFF);
	cpu.step().unwrap();
	assert_eq!(cpu.pc(), VA(0x200A));
}

#[test]
fn push_and_pop_registers() {
	// PUSHR #^M<R0,R1,R2>; CLRL R0; CLRL R1; CLRL R2; POPR #^M<R0,R1,R2>; HALT
	let mut cpu = cpu(&[0xBB, 0x07, 0xD4, 0x50, 0xD4, 0x51, 0xD4, 0x52, 0xBA, 0x07, 0x00]);
	cpu.set_reg(0, 1);
	cpu.set_reg(1, 2);
	cpu.set_reg(2, 3);

	cpu.step().unwrap();
	assert_eq!(cpu.reg(SP), STACK - 12);
	assert_eq!(peek(&mut cpu, STACK - 12), 1);
	assert_eq!(peek(&mut cpu, STACK - 4), 3);

	cpu.run(10).unwrap();
	assert_eq!((cpu.reg(0), cpu.reg(1), cpu.reg(2)), (1, 2, 3));
	assert_eq!(cpu.reg(SP), STACK);
}

#[test]
fn psw_bits() {
	// BISPSW S^#1; MOVPSL R0; BICPSW S^#1; BISPSW I^#^X100
	let mut cpu = cpu(&[0xB8, 0x01, 0xDC, 0x50, 0xB9, 0x01, 0xB8, 0x8F, 0x00, 0x01]);

	cpu.step().unwrap();
	assert_eq!(cpu.cc(), Cc::C);
	cpu.step().unwrap();
	assert_eq!(cpu.reg(0), 1);
	cpu.step().unwrap();
	assert_eq!(cpu.cc(), Cc::empty());

	assert_eq!(cpu.step(), Err(fault(FaultKind::ReservedOperand, 0x2006, 0x2006)));
}

// ------------------------------------------------------------------------------------------------
// Privileged instructions
// ------------------------------------------------------------------------------------------------

#[test]
fn processor_registers() {
	// MTPR S^#5, S^#IPL; MFPR S^#SID, R0
	let mut cpu = cpu(&[0xDA, 0x05, 0x12, 0xDB, 0x3E, 0x50]);

	cpu.run(2).unwrap();
	assert_eq!(cpu.psl().ipl, 5);
	assert_eq!(cpu.reg(0), SYSTEM_ID);
}

#[test]
fn privileged_outside_kernel() {
	// MTPR S^#5, S^#IPL
	let mut cpu = user_cpu(&[0xDA, 0x05, 0x12]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::PrivilegedInstruction, ORG, ORG)));
	assert_eq!(cpu.psl().ipl, 0);

	// HALT
	let mut cpu = user_cpu(&[0x00]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::PrivilegedInstruction, ORG, ORG)));
	assert!(!cpu.is_halted());
}

#[test]
fn unknown_processor_register() {
	// MTPR S^#0, S^#5
	let mut cpu = cpu(&[0xDA, 0x00, 0x05]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::ReservedOperand, ORG, ORG)));
}

#[test]
fn mapping_changes_reach_memory() {
	// MTPR S^#1, S^#MAPEN; MTPR S^#0, S^#TBIA; MTPR I^#^X1000, S^#TBIS; MTPR S^#3, S^#IPL
	let code = [
		0xDA, 0x01, 0x38,
		0xDA, 0x00, 0x39,
		0xDA, 0x8F, 0x00, 0x10, 0x00, 0x00, 0x3A,
		0xDA, 0x03, 0x12,
	];

	let mut bus = Bus::new(0x10000);
	bus.load(VA(ORG), &code).unwrap();
	let mem = MmuLog { bus, events: Vec::new() };
	let mut cpu = Cpu::new(mem, CpuConfig { reset_pc: VA(ORG), ..CpuConfig::default() });

	cpu.run(4).unwrap();
	assert_eq!(cpu.mem().events, vec![
		MmuEvent::MappingChanged,
		MmuEvent::InvalidateAll,
		MmuEvent::InvalidateSingle(VA(0x1000)),
	]);
	assert!(cpu.state().mmu_state().mapen);
}

// ------------------------------------------------------------------------------------------------
// Faults and traps
// ------------------------------------------------------------------------------------------------

#[test]
fn reserved_addressing_mode_is_sticky() {
	// MOVL -(PC), R1
	let mut cpu = cpu(&[0xD0, 0x7F, 0x51]);
	cpu.set_reg(1, 0x55);

	let expected = fault(FaultKind::ReservedAddressingMode, ORG, ORG);
	assert_eq!(cpu.step(), Err(expected));
	assert_eq!(cpu.stage(), Stage::Error);
	assert_eq!(cpu.pc(), VA(ORG));
	assert_eq!(cpu.reg(1), 0x55);

	// nothing moves until it's acknowledged
	assert_eq!(cpu.step(), Err(expected));
	assert_eq!(cpu.fault(), Some(expected));
	assert_eq!(cpu.retired(), 0);

	assert_eq!(cpu.acknowledge_fault(), Some(expected));
	assert_eq!(cpu.stage(), Stage::Fetch);
	assert_eq!(cpu.fault(), None);
	assert_eq!(cpu.acknowledge_fault(), None);
}

#[test]
fn bad_operand_combinations() {
	// MOVQ SP, R0
	let mut cpu = cpu(&[0x7D, 0x5E, 0x50]);
	assert_eq!(cpu.step().unwrap_err().kind, FaultKind::ReservedAddressingMode);

	// MOVL R0, S^#1
	let mut cpu = self::cpu(&[0xD0, 0x50, 0x01]);
	assert_eq!(cpu.step().unwrap_err().kind, FaultKind::ReservedAddressingMode);
}

#[test]
fn faults_roll_back_registers() {
	// MOVL (R2)+, @#^X00F00000
	let mut cpu = cpu(&[0xD0, 0x82, 0x9F, 0x00, 0x00, 0xF0, 0x00]);
	cpu.set_reg(2, 0x1000);
	cpu.state_mut().set_cc(Cc::V);

	let kind = FaultKind::Memory(MemFault::non_existent(VA(0x00F0_0000), MemAccess::Write));
	assert_eq!(cpu.step(), Err(fault(kind, ORG, ORG)));
	assert_eq!(cpu.reg(2), 0x1000);
	assert_eq!(cpu.pc(), VA(ORG));
	assert_eq!(cpu.cc(), Cc::V);
}

#[test]
fn reserved_opcodes_are_illegal() {
	let mut cpu = cpu(&[0x40, 0x51, 0x52]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::IllegalInstruction, ORG, ORG)));

	let mut cpu = self::cpu(&[0xFD, 0x00]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::IllegalInstruction, ORG, ORG)));
	assert_eq!(cpu.pc(), VA(ORG));
}

#[test]
fn decode_only_instructions() {
	// MOVC3 S^#4, (R1), (R2)
	let mut cpu = cpu(&[0x28, 0x04, 0x61, 0x62]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::Unimplemented, ORG, ORG)));
	assert_eq!(cpu.port_stats().reads, 0);

	// CLRO (R1)
	let mut cpu = self::cpu(&[0xFD, 0x7C, 0x61]);
	assert_eq!(cpu.step().unwrap_err().kind, FaultKind::Unimplemented);
}

#[test]
fn breakpoint() {
	let mut cpu = cpu(&[0x03]);
	assert_eq!(cpu.step(), Err(fault(FaultKind::Breakpoint, ORG, ORG)));
}

#[test]
fn change_mode_traps_after_completing() {
	let log = FaultLog::default();

	// CHMK S^#3
	let mut cpu = user_cpu(&[0xBC, 0x03]);
	cpu.set_fault_sink(Box::new(log.clone()));

	let kind = FaultKind::ChangeMode { mode: AccessMode::Kernel, code: 3 };
	assert_eq!(cpu.step(), Err(fault(kind, ORG, ORG + 2)));
	assert_eq!(cpu.pc(), VA(ORG + 2));
	assert_eq!(cpu.retired(), 1);
	assert_eq!(cpu.stage(), Stage::Error);
	assert_eq!(*log.0.borrow(), vec![(fault(kind, ORG, ORG + 2), AccessMode::User)]);
	assert!(kind.is_trap());
	assert!(!FaultKind::Breakpoint.is_trap());

	// can't go to a less privileged mode this way
	let mut cpu = self::cpu(&[0xBF, 0x07]);
	let kind = FaultKind::ChangeMode { mode: AccessMode::Kernel, code: 7 };
	assert_eq!(cpu.step().unwrap_err().kind, kind);
}

#[test]
fn run_stops_at_a_fault() {
	// NOP; NOP; BPT
	let mut cpu = cpu(&[0x01, 0x01, 0x03]);
	assert_eq!(cpu.run(10), Err(fault(FaultKind::Breakpoint, 0x2002, 0x2002)));
	assert_eq!(cpu.retired(), 2);
}

#[test]
fn run_with_no_limit_does_nothing() {
	let mut cpu = cpu(&[0x01, 0x00]);
	assert_eq!(cpu.run(0), Ok(None));
	assert_eq!(cpu.pc(), VA(ORG));
	assert_eq!(cpu.retired(), 0);

	assert_eq!(cpu.run(1), Ok(Some(retired(Opcode::NOP, ORG))));
}

// ------------------------------------------------------------------------------------------------
// Interrupts and reset
// ------------------------------------------------------------------------------------------------

#[test]
fn interrupts_are_sampled_at_fetch() {
	let mut cpu = cpu(&[0x01, 0x01]);

	cpu.request_interrupt(5);
	assert_eq!(cpu.step(), Ok(StepOutcome::Interrupt { ipl: 5 }));
	assert_eq!(cpu.pc(), VA(ORG));
	assert_eq!(cpu.retired(), 0);

	// masked
	let mut psl = cpu.psl();
	psl.ipl = 0x1F;
	cpu.set_psl(psl);
	assert_eq!(cpu.step(), Ok(retired(Opcode::NOP, ORG)));

	cpu.clear_interrupt();
	psl.ipl = 0;
	cpu.set_psl(psl);
	assert_eq!(cpu.step(), Ok(retired(Opcode::NOP, ORG + 1)));
}

#[test]
fn software_interrupts() {
	// MTPR S^#3, S^#SIRR; NOP
	let mut cpu = cpu(&[0xDA, 0x03, 0x14, 0x01]);

	cpu.step().unwrap();
	assert_eq!(cpu.step(), Ok(StepOutcome::Interrupt { ipl: 3 }));
}

#[test]
fn reset_starts_over() {
	let mut cpu = cpu(&[0x03]);
	cpu.set_reg(3, 99);
	cpu.step().unwrap_err();

	cpu.reset();
	assert_eq!(cpu.pc(), VA(ORG));
	assert_eq!(cpu.reg(3), 0);
	assert_eq!(cpu.stage(), Stage::Fetch);
	assert_eq!(cpu.fault(), None);
	assert_eq!(cpu.psl().cur_mode, AccessMode::Kernel);
}
