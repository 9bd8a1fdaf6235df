use delegate::delegate;
use log::{ debug, log_enabled, trace, warn, Level };
use parse_display::Display;
use smallvec::SmallVec;

use crate::arch::{ CpuResult, Fault, FaultKind, StepResult };
use crate::config::CpuConfig;
use crate::memory::{ IMemory, VA };
use super::{
	decode, is_escape, Alu, Cc, InstDesc, Instruction, MemoryPort, OpcodeBytes, Opcode,
	PortStats, Printer, ProcessorState, Psl, ResolvedOperand, Specifier,
};
use super::execute::{ Effects, Executor };
use super::operand::{ resolve_operand, CpuStream };
use super::IStream;

// ------------------------------------------------------------------------------------------------
// Stage
// ------------------------------------------------------------------------------------------------

/// Where the pipeline is in processing an instruction.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum Stage {
	/// Waiting to read the next opcode. Interrupts are sampled here.
	#[display("fetch")]         Fetch,
	/// Looking up the opcode.
	#[display("decode")]        Decode,
	/// Evaluating operand specifiers, left to right.
	#[display("operand fetch")] OperandFetch,
	/// Doing the operation.
	#[display("execute")]       Execute,
	/// Storing results.
	#[display("writeback")]     Writeback,
	/// Stopped on a fault, until someone acknowledges it.
	#[display("error")]         Error,
}

// ------------------------------------------------------------------------------------------------
// StepOutcome
// ------------------------------------------------------------------------------------------------

/// What happened during a `step`, if it didn't fault.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum StepOutcome {
	/// An instruction completed.
	#[display("retired {opcode} at {pc}")]
	Retired { opcode: Opcode, pc: VA },
	/// A HALT instruction completed; the processor won't go any further.
	#[display("halted at {pc}")]
	Halted { pc: VA },
	/// An interrupt above the current IPL is pending; nothing was fetched.
	#[display("interrupt at IPL {ipl}")]
	Interrupt { ipl: u8 },
}

// ------------------------------------------------------------------------------------------------
// IFaultSink
// ------------------------------------------------------------------------------------------------

/// Whoever handles exceptions: the pipeline tells it about every fault and trap, with the
/// processor state as of the fault.
pub trait IFaultSink {
	fn fault(&mut self, fault: &Fault, state: &ProcessorState);
}

// ------------------------------------------------------------------------------------------------
// Cpu
// ------------------------------------------------------------------------------------------------

/// The pipeline controller, and owner of the processor state.
pub struct Cpu<M: IMemory> {
	state:   ProcessorState,
	port:    MemoryPort<M>,
	alu:     Alu,
	config:  CpuConfig,
	stage:   Stage,
	fault:   Option<Fault>,
	sink:    Option<Box<dyn IFaultSink>>,
	irq:     Option<u8>,
	halted:  Option<VA>,
	retired: u64,
	printer: Printer,
}

impl<M: IMemory> Cpu<M> {
	/// Makes a CPU around a memory collaborator, with the reference ALU, and resets it.
	pub fn new(mem: M, config: CpuConfig) -> Self {
		Self::with_alu(mem, config, Alu::default())
	}

	/// Same, but with a specific ALU.
	pub fn with_alu(mem: M, config: CpuConfig, alu: Alu) -> Self {
		let mut ret = Self {
			state:   ProcessorState::new(),
			port:    MemoryPort::new(mem),
			alu,
			config,
			stage:   Stage::Fetch,
			fault:   None,
			sink:    None,
			irq:     None,
			halted:  None,
			retired: 0,
			printer: Printer::new(),
		};

		ret.reset();
		ret
	}

	/// Power-up: fresh processor state, PC and mode from the configuration.
	pub fn reset(&mut self) {
		self.state = ProcessorState::new();
		self.state.set_pc(self.config.reset_pc);

		let mut psl = Psl::default();
		psl.cur_mode = self.config.reset_mode;
		psl.prv_mode = self.config.reset_mode;
		self.state.set_psl(psl);

		self.stage  = Stage::Fetch;
		self.fault  = None;
		self.irq    = None;
		self.halted = None;
	}

	delegate! {
		to self.state {
			/// Reads a general register.
			pub fn reg(&self, r: u8) -> u32;
			/// Writes a general register.
			pub fn set_reg(&mut self, r: u8, val: u32);
			/// The program counter.
			pub fn pc(&self) -> VA;
			/// Sets the program counter.
			pub fn set_pc(&mut self, pc: VA);
			/// The condition codes.
			pub fn cc(&self) -> Cc;
			/// The whole PSL.
			pub fn psl(&self) -> Psl;
			/// Replaces the whole PSL.
			pub fn set_psl(&mut self, psl: Psl);
		}
	}

	delegate! {
		to self.port {
			/// How many memory requests of each kind have been made.
			#[call(stats)]
			pub fn port_stats(&self) -> PortStats;
			/// The memory collaborator.
			pub fn mem(&self) -> &M;
			/// The memory collaborator, mutably.
			pub fn mem_mut(&mut self) -> &mut M;
		}
	}

	/// The processor state.
	pub fn state(&self) -> &ProcessorState {
		&self.state
	}

	/// The processor state, mutably. For setting things up and for exception dispatch.
	pub fn state_mut(&mut self) -> &mut ProcessorState {
		&mut self.state
	}

	/// Which stage the pipeline is in.
	pub fn stage(&self) -> Stage {
		self.stage
	}

	/// The outstanding fault, if the pipeline is in the `Error` stage.
	pub fn fault(&self) -> Option<Fault> {
		self.fault
	}

	/// How many instructions have completed since the CPU was made.
	pub fn retired(&self) -> u64 {
		self.retired
	}

	/// Whether a HALT has stopped the processor.
	pub fn is_halted(&self) -> bool {
		self.halted.is_some()
	}

	/// Installs the exception sink.
	pub fn set_fault_sink(&mut self, sink: Box<dyn IFaultSink>) {
		self.sink = Some(sink);
	}

	/// Raises an external interrupt request at the given IPL. Replaces any earlier request.
	pub fn request_interrupt(&mut self, ipl: u8) {
		self.irq = Some(ipl & 0x1F);
	}

	/// Withdraws the external interrupt request.
	pub fn clear_interrupt(&mut self) {
		self.irq = None;
	}

	/// Leaves the `Error` stage. Returns the fault that was outstanding.
	pub fn acknowledge_fault(&mut self) -> Option<Fault> {
		let ret = self.fault.take();

		if ret.is_some() {
			self.enter(Stage::Fetch);
		}

		ret
	}

	// --------------------------------------------------------------------------------------------
	// Running

	/// Runs one instruction through every stage.
	///
	/// If the pipeline is in the `Error` stage, returns the outstanding fault again without
	/// doing anything.
	pub fn step(&mut self) -> StepResult<StepOutcome> {
		if let Some(fault) = self.fault {
			return Err(fault);
		}

		if let Some(pc) = self.halted {
			return Ok(StepOutcome::Halted { pc });
		}

		let start = self.state.pc();

		self.enter(Stage::Fetch);

		if let Some(ipl) = self.pending_interrupt() {
			trace!("interrupt pending at IPL {}", ipl);
			return Ok(StepOutcome::Interrupt { ipl });
		}

		let snapshot = self.state;

		match self.run_instruction(start) {
			Ok((desc, fx)) => {
				self.retired += 1;

				if let Some(kind) = fx.trap {
					let fault = Fault { kind, pc: start, next_pc: self.state.pc() };
					return Err(self.raise(fault));
				}

				self.enter(Stage::Fetch);

				if fx.halt {
					debug!("halted at {}", start);
					self.halted = Some(start);
					Ok(StepOutcome::Halted { pc: start })
				} else {
					Ok(StepOutcome::Retired { opcode: desc.opcode, pc: start })
				}
			}

			Err(kind) => {
				// back out everything the instruction did to the registers.
				self.state = snapshot;
				Err(self.raise(Fault { kind, pc: start, next_pc: start }))
			}
		}
	}

	/// Steps until something other than an ordinary instruction completion happens, or `limit`
	/// instructions have completed. Returns the last outcome, or `None` if `limit` is 0.
	pub fn run(&mut self, limit: usize) -> StepResult<Option<StepOutcome>> {
		let mut last = None;

		for _ in 0 .. limit {
			let outcome = self.step()?;
			last = Some(outcome);

			if !matches!(outcome, StepOutcome::Retired { .. }) {
				break;
			}
		}

		Ok(last)
	}

	// --------------------------------------------------------------------------------------------
	// Stages

	fn enter(&mut self, stage: Stage) {
		trace!("stage: {} -> {}", self.stage, stage);
		self.stage = stage;
	}

	fn raise(&mut self, fault: Fault) -> Fault {
		if fault.kind.is_trap() {
			debug!("{}", fault);
		} else {
			warn!("{}", fault);
		}

		self.enter(Stage::Error);
		self.fault = Some(fault);

		if let Some(sink) = self.sink.as_mut() {
			sink.fault(&fault, &self.state);
		}

		fault
	}

	/// The highest-priority interrupt that beats the current IPL, if any.
	fn pending_interrupt(&self) -> Option<u8> {
		let soft = self.state.pending_software_interrupt();
		let level = self.irq.max(soft)?;

		if level > self.state.ipl() { Some(level) } else { None }
	}

	fn run_instruction(&mut self, start: VA) -> CpuResult<(&'static InstDesc, Effects)> {
		let bytes = self.fetch()?;

		self.enter(Stage::Decode);
		let desc = decode(bytes).map_err(|_| FaultKind::IllegalInstruction)?;

		self.enter(Stage::OperandFetch);
		let (specs, ops) = self.fetch_operands(desc)?;

		if log_enabled!(Level::Debug) {
			let size = (self.state.pc() - start) as usize;
			let inst = Instruction::new(start, desc, specs, size);
			debug!("{}: {}", start, self.printer.fmt_instr(&inst));
		}

		self.enter(Stage::Execute);
		let fx = Executor {
			state:  &mut self.state,
			port:   &mut self.port,
			alu:    &self.alu,
			config: &self.config,
		}.execute(desc, &ops)?;

		self.enter(Stage::Writeback);
		self.writeback(&fx)?;

		Ok((desc, fx))
	}

	fn fetch(&mut self) -> CpuResult<OpcodeBytes> {
		let mut s = CpuStream { state: &mut self.state, port: &mut self.port };
		let b = s.next_u8()?;

		if is_escape(b) {
			Ok(OpcodeBytes::Escaped(b, s.next_u8()?))
		} else {
			Ok(OpcodeBytes::Single(b))
		}
	}

	fn fetch_operands(&mut self, desc: &InstDesc)
	-> CpuResult<(SmallVec<[Specifier; 6]>, SmallVec<[ResolvedOperand; 6]>)> {
		let read_values = !desc.is_decode_only();
		let mut specs = SmallVec::new();
		let mut ops = SmallVec::new();

		for &spec in desc.ops {
			let (sp, op) = resolve_operand(&mut self.state, &mut self.port, spec, read_values)?;
			specs.push(sp);
			ops.push(op);
		}

		Ok((specs, ops))
	}

	fn writeback(&mut self, fx: &Effects) -> CpuResult<()> {
		for (dst, val) in fx.writes.iter() {
			dst.write(&mut self.state, &mut self.port, *val)?;
		}

		if let Some(event) = fx.mmu {
			self.port.notify(event, &self.state.mmu_state());
		}

		Ok(())
	}
}
