use smallvec::SmallVec;

use crate::arch::{ CpuResult, FaultKind };
use crate::config::{ CpuConfig, TrapPolicy };
use crate::memory::{ DataSize, IMemory, MmuEvent, VA };
use super::{
	Access, Alu, AluOp, AluOutput, AccessMode, Cc, IAlu, InstClass, InstDesc, MemoryPort,
	OpSpec, Opcode, Operand, ProcessorState, ResolvedOperand, PC, SP,
};

// ------------------------------------------------------------------------------------------------
// Effects
// ------------------------------------------------------------------------------------------------

/// What Execute leaves for Writeback to do.
#[derive(Debug, Default)]
pub(super) struct Effects {
	/// Destination operands and stack pushes, in the order they get stored.
	pub writes: SmallVec<[(ResolvedOperand, u64); 4]>,
	/// A memory-management register changed.
	pub mmu:    Option<MmuEvent>,
	/// A trap to report once the instruction has completed.
	pub trap:   Option<FaultKind>,
	/// HALT.
	pub halt:   bool,
}

impl Effects {
	fn write(&mut self, dst: &ResolvedOperand, val: u64) {
		self.writes.push((*dst, val));
	}
}

// ------------------------------------------------------------------------------------------------
// Branch predicates
// ------------------------------------------------------------------------------------------------

/// For the simple conditional (and unconditional) branches, whether the branch is taken.
/// `None` if `opcode` isn't one of those.
pub fn branch_taken(opcode: Opcode, cc: Cc) -> Option<bool> {
	use Opcode::*;

	let (n, z, v, c) = (cc.contains(Cc::N), cc.contains(Cc::Z), cc.contains(Cc::V), cc.contains(Cc::C));

	Some(match opcode {
		BRB | BRW => true,
		BNEQ  => !z,
		BEQL  => z,
		BGTR  => !(n || z),
		BLEQ  => n || z,
		BGEQ  => !n,
		BLSS  => n,
		BGTRU => !(c || z),
		BLEQU => c || z,
		BVC   => !v,
		BVS   => v,
		BGEQU => !c,
		BLSSU => c,
		_ => return None,
	})
}

// ------------------------------------------------------------------------------------------------
// Executor
// ------------------------------------------------------------------------------------------------

/// Runs the execute stage of one instruction. Register side effects (PC, SP, condition codes)
/// happen right away; stores are collected in `Effects` for writeback.
pub(super) struct Executor<'a, M: IMemory> {
	pub state:  &'a mut ProcessorState,
	pub port:   &'a mut MemoryPort<M>,
	pub alu:    &'a Alu,
	pub config: &'a CpuConfig,
}

impl<M: IMemory> Executor<'_, M> {
	pub fn execute(&mut self, desc: &InstDesc, ops: &[ResolvedOperand]) -> CpuResult<Effects> {
		let mut fx = Effects::default();

		// descriptors fix the operand count, but don't index past what we were given.
		if ops.len() != desc.num_ops() {
			return Err(FaultKind::IllegalInstruction);
		}

		match desc.class {
			InstClass::Move       => self.exec_move(desc.opcode, ops, &mut fx)?,
			InstClass::Arith2     => self.exec_arith2(desc.opcode, ops, &mut fx)?,
			InstClass::Arith3     => self.exec_arith3(desc.opcode, ops, &mut fx)?,
			InstClass::Logical    => self.exec_logical(desc.opcode, ops, &mut fx)?,
			InstClass::Compare    => self.exec_compare(desc.opcode, ops)?,
			InstClass::Branch     => self.exec_branch(desc.opcode, ops, &mut fx)?,
			InstClass::JumpSub    => self.exec_jump(desc.opcode, ops, &mut fx)?,
			InstClass::Privileged => self.exec_privileged(desc.opcode, ops, &mut fx)?,
			InstClass::Shift      => self.exec_shift(desc.opcode, ops, &mut fx)?,
			InstClass::Control    => self.exec_control(desc.opcode, ops, &mut fx)?,

			InstClass::String | InstClass::Decimal | InstClass::Queue | InstClass::BitField
			| InstClass::System => return Err(FaultKind::Unimplemented),
		}

		Ok(fx)
	}

	// --------------------------------------------------------------------------------------------
	// Helpers

	/// Runs the ALU, applies the opcode's trap policy, and updates the condition codes.
	fn alu(&mut self, opcode: Opcode, op: AluOp, args: &[u64], size: DataSize)
	-> CpuResult<AluOutput> {
		let out = self.alu.apply(op, args, size, self.state.cc());

		if let Some(trap) = out.trap {
			if self.config.trap_policy(opcode) == TrapPolicy::Abort {
				return Err(FaultKind::Arithmetic(trap));
			}
		}

		self.state.set_cc(out.cc);
		Ok(out)
	}

	/// Like `alu`, but C comes through untouched. Loop branches work this way.
	fn alu_keep_c(&mut self, opcode: Opcode, op: AluOp, args: &[u64], size: DataSize)
	-> CpuResult<AluOutput> {
		let c = self.state.cc() & Cc::C;
		let out = self.alu(opcode, op, args, size)?;
		self.state.set_cc((out.cc - Cc::C) | c);
		Ok(out)
	}

	/// N and Z from a moved value, V cleared, C untouched.
	fn set_move_cc(&mut self, val: u64, size: DataSize) {
		let c = self.state.cc() & Cc::C;
		self.state.set_cc(Cc::nz(val, size) | c);
	}

	fn jump(&mut self, target: u64) {
		self.state.set_pc(VA(target as u32));
	}

	/// Pushes a longword: SP moves now, the store waits for writeback.
	fn push(&mut self, fx: &mut Effects, val: u32) {
		let sp = self.state.sp().wrapping_sub(4);
		self.state.set_reg(SP, sp);

		let slot = ResolvedOperand {
			operand: Operand::Memory(VA(sp)),
			spec:    OpSpec::new(Access::Write, DataSize::Long),
			value:   None,
		};

		fx.write(&slot, val as u64);
	}

	fn pop(&mut self) -> CpuResult<u32> {
		let sp = self.state.sp();
		let val = self.port.read(VA(sp), DataSize::Long, &self.state.mmu_state())?;
		self.state.set_reg(SP, sp.wrapping_add(4));
		Ok(val as u32)
	}

	// --------------------------------------------------------------------------------------------
	// Instruction classes

	fn exec_move(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		match opcode {
			// only the low quadword of an octaword fits through the datapath.
			MOVO | CLRO => return Err(FaultKind::Unimplemented),

			MOVB | MOVW | MOVL | MOVQ => {
				let out = self.alu(opcode, AluOp::Mov, &[ops[0].val()], ops[0].spec.size)?;
				fx.write(&ops[1], out.value);
			}

			CLRB | CLRW | CLRL | CLRQ => {
				self.set_move_cc(0, ops[0].spec.size);
				fx.write(&ops[0], 0);
			}

			MOVZBW | MOVZBL | MOVZWL => {
				let out = self.alu(opcode, AluOp::MovZ, &[ops[0].val()], ops[1].spec.size)?;
				fx.write(&ops[1], out.value);
			}

			CVTBW | CVTBL | CVTWB | CVTWL | CVTLB | CVTLW => {
				let dst = ops[1].spec.size;
				let out = self.alu(opcode, AluOp::Cvt(dst), &[ops[0].val()], ops[0].spec.size)?;
				fx.write(&ops[1], out.value);
			}

			MOVAB | MOVAW | MOVAL | MOVAQ | MOVAO => {
				let addr = ops[0].val();
				self.set_move_cc(addr, DataSize::Long);
				fx.write(&ops[1], addr);
			}

			PUSHAB | PUSHAW | PUSHAL | PUSHAQ | PUSHAO | PUSHL => {
				let val = ops[0].val();
				self.set_move_cc(val, DataSize::Long);
				self.push(fx, val as u32);
			}

			_ => return Err(FaultKind::IllegalInstruction),
		}

		Ok(())
	}

	fn exec_arith2(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		let op = match opcode {
			ADDB2 | ADDW2 | ADDL2 | INCB | INCW | INCL | ADAWI => AluOp::Add,
			SUBB2 | SUBW2 | SUBL2 | DECB | DECW | DECL => AluOp::Sub,
			MULB2 | MULW2 | MULL2 => AluOp::Mul,
			DIVB2 | DIVW2 | DIVL2 => AluOp::Div,
			MNEGB | MNEGW | MNEGL => AluOp::Neg,
			ADWC => AluOp::Adwc,
			SBWC => AluOp::Sbwc,
			_ => return Err(FaultKind::IllegalInstruction),
		};

		let (args, dst): ([u64; 2], _) = match opcode {
			INCB | INCW | INCL | DECB | DECW | DECL => ([ops[0].val(), 1], &ops[0]),
			MNEGB | MNEGW | MNEGL => ([ops[0].val(), 0], &ops[1]),
			_ => ([ops[1].val(), ops[0].val()], &ops[1]),
		};

		if opcode == ADAWI {
			if let Some(addr) = dst.address() {
				if addr.0 & 1 != 0 {
					return Err(FaultKind::ReservedOperand);
				}
			}
		}

		let out = self.alu(opcode, op, &args, dst.spec.size)?;
		fx.write(dst, out.value);
		Ok(())
	}

	fn exec_arith3(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		let op = match opcode {
			ADDB3 | ADDW3 | ADDL3 => AluOp::Add,
			SUBB3 | SUBW3 | SUBL3 => AluOp::Sub,
			MULB3 | MULW3 | MULL3 => AluOp::Mul,
			DIVB3 | DIVW3 | DIVL3 => AluOp::Div,

			EMUL => {
				let args = [ops[0].val(), ops[1].val(), ops[2].val()];
				let out = self.alu(opcode, AluOp::Emul, &args, DataSize::Quad)?;
				fx.write(&ops[3], out.value);
				return Ok(());
			}

			EDIV => {
				let out = self.alu(opcode, AluOp::Ediv, &[ops[1].val(), ops[0].val()], DataSize::Long)?;
				fx.write(&ops[2], out.value);
				fx.write(&ops[3], out.extra);
				return Ok(());
			}

			INDEX => {
				let args: SmallVec<[u64; 5]> = ops[.. 5].iter().map(|o| o.val()).collect();
				let out = self.alu(opcode, AluOp::Index, &args, DataSize::Long)?;
				fx.write(&ops[5], out.value);
				return Ok(());
			}

			_ => return Err(FaultKind::IllegalInstruction),
		};

		let out = self.alu(opcode, op, &[ops[1].val(), ops[0].val()], ops[2].spec.size)?;
		fx.write(&ops[2], out.value);
		Ok(())
	}

	fn exec_logical(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		let (op, args, dst) = match opcode {
			BISB2 | BISW2 | BISL2 => (AluOp::Bis, [ops[1].val(), ops[0].val()], &ops[1]),
			BICB2 | BICW2 | BICL2 => (AluOp::Bic, [ops[1].val(), ops[0].val()], &ops[1]),
			XORB2 | XORW2 | XORL2 => (AluOp::Xor, [ops[1].val(), ops[0].val()], &ops[1]),
			BISB3 | BISW3 | BISL3 => (AluOp::Bis, [ops[1].val(), ops[0].val()], &ops[2]),
			BICB3 | BICW3 | BICL3 => (AluOp::Bic, [ops[1].val(), ops[0].val()], &ops[2]),
			XORB3 | XORW3 | XORL3 => (AluOp::Xor, [ops[1].val(), ops[0].val()], &ops[2]),
			MCOMB | MCOMW | MCOML => (AluOp::Com, [ops[0].val(), 0],            &ops[1]),
			_ => return Err(FaultKind::IllegalInstruction),
		};

		let out = self.alu(opcode, op, &args, dst.spec.size)?;
		fx.write(dst, out.value);
		Ok(())
	}

	fn exec_compare(&mut self, opcode: Opcode, ops: &[ResolvedOperand]) -> CpuResult<()> {
		use Opcode::*;

		let op = match opcode {
			CMPB | CMPW | CMPL => AluOp::Cmp,
			BITB | BITW | BITL => AluOp::Bit,
			TSTB | TSTW | TSTL => AluOp::Tst,
			_ => return Err(FaultKind::IllegalInstruction),
		};

		let args: SmallVec<[u64; 2]> = ops.iter().map(|o| o.val()).collect();
		self.alu(opcode, op, &args, ops[0].spec.size)?;
		Ok(())
	}

	fn exec_branch(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		if let Some(taken) = branch_taken(opcode, self.state.cc()) {
			if taken {
				self.jump(ops[0].val());
			}

			return Ok(());
		}

		match opcode {
			BLBS | BLBC => {
				if (ops[0].val() & 1 != 0) == (opcode == BLBS) {
					self.jump(ops[1].val());
				}
			}

			ACBB | ACBW | ACBL => {
				let size = ops[2].spec.size;
				let (limit, add) = (size.sext(ops[0].val()), size.sext(ops[1].val()));
				let out = self.alu_keep_c(opcode, AluOp::Add, &[ops[2].val(), ops[1].val()], size)?;
				fx.write(&ops[2], out.value);

				let index = size.sext(out.value);
				let again = if add >= 0 { index <= limit } else { index >= limit };

				if again {
					self.jump(ops[3].val());
				}
			}

			AOBLSS | AOBLEQ => {
				let limit = DataSize::Long.sext(ops[0].val());
				let out = self.alu_keep_c(opcode, AluOp::Add, &[ops[1].val(), 1], DataSize::Long)?;
				fx.write(&ops[1], out.value);

				let index = DataSize::Long.sext(out.value);
				let again = if opcode == AOBLSS { index < limit } else { index <= limit };

				if again {
					self.jump(ops[2].val());
				}
			}

			SOBGEQ | SOBGTR => {
				let out = self.alu_keep_c(opcode, AluOp::Sub, &[ops[0].val(), 1], DataSize::Long)?;
				fx.write(&ops[0], out.value);

				let index = DataSize::Long.sext(out.value);
				let again = if opcode == SOBGEQ { index >= 0 } else { index > 0 };

				if again {
					self.jump(ops[1].val());
				}
			}

			CASEB | CASEW | CASEL => self.exec_case(opcode, ops)?,

			_ => return Err(FaultKind::IllegalInstruction),
		}

		Ok(())
	}

	/// The displacement table follows the instruction; PC is at its start.
	fn exec_case(&mut self, opcode: Opcode, ops: &[ResolvedOperand]) -> CpuResult<()> {
		let size = ops[0].spec.size;
		let table = self.state.pc();
		let limit = ops[2].val();

		let tmp = size.trunc(ops[0].val().wrapping_sub(ops[1].val()));
		self.alu(opcode, AluOp::Cmp, &[tmp, limit], size)?;

		if tmp <= limit {
			let entry = table + (tmp as u32).wrapping_mul(2);
			let disp = self.port.fetch(entry, DataSize::Word, &self.state.mmu_state())?;
			self.state.set_pc(table + DataSize::Word.sext(disp) as i32);
		} else {
			self.state.set_pc(table + (limit as u32).wrapping_add(1).wrapping_mul(2));
		}

		Ok(())
	}

	fn exec_jump(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		match opcode {
			JMP => self.jump(ops[0].val()),

			JSB | BSBB | BSBW => {
				let ret = self.state.pc();
				self.push(fx, ret.0);
				self.jump(ops[0].val());
			}

			RSB => {
				let ret = self.pop()?;
				self.jump(ret as u64);
			}

			_ => return Err(FaultKind::IllegalInstruction),
		}

		Ok(())
	}

	fn exec_privileged(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		match opcode {
			Opcode::MTPR => {
				let (src, reg) = (ops[0].val() as u32, ops[1].val() as u32);
				fx.mmu = self.state.mtpr(reg, src)?;
				self.set_move_cc(src as u64, DataSize::Long);
			}

			Opcode::MFPR => {
				let val = self.state.mfpr(ops[0].val() as u32)?;
				self.set_move_cc(val as u64, DataSize::Long);
				fx.write(&ops[1], val as u64);
			}

			_ => return Err(FaultKind::IllegalInstruction),
		}

		Ok(())
	}

	fn exec_shift(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		let op = match opcode {
			Opcode::ASHL | Opcode::ASHQ => AluOp::Ash,
			Opcode::ROTL => AluOp::Rot,
			_ => return Err(FaultKind::IllegalInstruction),
		};

		let out = self.alu(opcode, op, &[ops[1].val(), ops[0].val()], ops[2].spec.size)?;
		fx.write(&ops[2], out.value);
		Ok(())
	}

	fn exec_control(&mut self, opcode: Opcode, ops: &[ResolvedOperand], fx: &mut Effects)
	-> CpuResult<()> {
		use Opcode::*;

		match opcode {
			NOP => {}
			BPT => return Err(FaultKind::Breakpoint),

			HALT => {
				if !self.state.is_kernel() {
					return Err(FaultKind::PrivilegedInstruction);
				}

				fx.halt = true;
			}

			BISPSW | BICPSW => {
				let mask = ops[0].val() as u16;

				if mask & 0xFF00 != 0 {
					return Err(FaultKind::ReservedOperand);
				}

				let mut psl = self.state.psl();
				let psw = psl.psw() as u8;
				psl.set_psw(if opcode == BISPSW { psw | mask as u8 } else { psw & !(mask as u8) });
				self.state.set_psl(psl);
			}

			MOVPSL => fx.write(&ops[0], self.state.psl().to_u32() as u64),

			PUSHR => {
				let mask = ops[0].val() as u16 & 0x7FFF;

				for r in (0 .. PC).rev().filter(|&r| mask & (1 << r) != 0) {
					let val = self.state.reg(r);
					self.push(fx, val);
				}
			}

			POPR => {
				let mask = ops[0].val() as u16 & 0x7FFF;

				for r in (0 .. PC).filter(|&r| mask & (1 << r) != 0) {
					let val = self.pop()?;
					self.state.set_reg(r, val);
				}
			}

			CHMK | CHME | CHMS | CHMU => {
				let target = match opcode {
					CHMK => AccessMode::Kernel,
					CHME => AccessMode::Executive,
					CHMS => AccessMode::Supervisor,
					_    => AccessMode::User,
				};

				let mode = target.most_privileged(self.state.mode());
				fx.trap = Some(FaultKind::ChangeMode { mode, code: ops[0].val() as u16 });
			}

			_ => return Err(FaultKind::IllegalInstruction),
		}

		Ok(())
	}
}
