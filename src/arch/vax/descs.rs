use lazy_static::lazy_static;

use crate::memory::DataSize::*;
use super::{ Access, InstClass, InstDesc, OpSpec, Opcode };

// ------------------------------------------------------------------------------------------------
// InstDesc table
// ------------------------------------------------------------------------------------------------

/// Looks up the descriptor for an opcode value (`0x00..=0xFF`, or `0xFDxx` etc. for two-byte
/// opcodes). `None` means the opcode is reserved.
pub fn lookup_desc(opcode: u16) -> Option<&'static InstDesc> {
	match opcode {
		0x0000 ..= 0x00FC => PRIMARY[opcode as usize],
		0xFD00 ..= 0xFFFF => EXTENDED[(opcode >> 8) as usize - 0xFD][(opcode & 0xFF) as usize],
		_ => None,
	}
}

/// Every instruction descriptor, in opcode order.
pub fn all_descs() -> &'static [InstDesc] {
	INST_DESCS
}

lazy_static! {
	/// One-byte opcodes.
	static ref PRIMARY: [Option<&'static InstDesc>; 256] = {
		let mut table = [None; 256];

		for desc in INST_DESCS.iter().filter(|d| d.opcode_len() == 1) {
			let slot = &mut table[desc.opcode as usize];
			assert!(slot.is_none(), "duplicate descriptor for {}", desc.opcode);
			*slot = Some(desc);
		}

		table
	};

	/// Two-byte opcodes, one table per escape byte (FD, FE, FF).
	static ref EXTENDED: [[Option<&'static InstDesc>; 256]; 3] = {
		let mut tables = [[None; 256]; 3];

		for desc in INST_DESCS.iter().filter(|d| d.opcode_len() == 2) {
			let val = desc.opcode as u16;
			let slot = &mut tables[(val >> 8) as usize - 0xFD][(val & 0xFF) as usize];
			assert!(slot.is_none(), "duplicate descriptor for {}", desc.opcode);
			*slot = Some(desc);
		}

		tables
	};
}

use Opcode::*;
use InstClass::*;
use Access::{ Read, Write, Modify, Addr, Field };

const RB: OpSpec = OpSpec::new(Read, Byte);
const RW: OpSpec = OpSpec::new(Read, Word);
const RL: OpSpec = OpSpec::new(Read, Long);
const RQ: OpSpec = OpSpec::new(Read, Quad);
const RO: OpSpec = OpSpec::new(Read, Octa);
const WB: OpSpec = OpSpec::new(Write, Byte);
const WW: OpSpec = OpSpec::new(Write, Word);
const WL: OpSpec = OpSpec::new(Write, Long);
const WQ: OpSpec = OpSpec::new(Write, Quad);
const WO: OpSpec = OpSpec::new(Write, Octa);
const MB: OpSpec = OpSpec::new(Modify, Byte);
const MW: OpSpec = OpSpec::new(Modify, Word);
const ML: OpSpec = OpSpec::new(Modify, Long);
const AB: OpSpec = OpSpec::new(Addr, Byte);
const AW: OpSpec = OpSpec::new(Addr, Word);
const AL: OpSpec = OpSpec::new(Addr, Long);
const AQ: OpSpec = OpSpec::new(Addr, Quad);
const AO: OpSpec = OpSpec::new(Addr, Octa);
const VB: OpSpec = OpSpec::new(Field, Byte);
const BB: OpSpec = OpSpec::new(Access::Branch, Byte);
const BW: OpSpec = OpSpec::new(Access::Branch, Word);

const INST_DESCS: &[InstDesc] = &[
	// 0x00
	InstDesc { opcode: HALT,   class: Control,    ops: &[] },
	InstDesc { opcode: NOP,    class: Control,    ops: &[] },
	InstDesc { opcode: REI,    class: System,     ops: &[] },
	InstDesc { opcode: BPT,    class: Control,    ops: &[] },
	InstDesc { opcode: RET,    class: System,     ops: &[] },
	InstDesc { opcode: RSB,    class: JumpSub,    ops: &[] },
	InstDesc { opcode: LDPCTX, class: System,     ops: &[] },
	InstDesc { opcode: SVPCTX, class: System,     ops: &[] },
	InstDesc { opcode: CVTPS,  class: Decimal,    ops: &[RW, AB, RW, AB] },
	InstDesc { opcode: CVTSP,  class: Decimal,    ops: &[RW, AB, RW, AB] },
	InstDesc { opcode: INDEX,  class: Arith3,     ops: &[RL, RL, RL, RL, RL, WL] },
	InstDesc { opcode: CRC,    class: String,     ops: &[AB, RL, RW, AB] },
	InstDesc { opcode: PROBER, class: System,     ops: &[RB, RW, AB] },
	InstDesc { opcode: PROBEW, class: System,     ops: &[RB, RW, AB] },
	InstDesc { opcode: INSQUE, class: Queue,      ops: &[AB, AB] },
	InstDesc { opcode: REMQUE, class: Queue,      ops: &[AB, WL] },

	// 0x10
	InstDesc { opcode: BSBB,   class: JumpSub,    ops: &[BB] },
	InstDesc { opcode: BRB,    class: Branch,     ops: &[BB] },
	InstDesc { opcode: BNEQ,   class: Branch,     ops: &[BB] },
	InstDesc { opcode: BEQL,   class: Branch,     ops: &[BB] },
	InstDesc { opcode: BGTR,   class: Branch,     ops: &[BB] },
	InstDesc { opcode: BLEQ,   class: Branch,     ops: &[BB] },
	InstDesc { opcode: JSB,    class: JumpSub,    ops: &[AB] },
	InstDesc { opcode: JMP,    class: JumpSub,    ops: &[AB] },
	InstDesc { opcode: BGEQ,   class: Branch,     ops: &[BB] },
	InstDesc { opcode: BLSS,   class: Branch,     ops: &[BB] },
	InstDesc { opcode: BGTRU,  class: Branch,     ops: &[BB] },
	InstDesc { opcode: BLEQU,  class: Branch,     ops: &[BB] },
	InstDesc { opcode: BVC,    class: Branch,     ops: &[BB] },
	InstDesc { opcode: BVS,    class: Branch,     ops: &[BB] },
	InstDesc { opcode: BGEQU,  class: Branch,     ops: &[BB] },
	InstDesc { opcode: BLSSU,  class: Branch,     ops: &[BB] },

	// 0x20
	InstDesc { opcode: ADDP4,  class: Decimal,    ops: &[RW, AB, RW, AB] },
	InstDesc { opcode: ADDP6,  class: Decimal,    ops: &[RW, AB, RW, AB, RW, AB] },
	InstDesc { opcode: SUBP4,  class: Decimal,    ops: &[RW, AB, RW, AB] },
	InstDesc { opcode: SUBP6,  class: Decimal,    ops: &[RW, AB, RW, AB, RW, AB] },
	InstDesc { opcode: CVTPT,  class: Decimal,    ops: &[RW, AB, AB, RW, AB] },
	InstDesc { opcode: MULP,   class: Decimal,    ops: &[RW, AB, RW, AB, RW, AB] },
	InstDesc { opcode: CVTTP,  class: Decimal,    ops: &[RW, AB, AB, RW, AB] },
	InstDesc { opcode: DIVP,   class: Decimal,    ops: &[RW, AB, RW, AB, RW, AB] },
	InstDesc { opcode: MOVC3,  class: String,     ops: &[RW, AB, AB] },
	InstDesc { opcode: CMPC3,  class: String,     ops: &[RW, AB, AB] },
	InstDesc { opcode: SCANC,  class: String,     ops: &[RW, AB, AB, RB] },
	InstDesc { opcode: SPANC,  class: String,     ops: &[RW, AB, AB, RB] },
	InstDesc { opcode: MOVC5,  class: String,     ops: &[RW, AB, RB, RW, AB] },
	InstDesc { opcode: CMPC5,  class: String,     ops: &[RW, AB, RB, RW, AB] },
	InstDesc { opcode: MOVTC,  class: String,     ops: &[RW, AB, RB, AB, RW, AB] },
	InstDesc { opcode: MOVTUC, class: String,     ops: &[RW, AB, RB, AB, RW, AB] },

	// 0x30
	InstDesc { opcode: BSBW,   class: JumpSub,    ops: &[BW] },
	InstDesc { opcode: BRW,    class: Branch,     ops: &[BW] },
	InstDesc { opcode: CVTWL,  class: Move,       ops: &[RW, WL] },
	InstDesc { opcode: CVTWB,  class: Move,       ops: &[RW, WB] },
	InstDesc { opcode: MOVP,   class: Decimal,    ops: &[RW, AB, AB] },
	InstDesc { opcode: CMPP3,  class: Decimal,    ops: &[RW, AB, AB] },
	InstDesc { opcode: CVTPL,  class: Decimal,    ops: &[RW, AB, WL] },
	InstDesc { opcode: CMPP4,  class: Decimal,    ops: &[RW, AB, RW, AB] },
	InstDesc { opcode: EDITPC, class: Decimal,    ops: &[RW, AB, AB, AB] },
	InstDesc { opcode: MATCHC, class: String,     ops: &[RW, AB, RW, AB] },
	InstDesc { opcode: LOCC,   class: String,     ops: &[RB, RW, AB] },
	InstDesc { opcode: SKPC,   class: String,     ops: &[RB, RW, AB] },
	InstDesc { opcode: MOVZWL, class: Move,       ops: &[RW, WL] },
	InstDesc { opcode: ACBW,   class: Branch,     ops: &[RW, RW, MW, BW] },
	InstDesc { opcode: MOVAW,  class: Move,       ops: &[AW, WL] },
	InstDesc { opcode: PUSHAW, class: Move,       ops: &[AW] },

	// 0x50
	InstDesc { opcode: ADAWI,  class: Arith2,     ops: &[RW, MW] },
	InstDesc { opcode: INSQHI, class: Queue,      ops: &[AB, AQ] },
	InstDesc { opcode: INSQTI, class: Queue,      ops: &[AB, AQ] },
	InstDesc { opcode: REMQHI, class: Queue,      ops: &[AQ, WL] },
	InstDesc { opcode: REMQTI, class: Queue,      ops: &[AQ, WL] },

	// 0x70
	InstDesc { opcode: ASHL,   class: Shift,      ops: &[RB, RL, WL] },
	InstDesc { opcode: ASHQ,   class: Shift,      ops: &[RB, RQ, WQ] },
	InstDesc { opcode: EMUL,   class: Arith3,     ops: &[RL, RL, RL, WQ] },
	InstDesc { opcode: EDIV,   class: Arith3,     ops: &[RL, RQ, WL, WL] },
	InstDesc { opcode: CLRQ,   class: Move,       ops: &[WQ] },
	InstDesc { opcode: MOVQ,   class: Move,       ops: &[RQ, WQ] },
	InstDesc { opcode: MOVAQ,  class: Move,       ops: &[AQ, WL] },
	InstDesc { opcode: PUSHAQ, class: Move,       ops: &[AQ] },

	// 0x80
	InstDesc { opcode: ADDB2,  class: Arith2,     ops: &[RB, MB] },
	InstDesc { opcode: ADDB3,  class: Arith3,     ops: &[RB, RB, WB] },
	InstDesc { opcode: SUBB2,  class: Arith2,     ops: &[RB, MB] },
	InstDesc { opcode: SUBB3,  class: Arith3,     ops: &[RB, RB, WB] },
	InstDesc { opcode: MULB2,  class: Arith2,     ops: &[RB, MB] },
	InstDesc { opcode: MULB3,  class: Arith3,     ops: &[RB, RB, WB] },
	InstDesc { opcode: DIVB2,  class: Arith2,     ops: &[RB, MB] },
	InstDesc { opcode: DIVB3,  class: Arith3,     ops: &[RB, RB, WB] },
	InstDesc { opcode: BISB2,  class: Logical,    ops: &[RB, MB] },
	InstDesc { opcode: BISB3,  class: Logical,    ops: &[RB, RB, WB] },
	InstDesc { opcode: BICB2,  class: Logical,    ops: &[RB, MB] },
	InstDesc { opcode: BICB3,  class: Logical,    ops: &[RB, RB, WB] },
	InstDesc { opcode: XORB2,  class: Logical,    ops: &[RB, MB] },
	InstDesc { opcode: XORB3,  class: Logical,    ops: &[RB, RB, WB] },
	InstDesc { opcode: MNEGB,  class: Arith2,     ops: &[RB, WB] },
	InstDesc { opcode: CASEB,  class: Branch,     ops: &[RB, RB, RB] },

	// 0x90
	InstDesc { opcode: MOVB,   class: Move,       ops: &[RB, WB] },
	InstDesc { opcode: CMPB,   class: Compare,    ops: &[RB, RB] },
	InstDesc { opcode: MCOMB,  class: Logical,    ops: &[RB, WB] },
	InstDesc { opcode: BITB,   class: Compare,    ops: &[RB, RB] },
	InstDesc { opcode: CLRB,   class: Move,       ops: &[WB] },
	InstDesc { opcode: TSTB,   class: Compare,    ops: &[RB] },
	InstDesc { opcode: INCB,   class: Arith2,     ops: &[MB] },
	InstDesc { opcode: DECB,   class: Arith2,     ops: &[MB] },
	InstDesc { opcode: CVTBL,  class: Move,       ops: &[RB, WL] },
	InstDesc { opcode: CVTBW,  class: Move,       ops: &[RB, WW] },
	InstDesc { opcode: MOVZBL, class: Move,       ops: &[RB, WL] },
	InstDesc { opcode: MOVZBW, class: Move,       ops: &[RB, WW] },
	InstDesc { opcode: ROTL,   class: Shift,      ops: &[RB, RL, WL] },
	InstDesc { opcode: ACBB,   class: Branch,     ops: &[RB, RB, MB, BW] },
	InstDesc { opcode: MOVAB,  class: Move,       ops: &[AB, WL] },
	InstDesc { opcode: PUSHAB, class: Move,       ops: &[AB] },

	// 0xA0
	InstDesc { opcode: ADDW2,  class: Arith2,     ops: &[RW, MW] },
	InstDesc { opcode: ADDW3,  class: Arith3,     ops: &[RW, RW, WW] },
	InstDesc { opcode: SUBW2,  class: Arith2,     ops: &[RW, MW] },
	InstDesc { opcode: SUBW3,  class: Arith3,     ops: &[RW, RW, WW] },
	InstDesc { opcode: MULW2,  class: Arith2,     ops: &[RW, MW] },
	InstDesc { opcode: MULW3,  class: Arith3,     ops: &[RW, RW, WW] },
	InstDesc { opcode: DIVW2,  class: Arith2,     ops: &[RW, MW] },
	InstDesc { opcode: DIVW3,  class: Arith3,     ops: &[RW, RW, WW] },
	InstDesc { opcode: BISW2,  class: Logical,    ops: &[RW, MW] },
	InstDesc { opcode: BISW3,  class: Logical,    ops: &[RW, RW, WW] },
	InstDesc { opcode: BICW2,  class: Logical,    ops: &[RW, MW] },
	InstDesc { opcode: BICW3,  class: Logical,    ops: &[RW, RW, WW] },
	InstDesc { opcode: XORW2,  class: Logical,    ops: &[RW, MW] },
	InstDesc { opcode: XORW3,  class: Logical,    ops: &[RW, RW, WW] },
	InstDesc { opcode: MNEGW,  class: Arith2,     ops: &[RW, WW] },
	InstDesc { opcode: CASEW,  class: Branch,     ops: &[RW, RW, RW] },

	// 0xB0
	InstDesc { opcode: MOVW,   class: Move,       ops: &[RW, WW] },
	InstDesc { opcode: CMPW,   class: Compare,    ops: &[RW, RW] },
	InstDesc { opcode: MCOMW,  class: Logical,    ops: &[RW, WW] },
	InstDesc { opcode: BITW,   class: Compare,    ops: &[RW, RW] },
	InstDesc { opcode: CLRW,   class: Move,       ops: &[WW] },
	InstDesc { opcode: TSTW,   class: Compare,    ops: &[RW] },
	InstDesc { opcode: INCW,   class: Arith2,     ops: &[MW] },
	InstDesc { opcode: DECW,   class: Arith2,     ops: &[MW] },
	InstDesc { opcode: BISPSW, class: Control,    ops: &[RW] },
	InstDesc { opcode: BICPSW, class: Control,    ops: &[RW] },
	InstDesc { opcode: POPR,   class: Control,    ops: &[RW] },
	InstDesc { opcode: PUSHR,  class: Control,    ops: &[RW] },
	InstDesc { opcode: CHMK,   class: Control,    ops: &[RW] },
	InstDesc { opcode: CHME,   class: Control,    ops: &[RW] },
	InstDesc { opcode: CHMS,   class: Control,    ops: &[RW] },
	InstDesc { opcode: CHMU,   class: Control,    ops: &[RW] },

	// 0xC0
	InstDesc { opcode: ADDL2,  class: Arith2,     ops: &[RL, ML] },
	InstDesc { opcode: ADDL3,  class: Arith3,     ops: &[RL, RL, WL] },
	InstDesc { opcode: SUBL2,  class: Arith2,     ops: &[RL, ML] },
	InstDesc { opcode: SUBL3,  class: Arith3,     ops: &[RL, RL, WL] },
	InstDesc { opcode: MULL2,  class: Arith2,     ops: &[RL, ML] },
	InstDesc { opcode: MULL3,  class: Arith3,     ops: &[RL, RL, WL] },
	InstDesc { opcode: DIVL2,  class: Arith2,     ops: &[RL, ML] },
	InstDesc { opcode: DIVL3,  class: Arith3,     ops: &[RL, RL, WL] },
	InstDesc { opcode: BISL2,  class: Logical,    ops: &[RL, ML] },
	InstDesc { opcode: BISL3,  class: Logical,    ops: &[RL, RL, WL] },
	InstDesc { opcode: BICL2,  class: Logical,    ops: &[RL, ML] },
	InstDesc { opcode: BICL3,  class: Logical,    ops: &[RL, RL, WL] },
	InstDesc { opcode: XORL2,  class: Logical,    ops: &[RL, ML] },
	InstDesc { opcode: XORL3,  class: Logical,    ops: &[RL, RL, WL] },
	InstDesc { opcode: MNEGL,  class: Arith2,     ops: &[RL, WL] },
	InstDesc { opcode: CASEL,  class: Branch,     ops: &[RL, RL, RL] },

	// 0xD0
	InstDesc { opcode: MOVL,   class: Move,       ops: &[RL, WL] },
	InstDesc { opcode: CMPL,   class: Compare,    ops: &[RL, RL] },
	InstDesc { opcode: MCOML,  class: Logical,    ops: &[RL, WL] },
	InstDesc { opcode: BITL,   class: Compare,    ops: &[RL, RL] },
	InstDesc { opcode: CLRL,   class: Move,       ops: &[WL] },
	InstDesc { opcode: TSTL,   class: Compare,    ops: &[RL] },
	InstDesc { opcode: INCL,   class: Arith2,     ops: &[ML] },
	InstDesc { opcode: DECL,   class: Arith2,     ops: &[ML] },
	InstDesc { opcode: ADWC,   class: Arith2,     ops: &[RL, ML] },
	InstDesc { opcode: SBWC,   class: Arith2,     ops: &[RL, ML] },
	InstDesc { opcode: MTPR,   class: Privileged, ops: &[RL, RL] },
	InstDesc { opcode: MFPR,   class: Privileged, ops: &[RL, WL] },
	InstDesc { opcode: MOVPSL, class: Control,    ops: &[WL] },
	InstDesc { opcode: PUSHL,  class: Move,       ops: &[RL] },
	InstDesc { opcode: MOVAL,  class: Move,       ops: &[AL, WL] },
	InstDesc { opcode: PUSHAL, class: Move,       ops: &[AL] },

	// 0xE0
	InstDesc { opcode: BBS,    class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBC,    class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBSS,   class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBCS,   class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBSC,   class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBCC,   class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBSSI,  class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BBCCI,  class: BitField,   ops: &[RL, VB, BB] },
	InstDesc { opcode: BLBS,   class: Branch,     ops: &[RL, BB] },
	InstDesc { opcode: BLBC,   class: Branch,     ops: &[RL, BB] },
	InstDesc { opcode: FFS,    class: BitField,   ops: &[RL, RB, VB, WL] },
	InstDesc { opcode: FFC,    class: BitField,   ops: &[RL, RB, VB, WL] },
	InstDesc { opcode: CMPV,   class: BitField,   ops: &[RL, RB, VB, RL] },
	InstDesc { opcode: CMPZV,  class: BitField,   ops: &[RL, RB, VB, RL] },
	InstDesc { opcode: EXTV,   class: BitField,   ops: &[RL, RB, VB, WL] },
	InstDesc { opcode: EXTZV,  class: BitField,   ops: &[RL, RB, VB, WL] },

	// 0xF0
	InstDesc { opcode: INSV,   class: BitField,   ops: &[RL, RL, RB, VB] },
	InstDesc { opcode: ACBL,   class: Branch,     ops: &[RL, RL, ML, BW] },
	InstDesc { opcode: AOBLSS, class: Branch,     ops: &[RL, ML, BB] },
	InstDesc { opcode: AOBLEQ, class: Branch,     ops: &[RL, ML, BB] },
	InstDesc { opcode: SOBGEQ, class: Branch,     ops: &[ML, BB] },
	InstDesc { opcode: SOBGTR, class: Branch,     ops: &[ML, BB] },
	InstDesc { opcode: CVTLB,  class: Move,       ops: &[RL, WB] },
	InstDesc { opcode: CVTLW,  class: Move,       ops: &[RL, WW] },
	InstDesc { opcode: ASHP,   class: Decimal,    ops: &[RB, RW, AB, RB, RW, AB] },
	InstDesc { opcode: CVTLP,  class: Decimal,    ops: &[RL, RW, AB] },
	InstDesc { opcode: CALLG,  class: System,     ops: &[AB, AB] },
	InstDesc { opcode: CALLS,  class: System,     ops: &[RL, AB] },
	InstDesc { opcode: XFC,    class: System,     ops: &[] },

	// 0xFD70
	InstDesc { opcode: CLRO,   class: Move,       ops: &[WO] },
	InstDesc { opcode: MOVO,   class: Move,       ops: &[RO, WO] },
	InstDesc { opcode: MOVAO,  class: Move,       ops: &[AO, WL] },
	InstDesc { opcode: PUSHAO, class: Move,       ops: &[AO] },
];
