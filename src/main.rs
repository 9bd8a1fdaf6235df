use std::error::Error;
use std::io::Write;
use std::process::exit;

use colored::*;
use log::*;
use simplelog::{ Config, LevelFilter, SimpleLogger };

use vaxcore::config::MachineConfig;
use vaxcore::vax::*;
use vaxcore::{ Bus, DataSize, IDevice, IMemory, VA };

/// Where the console's registers go. Offset 0 is the transmit buffer; offset 4 is the
/// transmit status, whose bit 7 means "ready".
const CONSOLE_BASE: VA = VA(0x2000_0000);

fn main() {
	better_panic::install();

	let config = match MachineConfig::from_args(std::env::args().skip(1)) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("{}", e.to_string().red());
			eprintln!("usage: vaxcore [-v...] [--disasm] [--ram SIZE] [--load ADDR] [--pc ADDR] \
				[--mode MODE] [--steps N] [--trap OPCODE=POLICY]... IMAGE");
			exit(1);
		}
	};

	let level = match config.verbosity {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	};

	if SimpleLogger::init(level, Config::default()).is_err() {
		eprintln!("couldn't set up logging");
	}

	if let Err(e) = run(&config) {
		eprintln!("{}", e.to_string().red());
		exit(1);
	}
}

fn run(config: &MachineConfig) -> Result<(), Box<dyn Error>> {
	// from_args makes sure there is one.
	let path = config.image.as_deref().unwrap_or_default();
	let image = std::fs::read(path)?;
	info!("loaded {} ({} bytes) at {}", path, image.len(), config.load_addr);

	if config.disasm {
		disassemble(&image, config.load_addr);
		return Ok(());
	}

	let mut bus = Bus::new(config.ram_size);
	bus.load(config.load_addr, &image)?;
	bus.map_device(CONSOLE_BASE, 8, false, Box::new(Console));

	let mut cpu = Cpu::new(bus, config.cpu.clone());
	// stack grows down from the top of RAM.
	cpu.set_reg(SP, config.ram_size as u32);

	match cpu.run(config.step_limit) {
		Ok(Some(outcome)) => println!("{}", outcome.to_string().green()),
		Ok(None)          => println!("{}", "step limit is 0; nothing ran".yellow()),
		Err(fault)        => println!("{}", fault.to_string().red()),
	}

	println!("after {} instructions", cpu.retired());
	dump_registers(&cpu);
	let stats = cpu.port_stats();
	println!("{} memory requests ({})", stats.total(), stats);
	Ok(())
}

// ------------------------------------------------------------------------------------------------
// Disassembly
// ------------------------------------------------------------------------------------------------

fn disassemble(image: &[u8], base: VA) {
	let printer = Printer::new();
	let mut insts = Disassembler.disas_all(image, base);

	for inst in &mut insts {
		let start = (inst.va() - base) as usize;
		let bytes = &image[start .. start + inst.size()];

		let hex = bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ");
		println!("{}  {:<30}  {}", inst.va().to_string().cyan(), hex, printer.fmt_instr(&inst));
	}

	if let Some(e) = insts.error() {
		println!("{}", e.to_string().yellow());
	}
}

// ------------------------------------------------------------------------------------------------
// Register dump
// ------------------------------------------------------------------------------------------------

fn dump_registers<M: IMemory>(cpu: &Cpu<M>) {
	for row in 0 .. 4u8 {
		let line = (0 .. 4u8)
			.map(|col| {
				let r = row * 4 + col;
				format!("{:>3}: {:08X}", reg_name(r).bold(), cpu.reg(r))
			})
			.collect::<Vec<_>>()
			.join("  ");

		println!("{}", line);
	}

	let psl = cpu.psl();
	let flag = |name: &str, bit: Cc| {
		if psl.cc.contains(bit) { name.green().bold() } else { "-".dimmed() }
	};

	println!("ISP: {:08X}", cpu.state().isp());
	println!("PSL: {:08X} [{}{}{}{}] {} mode, IPL {}{}",
		psl.to_u32(),
		flag("N", Cc::N), flag("Z", Cc::Z), flag("V", Cc::V), flag("C", Cc::C),
		psl.cur_mode,
		psl.ipl,
		if psl.is { ", interrupt stack" } else { "" });
}

// ------------------------------------------------------------------------------------------------
// Console
// ------------------------------------------------------------------------------------------------

/// A write-only terminal: bytes stored to the transmit buffer go to stdout.
struct Console;

impl IDevice for Console {
	fn name(&self) -> &str {
		"console"
	}

	fn read_reg(&mut self, offs: u32, _size: DataSize) -> u64 {
		match offs {
			4 => 0x80,
			_ => 0,
		}
	}

	fn write_reg(&mut self, offs: u32, _size: DataSize, val: u64) {
		if offs == 0 {
			let mut out = std::io::stdout();

			if out.write_all(&[val as u8]).and_then(|_| out.flush()).is_err() {
				warn!("console: couldn't write to stdout");
			}
		}
	}
}
