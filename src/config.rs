//! Knobs for the CPU and for the machine the command-line runner builds around it.

use std::collections::HashMap;
use std::error::Error;

use parse_display::{ Display, FromStr };

use crate::arch::vax::{ AccessMode, Opcode };
use crate::memory::VA;

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// TrapPolicy
// ------------------------------------------------------------------------------------------------

/// What to do when the ALU reports an arithmetic exception.
#[derive(Debug, Display, FromStr, PartialEq, Eq, Copy, Clone)]
#[display(style = "lowercase")]
pub enum TrapPolicy {
	/// Fault the instruction; nothing is written.
	Abort,
	/// Write the result and leave V set.
	Flag,
}

impl TrapPolicy {
	/// Policy used when nothing has been configured for an opcode.
	pub fn default_for(opcode: Opcode) -> TrapPolicy {
		use Opcode::*;

		match opcode {
			DIVB2 | DIVB3 | DIVW2 | DIVW3 | DIVL2 | DIVL3 | EDIV | INDEX => TrapPolicy::Abort,
			_ => TrapPolicy::Flag,
		}
	}
}

// ------------------------------------------------------------------------------------------------
// CpuConfig
// ------------------------------------------------------------------------------------------------

/// How a `Cpu` starts up and behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuConfig {
	/// PC after reset.
	pub reset_pc:   VA,
	/// Access mode after reset.
	pub reset_mode: AccessMode,
	/// Per-opcode trap policy overrides.
	pub traps:      HashMap<Opcode, TrapPolicy>,
}

impl Default for CpuConfig {
	fn default() -> Self {
		Self {
			reset_pc:   VA(0),
			reset_mode: AccessMode::Kernel,
			traps:      HashMap::new(),
		}
	}
}

impl CpuConfig {
	/// The trap policy in effect for `opcode`.
	pub fn trap_policy(&self, opcode: Opcode) -> TrapPolicy {
		self.traps.get(&opcode).copied().unwrap_or_else(|| TrapPolicy::default_for(opcode))
	}
}

// ------------------------------------------------------------------------------------------------
// MachineConfig
// ------------------------------------------------------------------------------------------------

/// Everything the command-line runner needs to build and run a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
	pub cpu:        CpuConfig,
	/// Bytes of RAM, starting at address 0.
	pub ram_size:   usize,
	/// Where the image gets loaded.
	pub load_addr:  VA,
	/// Give up after this many instructions.
	pub step_limit: usize,
	/// Path of the image to load.
	pub image:      Option<String>,
	/// Disassemble the image instead of running it.
	pub disasm:     bool,
	/// How many `-v` flags were given.
	pub verbosity:  usize,
}

impl Default for MachineConfig {
	fn default() -> Self {
		Self {
			cpu:        CpuConfig::default(),
			ram_size:   0x10_0000,
			load_addr:  VA(0x200),
			step_limit: 1_000_000,
			image:      None,
			disasm:     false,
			verbosity:  0,
		}
	}
}

impl MachineConfig {
	/// Builds a configuration from command-line arguments (not including the program name).
	///
	/// ```text
	/// vaxcore [-v...] [--disasm] [--ram SIZE] [--load ADDR] [--pc ADDR] [--mode MODE]
	///         [--steps N] [--trap OPCODE=POLICY]... IMAGE
	/// ```
	///
	/// If `--pc` isn't given, execution starts at the load address.
	pub fn from_args<I, S>(args: I) -> ConfigResult<MachineConfig>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut ret = MachineConfig::default();
		let mut reset_pc = None;
		let mut args = args.into_iter();

		while let Some(arg) = args.next() {
			let arg = arg.as_ref();

			let mut value = |name: &str| -> ConfigResult<String> {
				args.next()
					.map(|v| v.as_ref().to_string())
					.ok_or_else(|| ConfigError::missing_value(name))
			};

			match arg {
				"--disasm" => ret.disasm = true,
				"--ram"    => ret.ram_size   = parse_num(arg, &value(arg)?)? as usize,
				"--load"   => ret.load_addr  = VA(parse_num(arg, &value(arg)?)?),
				"--pc"     => reset_pc       = Some(VA(parse_num(arg, &value(arg)?)?)),
				"--steps"  => ret.step_limit = parse_num(arg, &value(arg)?)? as usize,

				"--mode" => {
					let v = value(arg)?;
					ret.cpu.reset_mode = v.parse().map_err(|_| ConfigError::bad_value(arg, &v))?;
				}

				"--trap" => {
					let v = value(arg)?;
					let (op, policy) = parse_trap(&v).ok_or_else(|| ConfigError::bad_value(arg, &v))?;
					ret.cpu.traps.insert(op, policy);
				}

				_ if arg.starts_with("-v") && arg[1 ..].chars().all(|c| c == 'v') =>
					ret.verbosity += arg.len() - 1,

				_ if arg.starts_with('-') => return Err(ConfigError::unknown_flag(arg)),

				_ if ret.image.is_none() => ret.image = Some(arg.to_string()),
				_ => return Err(ConfigError::unknown_flag(arg)),
			}
		}

		if ret.image.is_none() {
			return Err(ConfigError { kind: ConfigErrorKind::NoImage });
		}

		ret.cpu.reset_pc = reset_pc.unwrap_or(ret.load_addr);
		Ok(ret)
	}
}

/// Decimal, or hex with a `0x` prefix.
fn parse_num(flag: &str, s: &str) -> ConfigResult<u32> {
	let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => u32::from_str_radix(hex, 16),
		None      => s.parse(),
	};

	parsed.map_err(|_| ConfigError::bad_value(flag, s))
}

/// `MNEMONIC=POLICY`, e.g. `ADDL2=abort`.
fn parse_trap(s: &str) -> Option<(Opcode, TrapPolicy)> {
	let mut parts = s.splitn(2, '=');
	let op     = parts.next()?.to_uppercase().parse().ok()?;
	let policy = parts.next()?.to_lowercase().parse().ok()?;
	Some((op, policy))
}

// ------------------------------------------------------------------------------------------------
// ConfigError
// ------------------------------------------------------------------------------------------------

/// The kinds of configuration errors.
#[derive(Debug, Display, PartialEq, Eq, Clone)]
pub enum ConfigErrorKind {
	#[display("unknown argument '{0}'")]
	UnknownFlag(String),

	#[display("'{0}' needs a value")]
	MissingValue(String),

	#[display("bad value '{value}' for '{flag}'")]
	BadValue { flag: String, value: String },

	#[display("no image file given")]
	NoImage,
}

/// The configuration error type.
#[derive(Debug, Display, PartialEq, Eq, Clone)]
#[display("configuration error: {kind}")]
pub struct ConfigError {
	pub kind: ConfigErrorKind,
}

impl Error for ConfigError {}

impl ConfigError {
	fn unknown_flag(flag: &str) -> Self {
		Self { kind: ConfigErrorKind::UnknownFlag(flag.into()) }
	}

	fn missing_value(flag: &str) -> Self {
		Self { kind: ConfigErrorKind::MissingValue(flag.into()) }
	}

	fn bad_value(flag: &str, value: &str) -> Self {
		Self { kind: ConfigErrorKind::BadValue { flag: flag.into(), value: value.into() } }
	}
}

/// Alias for a `Result` with a `ConfigError` as its error type.
pub type ConfigResult<T> = Result<T, ConfigError>;
