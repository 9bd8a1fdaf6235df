mod arch;
pub mod config;
mod memory;

pub use arch::*;
pub use memory::*;
