mod core;
mod memory;

pub use core::Config;
pub use memory::MemoryConfig;
