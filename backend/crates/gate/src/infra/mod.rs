pub mod memory;

pub use memory::MemoryGateStore;
