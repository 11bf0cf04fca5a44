//! Storage abstraction layer.
//!
//! The vector index and the reference metadata store persist through the
//! [`Storage`] trait so tests can run against [`MemoryStorage`] while the CLI
//! uses [`FileStorage`].

pub mod file;
pub mod memory;
pub mod traits;

pub use file::*;
pub use memory::*;
pub use traits::*;
