//! CLI command handling

pub mod history;
pub mod listen;
pub mod output;
pub mod send;
pub mod storage;

pub use history::*;
pub use listen::*;
pub use output::*;
pub use send::*;
pub use storage::*;
