//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod chain;
pub mod llm;
pub mod search;

pub use chain::*;
pub use llm::*;
pub use search::*;
