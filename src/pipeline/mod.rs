//! Pipeline module - event extraction, log assembly, filtering and partitioning

pub mod assembly;
pub mod cleanup;
pub mod duration;
pub mod event;
pub mod extract;
pub mod filter;
pub mod loader;
pub mod membership;
pub mod missing;
pub mod partition;
pub mod value;

pub use assembly::*;
pub use cleanup::*;
pub use duration::*;
pub use event::*;
pub use extract::*;
pub use filter::*;
pub use loader::*;
pub use membership::*;
pub use missing::*;
pub use partition::*;
pub use value::*;
