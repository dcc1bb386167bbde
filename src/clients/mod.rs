pub mod claude;
pub mod mock;

pub use claude::*;
pub use mock::*;
