pub mod layout;
pub mod store;

pub use layout::*;
pub use store::*;
