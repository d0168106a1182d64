pub mod footprint;
pub mod profile;

pub use footprint::*;
pub use profile::*;
