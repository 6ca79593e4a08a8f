mod arpa;
mod serde_ext;

pub use arpa::*;
pub use serde_ext::*;
