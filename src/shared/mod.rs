pub mod error;
pub mod result;
pub mod security;
pub mod shutdown;

pub use result::Result;
