/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod channels;
pub mod console;
pub mod filesystem;
pub mod formatters;
pub mod scanners;
