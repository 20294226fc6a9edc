/// Ports module defining interfaces for hexagonal architecture
///
/// The audit engine is driven by the CLI directly, so only outbound
/// (driven) ports are defined.
pub mod outbound;
