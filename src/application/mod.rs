/// Application layer - Use cases, services and DTOs
///
/// This layer orchestrates the auditing domain and coordinates with
/// infrastructure through ports.
pub mod dto;
pub mod factories;
pub mod services;
pub mod use_cases;
