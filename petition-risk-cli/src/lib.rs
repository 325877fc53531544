// All pipeline functionality is in petition-risk-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod logging;

// Re-export core types for convenience
pub use petition_risk_core::*;

// Re-export CLI utilities
pub use logging::init_tracing;
