// Export all route modules
pub mod analyze;

// Re-export all route handlers for easy importing
pub use analyze::*;
