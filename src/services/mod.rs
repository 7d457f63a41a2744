//! Services that talk to Gemini.

pub mod content;

pub use content::*;
