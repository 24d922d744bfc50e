//! Error types and diagnostics for the front end.
//!
//! - [`errors::Error`] is what every stage returns internally: an
//!   [`errors::ErrorImpl`] variant plus the span it refers to.
//! - [`diagnostics::Diagnostic`] is the structured record handed to the
//!   driver, tagged with a level and the stage that produced it.

pub mod diagnostics;
pub mod errors;

#[cfg(test)]
mod tests;
