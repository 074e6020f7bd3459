/*!
 * Utilities Module
 *
 * Error taxonomy shared across the engine and HTTP surface.
 */

pub mod errors;

pub use errors::{EngineError, Result, Suggestions};
