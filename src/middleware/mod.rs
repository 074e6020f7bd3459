/*!
 * Middleware Module
 *
 * Cross-cutting HTTP concerns layered onto the Axum router.
 */

pub mod cors;
