/**
 * Routes Module
 * HTTP route handlers
 */

pub mod blog;
pub mod health;
