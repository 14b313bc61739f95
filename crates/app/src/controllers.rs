//! Controllers that need no external backend.

pub mod general;

pub use general::GeneralController;
