//! # homelink-domain
//!
//! Pure domain model for the homelink controller hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define the **control address** triple and its canonical key
//! - Define the **addressed message** envelope exchanged with clients and controllers
//! - Define **nodes** and **values** exposed by controllers
//! - Define **triggers** (named events forwarded to the automation layer)
//! - Value math that needs no IO: colours, numeric coercion, solar times
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod address;
pub mod color;
pub mod controller;
pub mod history;
pub mod message;
pub mod node;
pub mod sun;
pub mod trigger;
