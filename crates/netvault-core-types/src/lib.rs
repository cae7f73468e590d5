//! Core types shared across netvault facilities
//!
//! This crate provides foundational types used by the error, logging and
//! configuration facilities:
//!
//! - **Correlation types**: RequestId, attached to every ingested snapshot
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RequestId;
pub use sensitive::Sensitive;
