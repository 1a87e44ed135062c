//! Collaborator traits
//!
//! These traits define the interface between the command engine and the
//! hardware it drives.

pub mod radio;

pub use radio::{Radio, RadioError, MAX_FREQUENCY_BAND};
