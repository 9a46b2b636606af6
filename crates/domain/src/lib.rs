//! Domain layer for DuoCast
//!
//! Contains the podcast generation vocabulary: speakers, sentences, batches,
//! voice bindings, synthesis outcomes, the event stream records and the PCM
//! clip used by the progressive assembler. No I/O happens here.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
