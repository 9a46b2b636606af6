//! Speech provider implementations

pub mod minimax;
