//! Shared types for Mesa

mod error;

pub use error::{MesaError, Result};
