//! Model and material import
//!
//! Turns Wavefront OBJ/MTL assets on disk into GPU-resident
//! [`crate::render::Drawable`]s.

pub mod model_loader;
pub mod mtl;

pub use model_loader::{ModelLoader, ObjScene};
pub use mtl::{MtlData, MtlParser};

use thiserror::Error;

/// Errors raised while importing a model
#[derive(Error, Debug)]
pub enum ModelError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A statement in the file did not parse
    #[error("parse error: {0}")]
    Parse(String),

    /// The file parsed but its content is unusable
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// GPU upload of geometry failed
    #[error(transparent)]
    Render(#[from] crate::render::RenderError),
}
