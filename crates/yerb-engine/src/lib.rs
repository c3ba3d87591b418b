//! Yerb Engine -- fixed-timestep frame loop over the Yerb ECS.
//!
//! [`FrameLoop`](frame::FrameLoop) owns an
//! [`EntityManager`](yerb_ecs::manager::EntityManager), runs registered
//! systems in order each frame and commits entity lifecycle changes with a
//! single update at the end of the frame. [`logging`] installs the
//! `tracing` subscriber used by binaries and demos.

#![deny(unsafe_code)]

pub mod frame;
pub mod logging;

pub use yerb_ecs;

/// Errors produced when configuring the frame loop.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The fixed time step was zero, negative or not finite.
    #[error("fixed_dt must be positive and finite, got {fixed_dt}")]
    InvalidTimestep { fixed_dt: f64 },

    /// A system with this name is already registered.
    #[error("system '{name}' is already registered")]
    DuplicateSystem { name: String },
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::frame::{FrameConfig, FrameContext, FrameDiagnostics, FrameLoop, SystemFn};
    pub use crate::FrameError;
    pub use yerb_ecs::prelude::*;
}
