//! Fixed-timestep frame loop.
//!
//! The [`FrameLoop`] owns the [`EntityManager`] and drives it one frame at a
//! time:
//!
//! 1. Every registered system runs in registration order against the
//!    committed entity view. Systems may spawn (staged) and destroy (flagged)
//!    entities and read or write components freely.
//! 2. [`EntityManager::update`] is called exactly once, committing this
//!    frame's spawns and purging this frame's destroyed entities.
//! 3. The frame counter advances.
//!
//! # Example
//!
//! ```
//! use yerb_engine::prelude::*;
//!
//! let mut frames = FrameLoop::new(FrameConfig::default()).unwrap();
//! frames
//!     .add_system("spawner", |manager, ctx| {
//!         if ctx.frame == 0 {
//!             manager.add_entity(EntityTag::Player);
//!         }
//!     })
//!     .unwrap();
//!
//! frames.run_frames(3);
//! assert_eq!(frames.frame_count(), 3);
//! assert_eq!(frames.manager().entities_by_tag(EntityTag::Player).len(), 1);
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;
use yerb_ecs::manager::{EntityManager, UpdateReport};

use crate::FrameError;

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

/// Configuration for the frame loop.
///
/// Missing fields take their [`Default`] values when deserialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Fixed time step in seconds per frame. Must be positive and finite.
    pub fixed_dt: f64,
    /// Committed-entity capacity to reserve up front.
    pub entity_capacity: usize,
}

impl Default for FrameConfig {
    /// 60 Hz, no pre-reserved capacity.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            entity_capacity: 0,
        }
    }
}

impl FrameConfig {
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.fixed_dt > 0.0 && self.fixed_dt.is_finite() {
            Ok(())
        } else {
            Err(FrameError::InvalidTimestep {
                fixed_dt: self.fixed_dt,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// FrameContext / FrameDiagnostics
// ---------------------------------------------------------------------------

/// Per-frame information handed to every system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Index of the frame being run, starting at 0.
    pub frame: u64,
    /// Fixed time step in seconds.
    pub dt: f64,
    /// Simulation time at the start of this frame.
    pub sim_time: f64,
}

/// Timing and lifecycle diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Time spent in [`EntityManager::update`].
    pub update_time: Duration,
    /// Total time for the frame.
    pub total_time: Duration,
    /// What the frame's update committed and purged.
    pub update: UpdateReport,
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// A system run once per frame.
///
/// Systems see the manager by shared reference: they can spawn through
/// [`EntityManager::add_entity`] and mutate components, but the committed
/// entity lists stay fixed until the frame's update.
pub type SystemFn = Box<dyn FnMut(&EntityManager, &FrameContext)>;

struct RegisteredSystem {
    name: String,
    func: SystemFn,
}

impl fmt::Debug for RegisteredSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredSystem")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// Runs systems and commits entity changes once per frame.
#[derive(Debug)]
pub struct FrameLoop {
    manager: EntityManager,
    systems: Vec<RegisteredSystem>,
    /// Number of frames executed so far.
    frame_counter: u64,
    config: FrameConfig,
    last_diagnostics: FrameDiagnostics,
}

impl FrameLoop {
    /// Create a frame loop with an empty entity manager.
    pub fn new(config: FrameConfig) -> Result<Self, FrameError> {
        config.validate()?;
        Ok(Self {
            manager: EntityManager::with_capacity(config.entity_capacity),
            systems: Vec::new(),
            frame_counter: 0,
            config,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Register a system. Systems run in registration order.
    pub fn add_system<F>(&mut self, name: &str, func: F) -> Result<(), FrameError>
    where
        F: FnMut(&EntityManager, &FrameContext) + 'static,
    {
        if self.systems.iter().any(|s| s.name == name) {
            return Err(FrameError::DuplicateSystem {
                name: name.to_owned(),
            });
        }
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func: Box::new(func),
        });
        Ok(())
    }

    /// Execute one frame: all systems, then exactly one manager update.
    pub fn frame(&mut self) -> UpdateReport {
        let frame_start = Instant::now();
        let ctx = FrameContext {
            frame: self.frame_counter,
            dt: self.config.fixed_dt,
            sim_time: self.sim_time(),
        };

        let mut system_times = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let start = Instant::now();
            (system.func)(&self.manager, &ctx);
            system_times.push((system.name.clone(), start.elapsed()));
        }

        let update_start = Instant::now();
        let update = self.manager.update();
        let update_time = update_start.elapsed();

        self.frame_counter += 1;
        self.last_diagnostics = FrameDiagnostics {
            system_times,
            update_time,
            total_time: frame_start.elapsed(),
            update,
        };

        debug!(
            frame = ctx.frame,
            deferred_writes = update.deferred_writes,
            committed = update.committed,
            purged = update.purged,
            live = update.live,
            "frame complete"
        );
        update
    }

    /// Run `count` frames.
    ///
    /// Returns the combined report: deferred writes, committed and purged are
    /// summed, live is the count after the final frame.
    pub fn run_frames(&mut self, count: u64) -> UpdateReport {
        let mut total = UpdateReport {
            live: self.manager.len(),
            ..UpdateReport::default()
        };
        for _ in 0..count {
            let report = self.frame();
            total.committed += report.committed;
            total.purged += report.purged;
            total.deferred_writes += report.deferred_writes;
            total.live = report.live;
        }
        total
    }

    // -- accessors ----------------------------------------------------------

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Simulation time in seconds, computed as `frame_count * fixed_dt`.
    pub fn sim_time(&self) -> f64 {
        self.frame_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    /// Mutable manager access, for setup outside the frame loop.
    ///
    /// Calling [`EntityManager::update`] through this breaks the
    /// once-per-frame contract; let [`frame`](Self::frame) do it.
    pub fn manager_mut(&mut self) -> &mut EntityManager {
        &mut self.manager
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
