//! Per-tick logic units.
//!
//! Systems run in registration order on every [`Registry::update`] call,
//! before the deferred queues are flushed. A system registered while a
//! tick is in flight first runs on the following tick.
//!
//! [`Registry::update`]: crate::registry::Registry::update

use crate::registry::Registry;

/// A unit of per-tick logic driven by [`Registry::update`].
///
/// Systems receive the whole store mutably. Structural changes issued
/// while iterating a query should go through the deferred paths so the
/// flush barrier applies them after iteration.
///
/// [`Registry::update`]: crate::registry::Registry::update
pub trait System {
    /// Advance this system by `dt` seconds.
    fn update(&mut self, registry: &mut Registry, dt: f32);
}
