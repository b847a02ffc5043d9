//! Deferred destruction.
//!
//! One-shot timers for short-lived objects such as spell effects. A timer can
//! take its timeout from an attached particle effect, and can ask for the
//! object's children to be detached before it goes away.

use std::collections::BTreeMap;

use tracing::debug;

/// What to do when a timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyAction {
    pub detach_children: bool,
}

/// Single object lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredDestroy {
    timeout: f32,
    detach_children: bool,
    elapsed: f32,
    fired: bool,
}

impl DeferredDestroy {
    pub fn new(timeout: f32, detach_children: bool) -> Self {
        Self {
            timeout: timeout.max(0.0),
            detach_children,
            elapsed: 0.0,
            fired: false,
        }
    }

    /// Lifetime matching a particle effect's duration.
    pub fn for_particles(duration: f32, detach_children: bool) -> Self {
        Self::new(duration, detach_children)
    }

    pub fn timeout(&self) -> f32 {
        self.timeout
    }

    pub fn remaining(&self) -> f32 {
        (self.timeout - self.elapsed).max(0.0)
    }

    pub fn is_expired(&self) -> bool {
        self.fired
    }

    /// Advances the timer; yields the action on the tick it expires and never
    /// again.
    pub fn advance(&mut self, dt: f32) -> Option<DestroyAction> {
        if self.fired {
            return None;
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.timeout {
            self.fired = true;
            return Some(DestroyAction {
                detach_children: self.detach_children,
            });
        }
        None
    }
}

impl Default for DeferredDestroy {
    fn default() -> Self {
        Self::new(10.0, false)
    }
}

/// Many lifetimes keyed by object id.
#[derive(Debug)]
pub struct LifetimeScheduler<K> {
    timers: BTreeMap<K, DeferredDestroy>,
}

impl<K> Default for LifetimeScheduler<K> {
    fn default() -> Self {
        Self {
            timers: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy + std::fmt::Debug> LifetimeScheduler<K> {
    pub fn schedule(&mut self, key: K, timer: DeferredDestroy) {
        self.timers.insert(key, timer);
    }

    pub fn cancel(&mut self, key: K) -> Option<DeferredDestroy> {
        self.timers.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advances all timers and removes the expired ones, in key order.
    pub fn advance(&mut self, dt: f32) -> Vec<(K, DestroyAction)> {
        let mut expired = Vec::new();
        for (key, timer) in self.timers.iter_mut() {
            if let Some(action) = timer.advance(dt) {
                expired.push((*key, action));
            }
        }
        for (key, _) in &expired {
            self.timers.remove(key);
            debug!(key = ?key, "lifetime expired");
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_timeout() {
        let mut timer = DeferredDestroy::new(1.0, true);
        assert_eq!(timer.advance(0.5), None);
        assert_eq!(
            timer.advance(0.5),
            Some(DestroyAction {
                detach_children: true
            })
        );
        assert!(timer.is_expired());
        assert_eq!(timer.advance(5.0), None);
    }

    #[test]
    fn default_timeout_is_ten_seconds() {
        let timer = DeferredDestroy::default();
        assert_eq!(timer.timeout(), 10.0);
        assert_eq!(timer.remaining(), 10.0);
    }

    #[test]
    fn particle_duration_sets_timeout() {
        let mut timer = DeferredDestroy::for_particles(0.25, false);
        assert_eq!(timer.advance(0.2), None);
        assert_eq!(
            timer.advance(0.1),
            Some(DestroyAction {
                detach_children: false
            })
        );
    }

    #[test]
    fn scheduler_reports_and_forgets_expired() {
        let mut sched = LifetimeScheduler::default();
        sched.schedule(1u32, DeferredDestroy::new(0.1, false));
        sched.schedule(2u32, DeferredDestroy::new(1.0, true));
        sched.schedule(3u32, DeferredDestroy::new(0.05, false));

        let first = sched.advance(0.1);
        assert_eq!(first.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(sched.len(), 1);

        assert!(sched.cancel(2).is_some());
        assert!(sched.advance(5.0).is_empty());
    }
}
