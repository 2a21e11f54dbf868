//! # Animation Scheduler
//!
//! Owns every animation instance and advances them once per tick.
//!
//! Per tick:
//! 1. Terminal instances from the previous tick are dropped.
//! 2. Pending instances start (`Ready`) and sample their first frame.
//! 3. Running instances advance by `playback_rate * dt`, sample, and emit
//!    `Finish` when they pass their last iteration.
//!
//! Instances are processed in id order, so event order is deterministic.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AnimError, AnimResult};
use crate::instance::{
    AnimationId, AnimationInstance, AnimationSource, AnimationTarget, PlayState, PlaybackOptions,
};
use crate::timeline::{Keyframe, PropertyValue, Timeline};

/// Lifecycle notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationEventKind {
    /// The instance started running.
    Ready,
    /// The instance played its last iteration.
    Finish,
    /// The instance was cancelled before finishing.
    Cancel,
}

/// A lifecycle notification for one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationEvent {
    /// Instance.
    pub id: AnimationId,
    /// Its owner.
    pub target: AnimationTarget,
    /// What happened.
    pub kind: AnimationEventKind,
}

/// Property values produced for one instance this tick.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSample {
    /// Instance.
    pub id: AnimationId,
    /// Its owner.
    pub target: AnimationTarget,
    /// Interpolated values.
    pub values: BTreeMap<String, PropertyValue>,
}

/// Owner of all animation instances.
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    instances: BTreeMap<AnimationId, AnimationInstance>,
    motions: HashMap<String, f32>,
    events: Vec<AnimationEvent>,
    next_id: u64,
}

impl AnimationScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers) a named motion clip.
    ///
    /// # Errors
    ///
    /// Fails on a negative or non-finite duration.
    pub fn register_motion(&mut self, name: &str, duration: f32) -> AnimResult<()> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(AnimError::InvalidDuration { index: 0, duration });
        }
        self.motions.insert(name.to_owned(), duration);
        Ok(())
    }

    /// Duration of a registered motion clip.
    #[must_use]
    pub fn motion_duration(&self, name: &str) -> Option<f32> {
        self.motions.get(name).copied()
    }

    fn insert(
        &mut self,
        target: AnimationTarget,
        source: AnimationSource,
        options: PlaybackOptions,
    ) -> AnimResult<AnimationId> {
        if options.iterations.is_nan() || options.iterations < 0.0 {
            return Err(AnimError::InvalidIterations(options.iterations));
        }
        self.next_id += 1;
        let id = AnimationId(self.next_id);
        self.instances
            .insert(id, AnimationInstance::new(id, target, source, options));
        Ok(id)
    }

    /// Starts a keyframe animation on `target`. It becomes `Running` on the
    /// next [`advance`](Self::advance).
    ///
    /// # Errors
    ///
    /// Fails on an invalid timeline or iteration count.
    pub fn animate(
        &mut self,
        target: AnimationTarget,
        keyframes: Vec<Keyframe>,
        options: PlaybackOptions,
    ) -> AnimResult<AnimationId> {
        let timeline = Timeline::new(keyframes)?;
        self.insert(target, AnimationSource::Keyframes(timeline), options)
    }

    /// Starts a registered motion clip on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`AnimError::UnknownMotion`] for unregistered names.
    pub fn play_motion(
        &mut self,
        target: AnimationTarget,
        name: &str,
        options: PlaybackOptions,
    ) -> AnimResult<AnimationId> {
        let duration = self
            .motion_duration(name)
            .ok_or_else(|| AnimError::UnknownMotion(name.to_owned()))?;
        let source = AnimationSource::Motion {
            name: name.to_owned(),
            duration,
        };
        self.insert(target, source, options)
    }

    /// Looks up an instance.
    #[must_use]
    pub fn get(&self, id: AnimationId) -> Option<&AnimationInstance> {
        self.instances.get(&id)
    }

    /// State of an instance; `None` once it has been dropped.
    #[must_use]
    pub fn state(&self, id: AnimationId) -> Option<PlayState> {
        self.instances.get(&id).map(AnimationInstance::state)
    }

    /// Changes an instance's playback rate. Returns `false` if unknown.
    pub fn set_playback_rate(&mut self, id: AnimationId, rate: f32) -> bool {
        match self.instances.get_mut(&id) {
            Some(instance) => {
                instance.set_playback_rate(rate);
                true
            }
            None => false,
        }
    }

    /// Cancels an instance and queues its `Cancel` event.
    ///
    /// Returns `false` if it was unknown or already terminal.
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        let Some(instance) = self.instances.get_mut(&id) else {
            return false;
        };
        if !instance.cancel() {
            return false;
        }
        self.events.push(AnimationEvent {
            id,
            target: instance.target,
            kind: AnimationEventKind::Cancel,
        });
        true
    }

    /// Drops every instance owned by `target` without emitting events.
    ///
    /// Used when the target is destroyed; queued events for those instances
    /// are discarded too.
    pub fn remove_target(&mut self, target: AnimationTarget) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, instance| instance.target != target);
        self.events.retain(|event| event.target != target);
        before - self.instances.len()
    }

    /// Number of instances that are pending or running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.instances
            .values()
            .filter(|i| !i.state().is_terminal())
            .count()
    }

    /// Instances owned by `target`, in id order.
    #[must_use]
    pub fn instances_of(&self, target: AnimationTarget) -> Vec<AnimationId> {
        self.instances
            .values()
            .filter(|i| i.target == target)
            .map(|i| i.id)
            .collect()
    }

    /// Runs one tick and returns the property samples to apply.
    pub fn advance(&mut self, dt: f32) -> Vec<AnimationSample> {
        self.instances
            .retain(|_, instance| !instance.state().is_terminal());

        let mut samples = Vec::new();
        for instance in self.instances.values_mut() {
            match instance.state() {
                PlayState::Pending => {
                    instance.start();
                    self.events.push(AnimationEvent {
                        id: instance.id,
                        target: instance.target,
                        kind: AnimationEventKind::Ready,
                    });
                }
                PlayState::Running => {
                    if instance.advance(dt) {
                        self.events.push(AnimationEvent {
                            id: instance.id,
                            target: instance.target,
                            kind: AnimationEventKind::Finish,
                        });
                    }
                }
                PlayState::Finished | PlayState::Cancelled => continue,
            }
            if let Some(values) = instance.sample() {
                samples.push(AnimationSample {
                    id: instance.id,
                    target: instance.target,
                    values,
                });
            }
        }

        if !self.events.is_empty() {
            tracing::trace!(events = self.events.len(), "animation lifecycle events queued");
        }
        samples
    }

    /// Takes the lifecycle events queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Direction;
    use bloxim_core::EntityId;

    fn pair() -> Vec<Keyframe> {
        vec![
            Keyframe::after(0.0).scalar("x", 0.0),
            Keyframe::after(1.0).scalar("x", 10.0),
        ]
    }

    fn x(sample: &AnimationSample) -> f32 {
        match sample.values.get("x") {
            Some(PropertyValue::Scalar(v)) => *v,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn kinds(events: &[AnimationEvent]) -> Vec<AnimationEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_lifecycle_ready_then_finish() {
        let mut scheduler = AnimationScheduler::new();
        let id = scheduler
            .animate(AnimationTarget::World, pair(), PlaybackOptions::default())
            .unwrap();
        assert_eq!(scheduler.state(id), Some(PlayState::Pending));

        let samples = scheduler.advance(0.5);
        assert_eq!(x(&samples[0]), 0.0);
        assert_eq!(kinds(&scheduler.drain_events()), vec![AnimationEventKind::Ready]);

        let samples = scheduler.advance(0.5);
        assert!((x(&samples[0]) - 5.0).abs() < 1e-5);
        assert!(scheduler.drain_events().is_empty());

        let samples = scheduler.advance(0.5);
        assert_eq!(x(&samples[0]), 10.0);
        assert_eq!(kinds(&scheduler.drain_events()), vec![AnimationEventKind::Finish]);
        assert_eq!(scheduler.state(id), Some(PlayState::Finished));

        // Terminal instances are dropped on the following tick.
        assert!(scheduler.advance(0.5).is_empty());
        assert_eq!(scheduler.state(id), None);
    }

    #[test]
    fn test_alternate_ends_at_start_value() {
        let mut scheduler = AnimationScheduler::new();
        scheduler
            .animate(
                AnimationTarget::World,
                pair(),
                PlaybackOptions::default()
                    .iterations(2.0)
                    .direction(Direction::Alternate),
            )
            .unwrap();

        let mut last = None;
        for _ in 0..20 {
            if let Some(sample) = scheduler.advance(0.25).pop() {
                last = Some(x(&sample));
            }
        }
        assert_eq!(last, Some(0.0));
    }

    #[test]
    fn test_cancel_emits_cancel_not_finish() {
        let mut scheduler = AnimationScheduler::new();
        let id = scheduler
            .animate(AnimationTarget::World, pair(), PlaybackOptions::default())
            .unwrap();
        scheduler.advance(0.1);
        scheduler.advance(0.3);
        scheduler.drain_events();

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        scheduler.advance(5.0);
        assert_eq!(kinds(&scheduler.drain_events()), vec![AnimationEventKind::Cancel]);
    }

    #[test]
    fn test_remove_target_is_silent() {
        let mut scheduler = AnimationScheduler::new();
        let target = AnimationTarget::Entity(EntityId::new(3, 0));
        let a = scheduler
            .animate(target, pair(), PlaybackOptions::default())
            .unwrap();
        let b = scheduler
            .animate(AnimationTarget::World, pair(), PlaybackOptions::default())
            .unwrap();
        scheduler.advance(0.1);

        assert_eq!(scheduler.remove_target(target), 1);
        assert_eq!(scheduler.state(a), None);
        let events = scheduler.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, b);
    }

    #[test]
    fn test_motion_clip_has_no_samples() {
        let mut scheduler = AnimationScheduler::new();
        scheduler.register_motion("wave", 1.0).unwrap();
        let id = scheduler
            .play_motion(AnimationTarget::World, "wave", PlaybackOptions::default())
            .unwrap();

        assert!(scheduler.advance(0.5).is_empty());
        scheduler.advance(0.6);
        scheduler.advance(0.6);
        assert_eq!(scheduler.state(id), Some(PlayState::Finished));
        assert_eq!(
            kinds(&scheduler.drain_events()),
            vec![AnimationEventKind::Ready, AnimationEventKind::Finish]
        );

        assert_eq!(
            scheduler.play_motion(AnimationTarget::World, "dance", PlaybackOptions::default()),
            Err(AnimError::UnknownMotion("dance".into()))
        );
    }
}
