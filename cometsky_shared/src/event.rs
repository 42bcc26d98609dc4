//! Sky events.
//!
//! UI-side mutations (typing, dragging, editing, melting) do not touch the
//! comet list directly. They are queued here and drained by the state holder
//! at the start of the next frame, before motion runs, so the list only ever
//! changes from one place.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::{
    comet::{CometColor, CometId},
    math::Vec2,
    motion::SimMode,
};

/// A mutation requested by a collaborator outside the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SkyEvent {
    /// New idea typed and submitted.
    Submitted {
        text: String,
        color: Option<CometColor>,
    },
    /// Label changed from the sky or from the list view.
    Edited { id: CometId, text: String },
    /// Long-press or double-tap removal.
    Melted { id: CometId },
    /// Drag finished at `position`, let go at `release_velocity` px/s.
    DragReleased {
        id: CometId,
        position: Vec2,
        release_velocity: Vec2,
    },
    /// Bulk removal.
    Cleared,
    ModeChanged(SimMode),
}

/// Typed event bus.
#[derive(Default)]
pub struct EventBus {
    queues: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl EventBus {
    /// Pushes an event into the queue.
    pub fn push<E: 'static + Send + Sync>(&mut self, e: E) {
        let q = self
            .queues
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<E>::new()));
        if let Some(q) = q.downcast_mut::<Vec<E>>() {
            q.push(e);
        }
    }

    /// Drains all queued events of a type, oldest first.
    pub fn drain<E: 'static + Send + Sync>(&mut self) -> Vec<E> {
        self.queues
            .remove(&TypeId::of::<E>())
            .and_then(|boxed| boxed.downcast::<Vec<E>>().ok())
            .map(|boxed| *boxed)
            .unwrap_or_default()
    }

    /// Number of queued events of a type.
    pub fn pending<E: 'static + Send + Sync>(&self) -> usize {
        self.queues
            .get(&TypeId::of::<E>())
            .and_then(|boxed| boxed.downcast_ref::<Vec<E>>())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties_queue() {
        let mut bus = EventBus::default();
        bus.push(SkyEvent::Cleared);
        bus.push(SkyEvent::ModeChanged(SimMode::Pinned));
        assert_eq!(bus.pending::<SkyEvent>(), 2);

        let drained = bus.drain::<SkyEvent>();
        assert_eq!(
            drained,
            vec![SkyEvent::Cleared, SkyEvent::ModeChanged(SimMode::Pinned)]
        );
        assert_eq!(bus.pending::<SkyEvent>(), 0);
        assert!(bus.drain::<SkyEvent>().is_empty());
    }

    #[test]
    fn queues_are_separate_per_type() {
        let mut bus = EventBus::default();
        bus.push(SkyEvent::Cleared);
        bus.push(7u32);
        assert_eq!(bus.drain::<u32>(), vec![7]);
        assert_eq!(bus.pending::<SkyEvent>(), 1);
    }
}
