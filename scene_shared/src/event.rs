//! Host events.
//!
//! Pointer, wheel and resize notifications arrive between ticks. They are
//! queued here and drained by the frame scheduler at the next tick boundary,
//! so no state changes mid-tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Pointer button that started a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

/// Edge-triggered input from the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PointerDown { x: f32, y: f32, button: PointerButton },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    Wheel { delta_y: f32 },
    Resize { width: f32, height: f32 },
}

/// FIFO queue of events waiting for the next tick.
#[derive(Debug)]
pub struct EventQueue<E> {
    queue: VecDeque<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<E> EventQueue<E> {
    /// Pushes an event into the queue.
    pub fn push(&mut self, e: E) {
        self.queue.push_back(e);
    }

    /// Drains all queued events in arrival order.
    pub fn drain(&mut self) -> Vec<E> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut q = EventQueue::default();
        q.push(HostEvent::PointerDown {
            x: 1.0,
            y: 2.0,
            button: PointerButton::Primary,
        });
        q.push(HostEvent::PointerUp);
        let drained = q.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1], HostEvent::PointerUp);
        assert!(q.is_empty());
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let e: HostEvent =
            serde_json::from_str(r#"{"type":"resize","width":640,"height":480}"#).unwrap();
        assert_eq!(
            e,
            HostEvent::Resize {
                width: 640.0,
                height: 480.0
            }
        );
    }
}
