//! Notifications emitted by [`GameRepository`](crate::repository::GameRepository).
//!
//! Delivery is synchronous and fire-and-forget. A listener only gets a shared
//! reference to the notification, so it cannot reach back into the session
//! while the call that produced it is still running.

use crate::engine::{CellChange, Direction, GridState, Placement, Score, Tile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A move slid the grid and (if room remained) spawned a tile.
    MoveApplied {
        direction: Direction,
        changes: Vec<CellChange>,
        spawned: Option<Placement>,
        score_delta: Score,
        score: Score,
    },
    /// The session stepped back to `state`.
    UndoApplied { state: GridState },
    LivesChanged { remaining_lives: u32 },
    MaxNumberChanged { highest: Tile },
    UndoDepthChanged { remaining_undos: usize },
    GameOver { score: Score, highest: Tile },
    GoalReached { goal: Tile, highest: Tile },
    PlayerNameChanged { name: String },
}

pub trait Listener {
    fn notify(&mut self, notification: &Notification);
}

impl<F: FnMut(&Notification)> Listener for F {
    fn notify(&mut self, notification: &Notification) { self(notification) }
}

/// Listener that keeps every notification it sees, for tests and replay.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    seen: std::rc::Rc<std::cell::RefCell<Vec<Notification>>>,
}

impl Recorder {
    pub fn new() -> Self { Self::default() }

    /// Drain what has been recorded so far.
    pub fn take(&self) -> Vec<Notification> { std::mem::take(&mut *self.seen.borrow_mut()) }

    pub fn len(&self) -> usize { self.seen.borrow().len() }

    pub fn is_empty(&self) -> bool { self.seen.borrow().is_empty() }
}

impl Listener for Recorder {
    fn notify(&mut self, notification: &Notification) { self.seen.borrow_mut().push(notification.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_listeners() {
        let mut count = 0;
        {
            let mut listener = |_: &Notification| count += 1;
            listener.notify(&Notification::LivesChanged { remaining_lives: 2 });
            listener.notify(&Notification::MaxNumberChanged { highest: 8 });
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn recorder_clones_share_storage() {
        let recorder = Recorder::new();
        let mut handle = recorder.clone();
        handle.notify(&Notification::UndoDepthChanged { remaining_undos: 1 });
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.take(), vec![Notification::UndoDepthChanged { remaining_undos: 1 }]);
        assert!(recorder.is_empty());
    }
}
