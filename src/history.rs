//! Bounded, newest-first history of grid states.

use std::collections::VecDeque;

use crate::engine::GridState;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    #[error("undo chain capacity must be at least 1")]
    ZeroCapacity,
    #[error("undo chain must contain at least one state")]
    Empty,
    #[error("undo chain holds {len} states but capacity is {capacity}")]
    OverCapacity { len: usize, capacity: usize },
    #[error("no earlier state to return to")]
    NoHistory,
}

/// Undo chain: front is the current state, back is the oldest retained one.
///
/// Never empty, never longer than its capacity.
///
/// ```
/// use tiles_2048::engine::GridState;
/// use tiles_2048::history::UndoChain;
/// let origin = GridState::empty(4, 4).unwrap();
/// let mut chain = UndoChain::new(origin.clone(), 3).unwrap();
/// chain.push_front(origin.with_tile(0, 0, 2).unwrap());
/// assert_eq!(chain.depth(), 2);
/// assert_eq!(chain.pop_front().unwrap(), &origin);
/// assert!(chain.pop_front().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoChain {
    states: VecDeque<GridState>,
    capacity: usize,
}

impl UndoChain {
    pub fn new(origin: GridState, capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        let mut states = VecDeque::with_capacity(capacity);
        states.push_back(origin);
        Ok(Self { states, capacity })
    }

    /// Rebuild a chain from states ordered newest first.
    pub fn from_states(newest_first: Vec<GridState>, capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        if newest_first.is_empty() {
            return Err(HistoryError::Empty);
        }
        if newest_first.len() > capacity {
            return Err(HistoryError::OverCapacity { len: newest_first.len(), capacity });
        }
        Ok(Self { states: newest_first.into(), capacity })
    }

    /// Insert a new current state, evicting the oldest one when full.
    ///
    /// Returns the evicted state, if any.
    pub fn push_front(&mut self, state: GridState) -> Option<GridState> {
        let evicted = if self.states.len() >= self.capacity { self.states.pop_back() } else { None };
        self.states.push_front(state);
        evicted
    }

    /// Drop the current state and return the one before it.
    ///
    /// The oldest retained state is the floor and is never removed.
    pub fn pop_front(&mut self) -> Result<&GridState, HistoryError> {
        if self.states.len() <= 1 {
            return Err(HistoryError::NoHistory);
        }
        self.states.pop_front();
        self.states.front().ok_or(HistoryError::Empty)
    }

    #[inline]
    pub fn peek_front(&self) -> &GridState {
        // len >= 1 is maintained by every constructor and mutator
        &self.states[0]
    }

    #[inline]
    pub fn depth(&self) -> usize { self.states.len() }

    /// Number of undos currently possible.
    #[inline]
    pub fn remaining_undos(&self) -> usize { self.states.len() - 1 }

    #[inline]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &GridState> + '_ { self.states.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: u64) -> GridState {
        GridState::from_rows(vec![vec![n, 0], vec![0, 0]], n).unwrap()
    }

    #[test]
    fn it_rejects_zero_capacity() {
        assert_eq!(UndoChain::new(state(1), 0), Err(HistoryError::ZeroCapacity));
        assert_eq!(UndoChain::from_states(vec![state(1)], 0), Err(HistoryError::ZeroCapacity));
    }

    #[test]
    fn it_rebuilds_from_states() {
        assert_eq!(UndoChain::from_states(vec![], 3), Err(HistoryError::Empty));
        assert_eq!(
            UndoChain::from_states(vec![state(1), state(2)], 1),
            Err(HistoryError::OverCapacity { len: 2, capacity: 1 })
        );
        let chain = UndoChain::from_states(vec![state(3), state(2), state(1)], 5).unwrap();
        assert_eq!(chain.peek_front(), &state(3));
        assert_eq!(chain.remaining_undos(), 2);
    }

    #[test]
    fn test_bounded_push_keeps_most_recent() {
        let max_undos = 4;
        let mut chain = UndoChain::new(state(0), max_undos).unwrap();
        let mut evictions = 0;
        for n in 1..=(max_undos as u64 + 3) {
            if chain.push_front(state(n)).is_some() {
                evictions += 1;
            }
            assert!(chain.depth() <= max_undos);
        }
        assert_eq!(chain.depth(), max_undos);
        assert_eq!(evictions, 4);
        let kept: Vec<u64> = chain.iter().map(GridState::score).collect();
        assert_eq!(kept, vec![7, 6, 5, 4]);
    }

    #[test]
    fn test_eviction_returns_oldest() {
        let mut chain = UndoChain::new(state(0), 2).unwrap();
        assert_eq!(chain.push_front(state(1)), None);
        assert_eq!(chain.push_front(state(2)), Some(state(0)));
    }

    #[test]
    fn test_undo_floor() {
        let mut chain = UndoChain::new(state(0), 3).unwrap();
        assert_eq!(chain.pop_front(), Err(HistoryError::NoHistory));
        assert_eq!(chain.depth(), 1);
        assert_eq!(chain.peek_front(), &state(0));

        chain.push_front(state(1));
        chain.push_front(state(2));
        assert_eq!(chain.pop_front(), Ok(&state(1)));
        assert_eq!(chain.pop_front(), Ok(&state(0)));
        assert_eq!(chain.pop_front(), Err(HistoryError::NoHistory));
    }

    #[test]
    fn test_capacity_one_never_allows_undo() {
        let mut chain = UndoChain::new(state(0), 1).unwrap();
        assert_eq!(chain.push_front(state(1)), Some(state(0)));
        assert_eq!(chain.depth(), 1);
        assert_eq!(chain.remaining_undos(), 0);
        assert_eq!(chain.pop_front(), Err(HistoryError::NoHistory));
    }
}
