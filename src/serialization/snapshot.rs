use serde::{Deserialize, Serialize};

use crate::engine::{GridState, Score, Tile};
use crate::history::HistoryError;

/// Largest tile a snapshot may hold; anything bigger could not be doubled.
pub const MAX_TILE: Tile = Tile::MAX / 2;

/// One grid in a persisted undo chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSnapshot {
    /// Rows top to bottom.
    pub cells: Vec<Vec<Tile>>,
    pub score: Score,
}

impl From<&GridState> for GridSnapshot {
    fn from(state: &GridState) -> Self { GridSnapshot { cells: state.to_rows(), score: state.score() } }
}

/// Complete persisted session.
///
/// `undo_chain` is ordered newest first. The highest tile ever seen is not
/// stored; it is recomputed from the chain on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GameSnapshot {
    pub remaining_lives: u32,
    pub grid_width: usize,
    pub grid_height: usize,
    pub goal: Tile,
    pub player_name: String,
    pub accepted_spawnables: Vec<Tile>,
    pub max_undos: usize,
    pub undo_chain: Vec<GridSnapshot>,
}

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("grid must be at least 2x2, got {width}x{height}")]
    GridTooSmall { width: usize, height: usize },
    #[error("undo chain entry {index} holds tile {value}, too large to merge")]
    TileTooLarge { index: usize, value: Tile },
    #[error("undo chain entry {index} is not a {width}x{height} grid")]
    ShapeMismatch { index: usize, width: usize, height: usize },
    #[error("accepted spawnables must be a non-empty list of positive values")]
    InvalidSpawnables,
    #[error("goal must be a positive tile value")]
    InvalidGoal,
    #[error("invalid undo chain: {0}")]
    History(#[from] HistoryError),
}

impl GameSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> { Ok(serde_json::to_string_pretty(self)?) }

    /// Parse and validate JSON. Nothing is returned unless the whole
    /// document is usable.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: GameSnapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), SnapshotError> { self.grid_states().map(|_| ()) }

    /// Check every field and convert the chain into grid states, newest first.
    pub fn grid_states(&self) -> Result<Vec<GridState>, SnapshotError> {
        let (width, height) = (self.grid_width, self.grid_height);
        if width < 2 || height < 2 {
            return Err(SnapshotError::GridTooSmall { width, height });
        }
        if self.goal == 0 {
            return Err(SnapshotError::InvalidGoal);
        }
        if self.accepted_spawnables.is_empty() || self.accepted_spawnables.contains(&0) {
            return Err(SnapshotError::InvalidSpawnables);
        }
        if self.max_undos == 0 {
            return Err(HistoryError::ZeroCapacity.into());
        }
        if self.undo_chain.is_empty() {
            return Err(HistoryError::Empty.into());
        }
        if self.undo_chain.len() > self.max_undos {
            return Err(HistoryError::OverCapacity { len: self.undo_chain.len(), capacity: self.max_undos }.into());
        }

        self.undo_chain
            .iter()
            .enumerate()
            .map(|(index, grid)| {
                let mismatch = SnapshotError::ShapeMismatch { index, width, height };
                if grid.cells.len() != height || grid.cells.iter().any(|row| row.len() != width) {
                    return Err(mismatch);
                }
                if let Some(&value) = grid.cells.iter().flatten().find(|&&v| v > MAX_TILE) {
                    return Err(SnapshotError::TileTooLarge { index, value });
                }
                GridState::from_rows(grid.cells.clone(), grid.score).map_err(|_| mismatch)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameSnapshot {
        GameSnapshot {
            remaining_lives: 2,
            grid_width: 3,
            grid_height: 2,
            goal: 64,
            player_name: "ada".to_string(),
            accepted_spawnables: vec![2, 2, 4],
            max_undos: 3,
            undo_chain: vec![
                GridSnapshot { cells: vec![vec![4, 0, 2], vec![0, 0, 0]], score: 4 },
                GridSnapshot { cells: vec![vec![2, 2, 0], vec![0, 0, 0]], score: 0 },
            ],
        }
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = sample().to_json().unwrap();
        for field in ["remainingLives", "gridWidth", "gridHeight", "goal", "playerName", "acceptedSpawnables", "maxUndos", "undoChain", "cells", "score"] {
            assert!(json.contains(&format!("\"{field}\"")), "missing {field}");
        }
        assert_eq!(GameSnapshot::from_json(&json).unwrap(), sample());
    }

    #[test]
    fn grid_states_newest_first() {
        let states = sample().grid_states().unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].score(), 4);
        assert_eq!(states[1].to_rows(), vec![vec![2, 2, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn missing_field_is_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("maxUndos");
        assert!(matches!(GameSnapshot::from_json(&value.to_string()), Err(SnapshotError::Json(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(GameSnapshot::from_json("{\"remainingLives\": 3,"), Err(SnapshotError::Json(_))));
    }

    #[test]
    fn structural_errors() {
        let s = GameSnapshot { undo_chain: vec![], ..sample() };
        assert!(matches!(s.validate(), Err(SnapshotError::History(HistoryError::Empty))));

        let s = GameSnapshot { max_undos: 1, ..sample() };
        assert!(matches!(s.validate(), Err(SnapshotError::History(HistoryError::OverCapacity { len: 2, capacity: 1 }))));

        let s = GameSnapshot { max_undos: 0, ..sample() };
        assert!(matches!(s.validate(), Err(SnapshotError::History(HistoryError::ZeroCapacity))));

        let s = GameSnapshot { grid_height: 1, ..sample() };
        assert!(matches!(s.validate(), Err(SnapshotError::GridTooSmall { width: 3, height: 1 })));

        let s = GameSnapshot { goal: 0, ..sample() };
        assert!(matches!(s.validate(), Err(SnapshotError::InvalidGoal)));

        let s = GameSnapshot { accepted_spawnables: vec![], ..sample() };
        assert!(matches!(s.validate(), Err(SnapshotError::InvalidSpawnables)));

        let mut s = sample();
        s.undo_chain[1].cells[0].pop();
        assert!(matches!(s.validate(), Err(SnapshotError::ShapeMismatch { index: 1, width: 3, height: 2 })));

        let mut s = sample();
        s.undo_chain[1].cells[1][2] = MAX_TILE + 1;
        assert!(matches!(s.validate(), Err(SnapshotError::TileTooLarge { index: 1, value }) if value == MAX_TILE + 1));

        let mut s = sample();
        s.undo_chain[0].cells[0][0] = MAX_TILE;
        assert!(s.validate().is_ok());

        let mut s = sample();
        s.undo_chain[0].cells.push(vec![0, 0, 0]);
        assert!(matches!(s.validate(), Err(SnapshotError::ShapeMismatch { index: 0, .. })));
    }
}
