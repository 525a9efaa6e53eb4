use rand::Rng;
use std::fmt;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in the order the stuck check tries them.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// Tile value; 0 is an empty cell.
pub type Tile = u64;
pub type Score = u64;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must be at least 2x2, got {width}x{height}")]
    TooSmall { width: usize, height: usize },
    #[error("a {width}x{height} grid has too many cells")]
    TooLarge { width: usize, height: usize },
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged { row: usize, len: usize, expected: usize },
    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfBounds { row: usize, col: usize },
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("cannot move in that direction")]
    CannotMoveInThatDirection,
}

/// One cell whose value differs between the input and output of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub row: usize,
    pub col: usize,
    pub from: Tile,
    pub to: Tile,
}

/// Where a spawned tile landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
    pub value: Tile,
}

/// Result of sliding a grid in one direction. No randomness involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub state: GridState,
    /// True iff at least one cell changed.
    pub moved: bool,
    pub score_delta: Score,
    pub merges: usize,
    /// Changed cells in row-major order.
    pub changes: Vec<CellChange>,
}

/// Result of a spawn attempt. `placed` is `None` when the grid is full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOutcome {
    pub state: GridState,
    pub placed: Option<Placement>,
}

/// Immutable snapshot of a `width x height` grid and its score.
///
/// Cells are stored row-major. Every transformation returns a new value;
/// the receiver is never modified.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GridState {
    width: usize,
    height: usize,
    cells: Vec<Tile>,
    score: Score,
}

impl GridState {
    /// An all-empty grid with score 0.
    pub fn empty(width: usize, height: usize) -> Result<Self, GridError> {
        check_dimensions(width, height)?;
        Ok(Self { width, height, cells: vec![0; width * height], score: 0 })
    }

    /// Build a grid from rows of tile values.
    ///
    /// ```
    /// use tiles_2048::engine::{Direction, GridState};
    /// let g = GridState::from_rows(vec![vec![2, 2], vec![0, 0]], 0).unwrap();
    /// let out = g.shift(Direction::Left);
    /// assert_eq!(out.state.to_rows(), vec![vec![4, 0], vec![0, 0]]);
    /// assert_eq!(out.score_delta, 4);
    /// ```
    pub fn from_rows(rows: Vec<Vec<Tile>>, score: Score) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        check_dimensions(width, height)?;
        let mut cells = Vec::with_capacity(width * height);
        for (row, line) in rows.into_iter().enumerate() {
            if line.len() != width {
                return Err(GridError::Ragged { row, len: line.len(), expected: width });
            }
            cells.extend(line);
        }
        Ok(Self { width, height, cells, score })
    }

    /// Copy of this grid with one cell overwritten.
    pub fn with_tile(&self, row: usize, col: usize, value: Tile) -> Result<Self, GridError> {
        if row >= self.height || col >= self.width {
            return Err(GridError::OutOfBounds { row, col });
        }
        let mut next = self.clone();
        next.cells[row * self.width + col] = value;
        Ok(next)
    }

    #[inline]
    pub fn width(&self) -> usize { self.width }

    #[inline]
    pub fn height(&self) -> usize { self.height }

    #[inline]
    pub fn score(&self) -> Score { self.score }

    /// Value at `(row, col)`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        if row < self.height && col < self.width { Some(self.cells[row * self.width + col]) } else { None }
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> + '_ { self.cells.chunks(self.width) }

    pub fn to_rows(&self) -> Vec<Vec<Tile>> { self.rows().map(<[Tile]>::to_vec).collect() }

    pub fn count_empty(&self) -> usize { self.cells.iter().filter(|&&v| v == 0).count() }

    pub fn count_non_empty(&self) -> usize { self.cells.len() - self.count_empty() }

    /// Coordinates of every empty cell, row-major.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| (i / self.width, i % self.width))
            .collect()
    }

    /// Highest tile value on the grid (0 when empty).
    pub fn highest_tile(&self) -> Tile { self.cells.iter().copied().max().unwrap_or(0) }

    /// Slide and merge every line toward `direction`.
    ///
    /// Each line is compacted, then equal neighbours are merged starting at
    /// the leading edge (a merged tile cannot merge again in the same move),
    /// then compacted again.
    pub fn shift(&self, direction: Direction) -> MoveOutcome {
        let mut cells = self.cells.clone();
        let mut score_delta: Score = 0;
        let mut merges = 0;

        let (lines, len) = match direction {
            Direction::Left | Direction::Right => (self.height, self.width),
            Direction::Up | Direction::Down => (self.width, self.height),
        };
        let mut indices = Vec::with_capacity(len);
        let mut line = Vec::with_capacity(len);
        for k in 0..lines {
            indices.clear();
            self.line_indices(direction, k, &mut indices);
            line.clear();
            line.extend(indices.iter().map(|&i| self.cells[i]));
            let (gained, merged) = slide_line(&mut line);
            score_delta = score_delta.saturating_add(gained);
            merges += merged;
            for (&i, &v) in indices.iter().zip(line.iter()) {
                cells[i] = v;
            }
        }

        let changes: Vec<CellChange> = self
            .cells
            .iter()
            .zip(cells.iter())
            .enumerate()
            .filter(|(_, (before, after))| before != after)
            .map(|(i, (&from, &to))| CellChange { row: i / self.width, col: i % self.width, from, to })
            .collect();

        MoveOutcome {
            state: GridState { width: self.width, height: self.height, cells, score: self.score.saturating_add(score_delta) },
            moved: !changes.is_empty(),
            score_delta,
            merges,
            changes,
        }
    }

    /// Like [`Self::shift`], but a move that changes nothing is an error.
    pub fn try_shift(&self, direction: Direction) -> Result<MoveOutcome, MoveError> {
        let outcome = self.shift(direction);
        if outcome.moved { Ok(outcome) } else { Err(MoveError::CannotMoveInThatDirection) }
    }

    /// True if sliding toward `direction` would change at least one cell.
    pub fn can_shift(&self, direction: Direction) -> bool { self.shift(direction).moved }

    /// True if any of the four directions is a legal move.
    ///
    /// ```
    /// use tiles_2048::engine::GridState;
    /// let stuck = GridState::from_rows(vec![vec![2, 4], vec![4, 2]], 0).unwrap();
    /// assert!(!stuck.has_any_legal_move());
    /// ```
    pub fn has_any_legal_move(&self) -> bool { Direction::ALL.iter().any(|&d| self.can_shift(d)) }

    /// Place one value from `spawnables` into a random empty cell.
    ///
    /// The cell and the value are each drawn uniformly by index, so repeated
    /// entries in `spawnables` weight the draw. A full grid is returned
    /// unchanged with `placed == None`.
    ///
    /// ```
    /// use tiles_2048::engine::GridState;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let out = GridState::empty(4, 4).unwrap().with_random_tile(&[2, 4], &mut rng);
    /// assert_eq!(out.state.count_empty(), 15);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(&self, spawnables: &[Tile], rng: &mut R) -> SpawnOutcome {
        let empty = self.empty_cells();
        if empty.is_empty() || spawnables.is_empty() {
            return SpawnOutcome { state: self.clone(), placed: None };
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        let value = spawnables[rng.gen_range(0..spawnables.len())];
        let mut state = self.clone();
        state.cells[row * self.width + col] = value;
        SpawnOutcome { state, placed: Some(Placement { row, col, value }) }
    }

    /// Flat indices of line `k`, leading edge first.
    fn line_indices(&self, direction: Direction, k: usize, out: &mut Vec<usize>) {
        let w = self.width;
        match direction {
            Direction::Left => out.extend((0..w).map(move |c| k * w + c)),
            Direction::Right => out.extend((0..w).rev().map(move |c| k * w + c)),
            Direction::Up => out.extend((0..self.height).map(move |r| r * w + k)),
            Direction::Down => out.extend((0..self.height).rev().map(move |r| r * w + k)),
        }
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<(), GridError> {
    if width < 2 || height < 2 {
        return Err(GridError::TooSmall { width, height });
    }
    width.checked_mul(height).ok_or(GridError::TooLarge { width, height })?;
    Ok(())
}

/// Slide a line toward index 0. Returns points earned and merge count.
fn slide_line(line: &mut [Tile]) -> (Score, usize) {
    compact(line);
    let mut gained: Score = 0;
    let mut merges = 0;
    let mut i = 0;
    while i + 1 < line.len() {
        // a pair whose sum does not fit a tile stays put
        let merged = if line[i] != 0 && line[i] == line[i + 1] { line[i].checked_add(line[i + 1]) } else { None };
        if let Some(value) = merged {
            line[i] = value;
            line[i + 1] = 0;
            gained = gained.saturating_add(value);
            merges += 1;
            // the merged tile is consumed for this move
            i += 2;
        } else {
            i += 1;
        }
    }
    compact(line);
    (gained, merges)
}

/// Move every non-zero value to the front, preserving order.
fn compact(line: &mut [Tile]) {
    let mut write = 0;
    for read in 0..line.len() {
        if line[read] != 0 {
            if write != read {
                line[write] = line[read];
                line[read] = 0;
            }
            write += 1;
        }
    }
}

impl fmt::Debug for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridState")
            .field("size", &format_args!("{}x{}", self.width, self.height))
            .field("score", &self.score)
            .field("rows", &self.to_rows())
            .finish()
    }
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell_w = self.highest_tile().to_string().len().max(4) + 2;
        let rule = format!("+{}", format!("{}+", "-".repeat(cell_w)).repeat(self.width));
        writeln!(f, "Score: {}", self.score)?;
        writeln!(f, "{rule}")?;
        for row in self.rows() {
            write!(f, "|")?;
            for &v in row {
                if v == 0 {
                    write!(f, "{:cell_w$}|", "")?;
                } else {
                    write!(f, "{:^cell_w$}|", v)?;
                }
            }
            writeln!(f)?;
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}
