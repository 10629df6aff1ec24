//! One generation of the cyclic cellular automaton.
//!
//! A cell holding color `c` advances to `(c + 1) mod n` when at least one of
//! its eight Moore neighbors already holds that color. Edges wrap.

use crate::simulation::grid::{ColorIndex, Grid, GridView};

/// Moore neighborhood offsets as (dy, dx)
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Result of a single tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// At least one cell differs between the current and next generation
    pub changed: bool,
    /// `rows * cols` minus the number of cells whose rule fired this tick
    pub activity: i64,
}

/// Compute the next generation into the grid's back buffer.
///
/// The caller decides whether to [`Grid::swap`]. The activity counter is
/// decremented on every rule match, even when `color_count == 1` makes the
/// successor equal to the current color.
pub fn step(grid: &mut Grid, color_count: usize) -> StepOutcome {
    let color_count = color_count.max(1) as ColorIndex;
    let (current, next) = grid.split_mut();
    let rows = current.rows();
    let cols = current.cols();

    let mut outcome = StepOutcome {
        changed: false,
        activity: (rows * cols) as i64,
    };
    if rows == 0 || cols == 0 {
        return outcome;
    }

    let mut apply = |y: usize, x: usize, cur: ColorIndex, matched: bool| {
        let value = if matched { successor(cur, color_count) } else { cur };
        if matched {
            outcome.activity -= 1;
        }
        if value != cur {
            outcome.changed = true;
        }
        next[y * cols + x] = value;
    };

    // Border: wrap-aware lookups
    let mut border = |y: usize, x: usize| {
        let cur = current.at(y, x);
        let matched = border_matches(&current, y, x, successor(cur, color_count));
        apply(y, x, cur, matched);
    };
    for y in 0..rows {
        if y == 0 || y == rows - 1 {
            for x in 0..cols {
                border(y, x);
            }
        } else {
            border(y, 0);
            if cols > 1 {
                border(y, cols - 1);
            }
        }
    }

    // Interior: every neighbor is in range, index directly
    for y in 1..rows.saturating_sub(1) {
        for x in 1..cols.saturating_sub(1) {
            let cur = current.at(y, x);
            let wanted = successor(cur, color_count);
            let matched = NEIGHBORS.iter().any(|&(dy, dx)| {
                current.at((y as isize + dy) as usize, (x as isize + dx) as usize) == wanted
            });
            apply(y, x, cur, matched);
        }
    }

    outcome
}

#[inline]
fn successor(color: ColorIndex, color_count: ColorIndex) -> ColorIndex {
    (color + 1) % color_count
}

fn border_matches(current: &GridView<'_>, y: usize, x: usize, wanted: ColorIndex) -> bool {
    let (y, x) = (y as isize, x as isize);
    NEIGHBORS
        .iter()
        .any(|&(dy, dx)| current.get(y + dy, x + dx) == wanted)
}
