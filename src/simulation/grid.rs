use rand::Rng;

/// Index into the active palette
pub type ColorIndex = u32;

/// Double-buffered toroidal grid of color indices.
///
/// `current` is what gets rendered; `next` is written by the update engine
/// and promoted with [`Grid::swap`]. Both are row-major and always the same size.
pub struct Grid {
    current: Vec<ColorIndex>,
    next: Vec<ColorIndex>,
    rows: usize,
    cols: usize,
}

impl Grid {
    /// Create a grid filled with color 0
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            current: vec![0; rows * cols],
            next: vec![0; rows * cols],
            rows,
            cols,
        }
    }

    /// Zero-size grid
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// Build a grid from explicit rows. All rows must have the same length.
    #[cfg(test)]
    pub fn from_rows(rows: &[&[ColorIndex]]) -> Self {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut grid = Self::new(rows.len(), cols);
        for (y, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), cols, "ragged grid rows");
            grid.current[y * cols..(y + 1) * cols].copy_from_slice(row);
        }
        grid
    }

    /// Reallocate both buffers, discarding prior contents
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let len = rows * cols;
        self.rows = rows;
        self.cols = cols;
        self.current = vec![0; len];
        self.next = vec![0; len];
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Current generation, row-major
    pub fn cells(&self) -> &[ColorIndex] {
        &self.current
    }

    /// Read-only view of the current generation
    pub fn view(&self) -> GridView<'_> {
        GridView {
            cells: &self.current,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Read the current generation with toroidal wrap on both axes
    #[inline]
    pub fn get(&self, y: isize, x: isize) -> ColorIndex {
        self.view().get(y, x)
    }

    /// Write the current generation with toroidal wrap on both axes
    pub fn set(&mut self, y: isize, x: isize, value: ColorIndex) {
        let offset = wrapped_offset(self.rows, self.cols, y, x);
        self.current[offset] = value;
    }

    /// Split borrow for the update engine: (current generation, next buffer)
    pub(crate) fn split_mut(&mut self) -> (GridView<'_>, &mut [ColorIndex]) {
        let view = GridView {
            cells: &self.current,
            rows: self.rows,
            cols: self.cols,
        };
        (view, &mut self.next)
    }

    /// Exchange current and next generations without copying
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Fill the current generation with uniform random indices in `[0, color_count)`
    pub fn randomize<R: Rng + ?Sized>(&mut self, color_count: usize, rng: &mut R) {
        let upper = color_count.max(1) as ColorIndex;
        for cell in &mut self.current {
            *cell = rng.gen_range(0..upper);
        }
    }
}

/// Borrowed current generation with wrap-aware and direct accessors
#[derive(Clone, Copy)]
pub struct GridView<'a> {
    cells: &'a [ColorIndex],
    rows: usize,
    cols: usize,
}

impl GridView<'_> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Toroidal read; any offset wraps to the opposite edge
    #[inline]
    pub fn get(&self, y: isize, x: isize) -> ColorIndex {
        self.cells[wrapped_offset(self.rows, self.cols, y, x)]
    }

    /// Direct read, caller guarantees `y < rows && x < cols`
    #[inline]
    pub fn at(&self, y: usize, x: usize) -> ColorIndex {
        self.cells[y * self.cols + x]
    }
}

#[inline]
fn wrapped_offset(rows: usize, cols: usize, y: isize, x: isize) -> usize {
    let y = y.rem_euclid(rows as isize) as usize;
    let x = x.rem_euclid(cols as isize) as usize;
    y * cols + x
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn numbered(rows: usize, cols: usize) -> Grid {
        let mut grid = Grid::new(rows, cols);
        for y in 0..rows as isize {
            for x in 0..cols as isize {
                grid.set(y, x, (y as u32) * 100 + x as u32);
            }
        }
        grid
    }

    #[test]
    fn test_wrap_rows() {
        let grid = numbered(4, 5);
        for x in 0..5 {
            assert_eq!(grid.get(-1, x), grid.get(3, x));
            assert_eq!(grid.get(4, x), grid.get(0, x));
        }
    }

    #[test]
    fn test_wrap_cols() {
        let grid = numbered(4, 5);
        for y in 0..4 {
            assert_eq!(grid.get(y, -1), grid.get(y, 4));
            assert_eq!(grid.get(y, 5), grid.get(y, 0));
        }
    }

    #[test]
    fn test_wrap_corner() {
        let grid = numbered(3, 3);
        assert_eq!(grid.get(-1, -1), grid.get(2, 2));
        assert_eq!(grid.get(3, 3), grid.get(0, 0));
    }

    #[test]
    fn test_set_wraps() {
        let mut grid = Grid::new(2, 2);
        grid.set(-1, 2, 7);
        assert_eq!(grid.get(1, 0), 7);
    }

    #[test]
    fn test_resize_discards_contents() {
        let mut grid = numbered(3, 3);
        grid.resize(2, 4);
        assert_eq!((grid.rows(), grid.cols()), (2, 4));
        assert_eq!(grid.len(), 8);
        assert!(grid.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_swap_exchanges_buffers() {
        let mut grid = Grid::new(1, 3);
        {
            let (_, next) = grid.split_mut();
            next.copy_from_slice(&[4, 5, 6]);
        }
        grid.swap();
        assert_eq!(grid.cells(), &[4, 5, 6]);
        grid.swap();
        assert_eq!(grid.cells(), &[0, 0, 0]);
    }

    #[test]
    fn test_randomize_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = Grid::new(20, 30);
        grid.randomize(5, &mut rng);
        assert!(grid.cells().iter().all(|&c| c < 5));
        assert!(grid.cells().iter().any(|&c| c != grid.cells()[0]));
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::empty();
        assert!(grid.is_empty());
        assert_eq!((grid.rows(), grid.cols()), (0, 0));
    }
}
