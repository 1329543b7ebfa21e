//! arffdata - Row window
//!
//! A contiguous run of decoded data rows kept in memory by the parser.
//! Cells are stored row-major as `f64`: numbers as themselves, nominal and
//! string cells as catalogue indices, NaN for missing.

use std::ops::Range;

#[derive(Debug, Clone)]
pub struct RowWindow {
    /// Physical lines in the file up to and including `@DATA`.
    data_offset: usize,
    start: usize,
    end: usize,
    width: usize,
    capacity: usize,
    cells: Vec<f64>,
}

impl RowWindow {
    pub fn new(data_offset: usize, width: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data_offset,
            start: 0,
            end: 0,
            width,
            capacity,
            cells: Vec::with_capacity(capacity.saturating_mul(width).min(1 << 20)),
        }
    }

    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, row: usize) -> bool {
        self.start <= row && row < self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Empty the window so the next pushed row becomes `start`.
    pub fn reset(&mut self, start: usize) {
        self.start = start;
        self.end = start;
        self.cells.clear();
    }

    pub fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.width);
        self.cells.extend_from_slice(row);
        self.end += 1;
    }

    /// Cell of absolute row `row`, if the window holds it.
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        if !self.contains(row) || col >= self.width {
            return None;
        }
        self.cells.get((row - self.start) * self.width + col).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_lookup() {
        let mut window = RowWindow::new(4, 2, 2);
        assert!(window.is_empty());
        window.reset(10);
        window.push_row(&[1.0, 2.0]);
        window.push_row(&[3.0, f64::NAN]);

        assert!(window.is_full());
        assert_eq!(window.range(), 10..12);
        assert_eq!(window.cell(11, 0), Some(3.0));
        assert!(window.cell(11, 1).unwrap().is_nan());
        assert_eq!(window.cell(9, 0), None);
        assert_eq!(window.cell(12, 0), None);
        assert_eq!(window.cell(10, 2), None);
        assert_eq!(window.data_offset(), 4);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let window = RowWindow::new(0, 3, 0);
        assert_eq!(window.capacity(), 1);
    }
}
