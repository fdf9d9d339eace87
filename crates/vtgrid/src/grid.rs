//! The display matrix and its scrollback ring.
//!
//! [`Grid`] owns the visible screen lines plus a fixed-capacity ring of
//! history lines. All primitives keep two invariants intact: a wide pair
//! never survives with only one half, and cleared margins are filled with
//! the caller's back-color-erase color.

use crate::cell::{Cell, Color};
use crate::line::{ChannelSet, Line};

/// The character-cell matrix of one window.
#[derive(Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    lines: Vec<Line>,
    hist: Vec<Line>,
    hist_idx: usize,
}

impl Grid {
    /// A blank grid of `width`×`height` cells with `histlen` lines of
    /// scrollback capacity.
    #[must_use]
    pub fn new(width: usize, height: usize, histlen: usize) -> Self {
        Grid {
            width,
            height,
            lines: (0..height).map(|_| Line::blank(width)).collect(),
            hist: (0..histlen).map(|_| Line::blank(width)).collect(),
            hist_idx: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn histlen(&self) -> usize {
        self.hist.len()
    }

    /// The ring write index; the oldest history line sits here.
    #[inline]
    #[must_use]
    pub fn hist_idx(&self) -> usize {
        self.hist_idx
    }

    #[inline]
    #[must_use]
    pub fn line(&self, y: usize) -> &Line {
        &self.lines[y]
    }

    #[inline]
    pub fn line_mut(&mut self, y: usize) -> &mut Line {
        &mut self.lines[y]
    }

    #[inline]
    #[must_use]
    pub fn hist_line(&self, i: usize) -> &Line {
        &self.hist[i]
    }

    /// Read the cell at `(x, y)`.
    #[inline]
    #[must_use]
    pub fn cell_at(&self, x: usize, y: usize) -> Cell {
        self.lines[y].cell_at(x)
    }

    /// Allocate the channels of row `y` needed by `c`.
    pub fn fix_line(&mut self, y: usize, c: &mut Cell) -> ChannelSet {
        self.lines[y].fix(c)
    }

    /// Write `c` at `(x, y)`, killing any wide pair it lands on.
    ///
    /// A wide `c` also writes its right-half marker at `x + 1`. Returns
    /// the channels that failed to allocate.
    pub fn put_char(&mut self, c: &mut Cell, x: usize, y: usize) -> ChannelSet {
        let failed = self.lines[y].fix(c);
        let ml = &mut self.lines[y];
        ml.kill_wide_right(x);
        ml.kill_wide_left(x);
        ml.set_cell(x, c);
        if c.is_wide() {
            ml.kill_wide_left(x + 1);
            ml.set_wide_right(x + 1, c);
        }
        failed
    }

    /// Insert `c` at `(x, y)`, shifting the tail of the row right.
    pub fn ins_char(&mut self, c: &mut Cell, x: usize, y: usize) -> ChannelSet {
        let failed = self.lines[y].fix(c);
        let width = self.width;
        let ml = &mut self.lines[y];
        ml.kill_wide_right(x);
        let mut n = width - x - 1;
        if n > 0 {
            ml.kill_wide_right(width - 1);
            ml.copy_cells(x + 1, x, n);
        }
        ml.set_cell(x, c);
        if c.is_wide() {
            if n > 1 {
                n -= 1;
                ml.kill_wide_right(width - 1);
                ml.copy_cells(x + 2, x + 1, n);
            }
            ml.set_wide_right(x + 1, c);
        }
        failed
    }

    /// Shift cells of row `y` within `[xs, xe]` by `n` columns.
    ///
    /// Positive `n` deletes at `xs` (tail moves left); negative `n`
    /// inserts blanks at `xs` (tail moves right). The vacated margin is
    /// cleared and back-color-filled with `bce`.
    pub fn scroll_h(
        &mut self,
        n: isize,
        y: usize,
        xs: usize,
        xe: usize,
        bce: Color,
    ) -> ChannelSet {
        if n == 0 || xe < xs {
            return ChannelSet::empty();
        }
        let ml = &mut self.lines[y];
        ml.kill_wide_right(xs);
        ml.kill_wide_left(xe);
        let span = xe - xs + 1;
        let mut failed = ChannelSet::empty();
        if n > 0 {
            let mut n = usize::try_from(n).unwrap_or(usize::MAX);
            if span > n {
                ml.kill_wide_right(xs + n);
                ml.copy_cells(xs, xs + n, span - n);
            } else {
                n = span;
            }
            ml.clear_cells(xe + 1 - n, n);
            if !bce.is_default() {
                failed = ml.bce_fill(xe + 1 - n, xe, bce);
            }
        } else {
            let mut n = usize::try_from(-n).unwrap_or(usize::MAX);
            if span > n {
                ml.kill_wide_left(xe - n);
                ml.copy_cells(xs + n, xs, span - n);
            } else {
                n = span;
            }
            ml.clear_cells(xs, n);
            if !bce.is_default() {
                failed = ml.bce_fill(xs, xs + n - 1, bce);
            }
        }
        failed
    }

    /// Rotate the lines of `[ys, ye]` by `n`.
    ///
    /// Positive `n` scrolls the region up; when `push_hist` is set the
    /// vacated top lines go to the scrollback ring first. With `compact`
    /// set, trailing blank lines are trimmed from the scroll-off region
    /// before anything is appended to history; if the trim leaves
    /// nothing to scroll the call is a no-op.
    pub fn scroll_v(
        &mut self,
        n: isize,
        ys: usize,
        ye: usize,
        bce: Color,
        push_hist: bool,
        compact: bool,
    ) -> ChannelSet {
        if n == 0 || ye < ys || ye >= self.height {
            return ChannelSet::empty();
        }
        let mut failed = ChannelSet::empty();
        if n > 0 {
            let mut ye = ye;
            let mut n = usize::try_from(n).unwrap_or(usize::MAX).min(ye - ys + 1);
            if compact {
                match self.find_used_line(ye, ys) {
                    Some(used) => ye = used,
                    None => return ChannelSet::empty(),
                }
                n = n.min(ye - ys + 1);
                if n == 0 {
                    return ChannelSet::empty();
                }
            }
            for i in ys..ys + n {
                if push_hist {
                    self.add_line_to_hist(i);
                } else {
                    self.reset_line(i);
                }
                if !bce.is_default() {
                    failed |= self.lines[i].bce_fill(0, self.width, bce);
                }
            }
            if ye + 1 - ys > n {
                self.lines[ys..=ye].rotate_left(n);
            }
        } else {
            let n = usize::try_from(-n).unwrap_or(usize::MAX).min(ye - ys + 1);
            for i in ye + 1 - n..=ye {
                self.reset_line(i);
                if !bce.is_default() {
                    failed |= self.lines[i].bce_fill(0, self.width, bce);
                }
            }
            if ye + 1 - ys > n {
                self.lines[ys..=ye].rotate_right(n);
            }
        }
        failed
    }

    /// Clear the rectangle-ish region from `(xs, ys)` to `(xe, ye)`,
    /// where intermediate rows clear full width.
    pub fn clear_area(
        &mut self,
        xs: usize,
        ys: usize,
        xe: usize,
        ye: usize,
        bce: Color,
    ) -> ChannelSet {
        if ye < ys || self.width == 0 {
            return ChannelSet::empty();
        }
        let xs = xs.min(self.width - 1);
        let xe = xe.min(self.width - 1);
        self.lines[ys].kill_wide_right(xs);
        self.lines[ye].kill_wide_left(xe);
        let mut failed = ChannelSet::empty();
        let mut xs = xs;
        for y in ys..=ye {
            let xxe = if y == ye { xe } else { self.width - 1 };
            if xxe + 1 > xs {
                let n = xxe - xs + 1;
                self.lines[y].clear_cells(xs, n);
                if !bce.is_default() {
                    failed |= self.lines[y].bce_fill(xs, xxe, bce);
                }
            }
            xs = 0;
        }
        failed
    }

    /// Terminate the deferred-wrap column of row `y` and write `c` into
    /// column 0 of the next row, scrolling the region when `y == bot`.
    ///
    /// Returns the row the character landed on.
    pub fn wrap_char(
        &mut self,
        c: &mut Cell,
        y: usize,
        top: usize,
        bot: usize,
        ins: bool,
        push_hist: bool,
        compact: bool,
    ) -> (usize, ChannelSet) {
        let bce = c.bg;
        let mut failed = self.lines[y].fix(c);
        let width = self.width;
        self.lines[y].set_cell(width, &Cell::NULL);
        let y = if y == bot {
            failed |= self.scroll_v(1, top, bot, bce, push_hist, compact);
            y
        } else if y < self.height - 1 {
            y + 1
        } else {
            y
        };
        failed |= if ins {
            self.ins_char(c, 0, y)
        } else {
            self.put_char(c, 0, y)
        };
        (y, failed)
    }

    /// Move row `y` into the scrollback ring and leave a blank in its
    /// place. Payloads are swapped with the ring slot, never copied.
    pub fn add_line_to_hist(&mut self, y: usize) {
        if self.hist.is_empty() {
            self.reset_line(y);
            return;
        }
        let idx = self.hist_idx;
        std::mem::swap(&mut self.lines[y], &mut self.hist[idx]);
        self.reset_line(y);
        self.hist_idx = (self.hist_idx + 1) % self.hist.len();
    }

    /// Bottom-up scan of `[ys, ye]` for the last row that is not a
    /// default blank.
    #[must_use]
    pub fn find_used_line(&self, ye: usize, ys: usize) -> Option<usize> {
        (ys..=ye).rev().find(|&y| !self.lines[y].is_blank())
    }

    /// Swap the visible screen and its scrollback with another buffer
    /// (the alternate screen).
    pub fn swap_screen(
        &mut self,
        lines: &mut Vec<Line>,
        hist: &mut Vec<Line>,
        hist_idx: &mut usize,
    ) {
        std::mem::swap(&mut self.lines, lines);
        std::mem::swap(&mut self.hist, hist);
        std::mem::swap(&mut self.hist_idx, hist_idx);
    }

    /// Detach a blank same-size buffer suitable for the alternate
    /// screen (no scrollback).
    #[must_use]
    pub fn blank_screen(&self) -> Vec<Line> {
        (0..self.height).map(|_| Line::blank(self.width)).collect()
    }

    /// Change the grid dimensions, preserving what fits. Extra rows
    /// appear blank at the bottom; removed rows are dropped from the
    /// bottom. History lines are re-cut to the new width in place.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width {
            for ml in &mut self.lines {
                ml.resize(width);
            }
            for ml in &mut self.hist {
                ml.resize(width);
            }
        }
        if height > self.height {
            self.lines.extend((self.height..height).map(|_| Line::blank(width)));
        } else {
            self.lines.truncate(height);
        }
        self.width = width;
        self.height = height;
    }

    fn reset_line(&mut self, y: usize) {
        if self.lines[y].width() == self.width {
            self.lines[y].clear_all();
        } else {
            self.lines[y] = Line::blank(self.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cell::WIDE_TRAIL_UTF8;

    fn ch(c: char) -> Cell {
        Cell {
            image: c as u32,
            ..Cell::BLANK
        }
    }

    fn row_text(grid: &Grid, y: usize) -> String {
        (0..grid.width())
            .map(|x| char::from_u32(grid.cell_at(x, y).image).unwrap_or('?'))
            .collect()
    }

    #[test]
    fn test_put_kills_overlapped_pair() {
        let mut grid = Grid::new(10, 3, 0);
        let mut wide = Cell {
            image: 0x4e16,
            trail: WIDE_TRAIL_UTF8,
            ..Cell::BLANK
        };
        grid.put_char(&mut wide, 4, 0);
        assert!(grid.line(0).is_wide_left(4));
        // A single-cell write on the right half blanks both halves.
        grid.put_char(&mut ch('x'), 5, 0);
        assert_eq!(grid.cell_at(4, 0).image, u32::from(b' '));
        assert_eq!(grid.cell_at(5, 0).image, u32::from(b'x'));
    }

    #[test]
    fn test_ins_char_shifts_and_drops_tail() {
        let mut grid = Grid::new(5, 1, 0);
        for (x, c) in "abcde".chars().enumerate() {
            grid.put_char(&mut ch(c), x, 0);
        }
        grid.ins_char(&mut ch('X'), 1, 0);
        assert_eq!(row_text(&grid, 0), "aXbcd");
    }

    #[test]
    fn test_scroll_h_delete_with_bce() {
        let mut grid = Grid::new(8, 1, 0);
        for (x, c) in "abcdefgh".chars().enumerate() {
            grid.put_char(&mut ch(c), x, 0);
        }
        grid.scroll_h(3, 0, 2, 7, Color::indexed(4));
        assert_eq!(row_text(&grid, 0), "abfgh   ");
        assert_eq!(grid.cell_at(5, 0).bg, Color::indexed(4));
        assert_eq!(grid.cell_at(5, 0).attr, crate::cell::Attr::empty());
        assert_eq!(grid.cell_at(4, 0).bg, Color::DEFAULT);
    }

    #[test]
    fn test_scroll_v_pushes_history() {
        let mut grid = Grid::new(4, 3, 2);
        grid.put_char(&mut ch('1'), 0, 0);
        grid.put_char(&mut ch('2'), 0, 1);
        grid.put_char(&mut ch('3'), 0, 2);
        grid.scroll_v(1, 0, 2, Color::DEFAULT, true, false);
        assert_eq!(row_text(&grid, 0), "2   ");
        assert_eq!(row_text(&grid, 1), "3   ");
        assert_eq!(row_text(&grid, 2), "    ");
        assert_eq!(grid.hist_idx(), 1);
        assert_eq!(grid.hist_line(0).cell_at(0).image, u32::from(b'1'));
    }

    #[test]
    fn test_scroll_v_overlarge_clears_region() {
        let mut grid = Grid::new(4, 4, 0);
        for y in 0..4 {
            grid.put_char(&mut ch('x'), 0, y);
        }
        grid.scroll_v(10, 1, 2, Color::DEFAULT, false, false);
        assert_eq!(row_text(&grid, 0), "x   ");
        assert_eq!(row_text(&grid, 1), "    ");
        assert_eq!(row_text(&grid, 2), "    ");
        assert_eq!(row_text(&grid, 3), "x   ");
    }

    #[test]
    fn test_scroll_v_down_inserts_blanks_at_top() {
        let mut grid = Grid::new(4, 3, 0);
        grid.put_char(&mut ch('a'), 0, 0);
        grid.put_char(&mut ch('b'), 0, 1);
        grid.scroll_v(-1, 0, 2, Color::DEFAULT, false, false);
        assert_eq!(row_text(&grid, 0), "    ");
        assert_eq!(row_text(&grid, 1), "a   ");
        assert_eq!(row_text(&grid, 2), "b   ");
    }

    #[test]
    fn test_compact_hist_skips_blank_tail() {
        let mut grid = Grid::new(4, 4, 4);
        grid.put_char(&mut ch('a'), 0, 0);
        // Rows 1..3 blank; scrolling 3 with compaction only pushes the
        // used row.
        grid.scroll_v(3, 0, 3, Color::DEFAULT, true, true);
        assert_eq!(grid.hist_idx(), 1);
        assert_eq!(grid.hist_line(0).cell_at(0).image, u32::from(b'a'));
        assert_eq!(row_text(&grid, 0), "    ");
    }

    #[test]
    fn test_compact_hist_all_blank_is_noop() {
        let mut grid = Grid::new(4, 4, 4);
        grid.scroll_v(2, 0, 3, Color::DEFAULT, true, true);
        assert_eq!(grid.hist_idx(), 0);
    }

    #[test]
    fn test_clear_area_trims_pair_at_corner() {
        let mut grid = Grid::new(8, 2, 0);
        let mut wide = Cell {
            image: 0x4e16,
            trail: WIDE_TRAIL_UTF8,
            ..Cell::BLANK
        };
        grid.put_char(&mut wide, 3, 0);
        grid.clear_area(4, 0, 7, 0, Color::DEFAULT);
        // Clearing the right half also blanked the left half.
        assert_eq!(grid.cell_at(3, 0).image, u32::from(b' '));
    }

    #[test]
    fn test_wrap_char_scrolls_at_bottom() {
        let mut grid = Grid::new(4, 2, 1);
        grid.put_char(&mut ch('a'), 0, 0);
        let (y, _) = grid.wrap_char(&mut ch('b'), 1, 0, 1, false, true, false);
        assert_eq!(y, 1);
        assert_eq!(row_text(&grid, 1), "b   ");
        assert_eq!(grid.hist_line(0).cell_at(0).image, u32::from(b'a'));
    }

    #[test]
    fn test_history_ring_wraps() {
        let mut grid = Grid::new(4, 1, 2);
        for c in ['1', '2', '3'] {
            grid.put_char(&mut ch(c), 0, 0);
            grid.scroll_v(1, 0, 0, Color::DEFAULT, true, false);
        }
        // Slot 0 was overwritten by '3' after the ring wrapped.
        assert_eq!(grid.hist_idx(), 1);
        assert_eq!(grid.hist_line(0).cell_at(0).image, u32::from(b'3'));
        assert_eq!(grid.hist_line(1).cell_at(0).image, u32::from(b'2'));
    }
}
