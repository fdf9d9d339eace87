#![warn(clippy::pedantic)]

//! Character-cell display storage for terminal emulation.
//!
//! This crate owns the matrix of cells behind an emulated terminal
//! screen: renditions, lazily allocated per-line channels, wide-pair
//! bookkeeping, back-color-erase fills, and the scrollback ring.

pub mod cell;
pub mod grid;
pub mod line;

pub use crate::cell::{Attr, Cell, Color, WIDE_TRAIL_UTF8};
pub use crate::grid::Grid;
pub use crate::line::{ChannelSet, Line, WIDE_RIGHT};
