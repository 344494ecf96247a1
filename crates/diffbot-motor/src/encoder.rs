//! Quadrature encoder decoding.
//!
//! The decoder is written to be driven straight from edge interrupts: every
//! field is a single-word atomic and no operation blocks, so the sampling
//! and control contexts can read the count while edges keep arriving.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// One of the two encoder output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

/// Decodes two-channel quadrature edges into a signed pulse count.
///
/// Every edge moves the count by exactly one. The direction is taken from the
/// firing channel's new level and the last known level of the other channel:
///
/// | edge | other | Δ  |
/// |------|-------|----|
/// | A↑   | B=0   | +1 |
/// | A↑   | B=1   | −1 |
/// | A↓   | B=0   | −1 |
/// | A↓   | B=1   | +1 |
/// | B↑   | A=0   | −1 |
/// | B↑   | A=1   | +1 |
/// | B↓   | A=0   | +1 |
/// | B↓   | A=1   | −1 |
///
/// Simultaneous edges on both channels cannot be decoded and are not
/// detected. The count wraps on overflow.
#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    level_a: AtomicBool,
    level_b: AtomicBool,
    count: AtomicI32,
}

impl QuadratureDecoder {
    /// Creates a decoder with both channels low and a zero count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder seeded with the current pin levels.
    pub fn with_levels(level_a: bool, level_b: bool) -> Self {
        Self {
            level_a: AtomicBool::new(level_a),
            level_b: AtomicBool::new(level_b),
            count: AtomicI32::new(0),
        }
    }

    /// Handles one rising or falling edge on `channel`.
    ///
    /// Returns the applied delta (`+1` or `-1`).
    pub fn on_edge(&self, channel: Channel, level: bool) -> i32 {
        let delta = match channel {
            Channel::A => {
                self.level_a.store(level, Ordering::Relaxed);
                let other = self.level_b.load(Ordering::Relaxed);
                if level != other { 1 } else { -1 }
            }
            Channel::B => {
                self.level_b.store(level, Ordering::Relaxed);
                let other = self.level_a.load(Ordering::Relaxed);
                if level == other { 1 } else { -1 }
            }
        };
        self.count.fetch_add(delta, Ordering::Relaxed);
        delta
    }

    /// Current pulse count.
    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Last known `(A, B)` levels.
    pub fn levels(&self) -> (bool, bool) {
        (
            self.level_a.load(Ordering::Relaxed),
            self.level_b.load(Ordering::Relaxed),
        )
    }

    /// Zeroes the count. Stored channel levels are left untouched.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}
