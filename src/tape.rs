//! Tape memory: a growable row of fixed-width cells.
//!
//! The cell width is a type parameter. [`Tape<u8>`], [`Tape<u16>`],
//! [`Tape<u32>`] and [`Tape<u64>`] share one implementation, and the width is
//! chosen once when a tape is constructed, never per operation.

use std::fmt;
use std::str::FromStr;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// An unsigned cell type usable on a [`Tape`].
///
/// Arithmetic wraps silently: incrementing `MAX` gives zero and decrementing
/// zero gives `MAX`.
pub trait Cell: Copy + Eq + Default + fmt::Debug + fmt::Display + Send + Sync + 'static + sealed::Sealed {
    const WIDTH: CellWidth;
    const ZERO: Self;
    const MAX: Self;

    fn inc(self) -> Self;
    fn dec(self) -> Self;

    /// Reduce an arbitrary value modulo 2^width.
    fn truncate(value: u64) -> Self;

    fn widen(self) -> u64;

    #[inline]
    fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

macro_rules! impl_cell {
    ($ty:ty, $width:expr) => {
        impl Cell for $ty {
            const WIDTH: CellWidth = $width;
            const ZERO: Self = 0;
            const MAX: Self = <$ty>::MAX;

            #[inline]
            fn inc(self) -> Self {
                self.wrapping_add(1)
            }

            #[inline]
            fn dec(self) -> Self {
                self.wrapping_sub(1)
            }

            #[inline]
            fn truncate(value: u64) -> Self {
                value as $ty
            }

            #[inline]
            fn widen(self) -> u64 {
                self as u64
            }
        }
    };
}

impl_cell!(u8, CellWidth::W8);
impl_cell!(u16, CellWidth::W16);
impl_cell!(u32, CellWidth::W32);
impl_cell!(u64, CellWidth::W64);

/// Bit width of every cell on the tape for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellWidth {
    #[default]
    W8,
    W16,
    W32,
    W64,
}

impl CellWidth {
    pub const ALL: [CellWidth; 4] = [CellWidth::W8, CellWidth::W16, CellWidth::W32, CellWidth::W64];

    pub fn bits(self) -> u32 {
        match self {
            CellWidth::W8 => 8,
            CellWidth::W16 => 16,
            CellWidth::W32 => 32,
            CellWidth::W64 => 64,
        }
    }

    /// Largest value a cell of this width can hold (2^bits - 1).
    pub fn max_value(self) -> u64 {
        match self {
            CellWidth::W8 => u8::MAX as u64,
            CellWidth::W16 => u16::MAX as u64,
            CellWidth::W32 => u32::MAX as u64,
            CellWidth::W64 => u64::MAX,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(CellWidth::W8),
            16 => Some(CellWidth::W16),
            32 => Some(CellWidth::W32),
            64 => Some(CellWidth::W64),
            _ => None,
        }
    }
}

impl fmt::Display for CellWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Returned when parsing a width other than 8, 16, 32 or 64.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell width '{0}' (expected 8, 16, 32 or 64)")]
pub struct ParseWidthError(pub String);

impl FromStr for CellWidth {
    type Err = ParseWidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('u').unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .ok()
            .and_then(CellWidth::from_bits)
            .ok_or_else(|| ParseWidthError(s.to_string()))
    }
}

/// Failures raised by tape operations. The engine attaches positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TapeError {
    #[error("pointer moved left of cell 0")]
    Underflow,

    #[error("tape cannot grow to {requested} cells")]
    OutOfMemory { requested: usize },
}

/// A tape that is logically infinite to the right.
///
/// Cells that were never written read as zero. Moving the pointer does not
/// allocate; the first write at an address past the materialized extent grows
/// the backing vector up to and including that address (amortized doubling,
/// via `Vec`). The tape never shrinks.
#[derive(Debug, Clone)]
pub struct Tape<C: Cell> {
    cells: Vec<C>,
    pointer: usize,
    max_cells: Option<usize>,
}

impl<C: Cell> Default for Tape<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cell> Tape<C> {
    /// An empty tape with the pointer at cell 0 and no size limit.
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            pointer: 0,
            max_cells: None,
        }
    }

    /// An empty tape that refuses to materialize more than `max_cells` cells.
    pub fn with_limit(max_cells: Option<usize>) -> Self {
        Self {
            cells: Vec::new(),
            pointer: 0,
            max_cells,
        }
    }

    pub fn width(&self) -> CellWidth {
        C::WIDTH
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Number of materialized cells.
    pub fn extent(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    /// Value at `addr`; unvisited addresses are zero.
    #[inline]
    pub fn get(&self, addr: usize) -> C {
        self.cells.get(addr).copied().unwrap_or(C::ZERO)
    }

    /// Store `value` at `addr`, growing the tape if needed.
    pub fn set(&mut self, addr: usize, value: C) -> Result<(), TapeError> {
        if addr >= self.cells.len() {
            // Writing zero past the extent changes nothing observable.
            if value.is_zero() {
                return Ok(());
            }
            self.grow_to(addr)?;
        }
        self.cells[addr] = value;
        Ok(())
    }

    #[inline]
    pub fn current(&self) -> C {
        self.get(self.pointer)
    }

    #[inline]
    pub fn set_current(&mut self, value: C) -> Result<(), TapeError> {
        self.set(self.pointer, value)
    }

    #[inline]
    pub fn increment(&mut self) -> Result<(), TapeError> {
        self.set_current(self.current().inc())
    }

    #[inline]
    pub fn decrement(&mut self) -> Result<(), TapeError> {
        self.set_current(self.current().dec())
    }

    /// Move the pointer by one cell. `-1` from cell 0 is [`TapeError::Underflow`].
    pub fn shift(&mut self, delta: isize) -> Result<(), TapeError> {
        if delta < 0 {
            self.pointer = self
                .pointer
                .checked_sub(delta.unsigned_abs())
                .ok_or(TapeError::Underflow)?;
        } else {
            self.pointer = self
                .pointer
                .checked_add(delta as usize)
                .ok_or(TapeError::OutOfMemory { requested: usize::MAX })?;
        }
        Ok(())
    }

    #[inline]
    pub fn move_right(&mut self) -> Result<(), TapeError> {
        self.shift(1)
    }

    #[inline]
    pub fn move_left(&mut self) -> Result<(), TapeError> {
        self.shift(-1)
    }

    fn grow_to(&mut self, addr: usize) -> Result<(), TapeError> {
        let requested = addr.checked_add(1).ok_or(TapeError::OutOfMemory { requested: usize::MAX })?;
        if let Some(limit) = self.max_cells {
            if requested > limit {
                return Err(TapeError::OutOfMemory { requested });
            }
        }
        let additional = requested - self.cells.len();
        self.cells
            .try_reserve(additional)
            .map_err(|_| TapeError::OutOfMemory { requested })?;
        self.cells.resize(requested, C::ZERO);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvisited_cells_read_zero_without_growing() {
        let mut tape: Tape<u8> = Tape::new();
        for _ in 0..1000 {
            tape.move_right().unwrap();
        }
        assert_eq!(tape.current(), 0);
        assert_eq!(tape.extent(), 0);
    }

    #[test]
    fn writing_far_right_materializes_up_to_address() {
        let mut tape: Tape<u16> = Tape::new();
        tape.set(9, 7).unwrap();
        assert_eq!(tape.extent(), 10);
        assert_eq!(tape.get(9), 7);
        assert!(tape.cells()[..9].iter().all(|&c| c == 0));
    }

    #[test]
    fn wraparound_at_every_width() {
        fn check<C: Cell>() {
            let mut tape: Tape<C> = Tape::new();
            tape.decrement().unwrap();
            assert_eq!(tape.current(), C::MAX);
            assert_eq!(tape.current().widen(), C::WIDTH.max_value());
            tape.increment().unwrap();
            assert_eq!(tape.current(), C::ZERO);
        }
        check::<u8>();
        check::<u16>();
        check::<u32>();
        check::<u64>();
    }

    #[test]
    fn eight_bit_cell_wraps_after_256_increments() {
        let mut tape: Tape<u8> = Tape::new();
        for _ in 0..256 {
            tape.increment().unwrap();
        }
        assert_eq!(tape.current(), 0);
    }

    #[test]
    fn truncate_reduces_modulo_width() {
        assert_eq!(<u8 as Cell>::truncate(0x1_41), 0x41);
        assert_eq!(<u16 as Cell>::truncate(0x1_0000), 0);
        assert_eq!(<u64 as Cell>::truncate(u64::MAX), u64::MAX);
    }

    #[test]
    fn moving_left_of_zero_underflows() {
        let mut tape: Tape<u8> = Tape::new();
        assert_eq!(tape.move_left(), Err(TapeError::Underflow));
        assert_eq!(tape.pointer(), 0);
    }

    #[test]
    fn limit_turns_growth_into_out_of_memory() {
        let mut tape: Tape<u8> = Tape::with_limit(Some(4));
        tape.set(3, 1).unwrap();
        assert_eq!(tape.set(4, 1), Err(TapeError::OutOfMemory { requested: 5 }));
        // Zero writes past the extent never allocate, so they cannot fail.
        assert_eq!(tape.set(100, 0), Ok(()));
    }

    #[test]
    fn width_parsing() {
        assert_eq!("8".parse::<CellWidth>(), Ok(CellWidth::W8));
        assert_eq!("u32".parse::<CellWidth>(), Ok(CellWidth::W32));
        assert_eq!(" 64 ".parse::<CellWidth>(), Ok(CellWidth::W64));
        assert!("12".parse::<CellWidth>().is_err());
        assert!("wide".parse::<CellWidth>().is_err());
        assert_eq!(CellWidth::W16.to_string(), "16");
    }
}
