//! Age-threshold sampling table.
//!
//! A [`TimeBlockTable`] holds the configured `(age threshold, divisor)`
//! pairs, sorted ascending by threshold. A record's cumulative divisor is
//! the product of every block whose threshold its age has crossed; a record
//! survives thinning when its id divides evenly by that product. Because the
//! product only ever grows with age, retention is monotone: a file kept at a
//! coarse tier is never re-thinned by a finer one.

use crate::error::{ErrorKind, Result};

/// One configured sampling rule: from `end` seconds of age onward, keep
/// every `division`-th file (compounding with all earlier blocks).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeBlock {
    /// Age threshold in seconds. Zero means "from the moment of archival",
    /// making the block a permanent baseline multiplier.
    pub end: u64,
    /// Sampling divisor, at least 1.
    pub division: u64,
}

/// The ordered set of [`TimeBlock`]s.
///
/// # Examples
///
/// ```
/// use mothball_archive::blocks::{TimeBlock, TimeBlockTable};
///
/// let table = TimeBlockTable::new([
///     TimeBlock { end: 3600, division: 2 },
///     TimeBlock { end: 86_400, division: 3 },
/// ]).unwrap();
/// assert_eq!(table.total_division(60), 1);
/// assert_eq!(table.total_division(7200), 2);
/// assert_eq!(table.total_division(100_000), 6);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeBlockTable {
    blocks: Vec<TimeBlock>,
}

impl TimeBlockTable {
    /// Build the table, sorting by threshold. Duplicate thresholds and zero
    /// divisions are configuration errors and are rejected outright rather
    /// than letting one entry silently shadow another.
    pub fn new(blocks: impl IntoIterator<Item = TimeBlock>) -> Result<Self> {
        let mut blocks: Vec<TimeBlock> = blocks.into_iter().collect();
        blocks.sort_by_key(|block| block.end);
        for pair in blocks.windows(2) {
            if pair[0].end == pair[1].end {
                exn::bail!(ErrorKind::DuplicateThreshold(pair[0].end));
            }
        }
        if let Some(block) = blocks.iter().find(|block| block.division == 0) {
            exn::bail!(ErrorKind::ZeroDivision(block.end));
        }
        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Cumulative divisor for a record of the given age: the product of
    /// every crossed block's division, starting from 1. Non-decreasing in
    /// `age`.
    pub fn total_division(&self, age: u64) -> u64 {
        self.blocks
            .iter()
            .take_while(|block| block.end <= age)
            // Saturating: an absurd configuration can overflow 64 bits, and
            // "keep almost nothing" is the faithful reading of it.
            .fold(1, |total, block| total.saturating_mul(block.division))
    }

    /// Whether the thinning rules keep a record of this id at this age.
    pub fn retains(&self, id: u64, age: u64) -> bool {
        id % self.total_division(age) == 0
    }
}
