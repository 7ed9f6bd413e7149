//! Streaming inner merge-join of two ordered scored-value streams
//!
//! Both inputs must be strictly ascending by row key. The join holds at most
//! one pending value per side, so a 100k-row comparison costs the same
//! memory as a 10-row one. Order violations are reported as
//! [`SourceError::OutOfOrder`] rather than silently producing a wrong join.

use super::{PairedValue, RowKey, ScoredValue};
use crate::error::SourceError;
use std::cmp::Ordering;
use std::iter::Fuse;

type Item = Result<ScoredValue, SourceError>;

/// One side of the join with its order check
struct OrderedSide<I: Iterator<Item = Item>> {
    inner: Fuse<I>,
    last: Option<RowKey>,
}

impl<I: Iterator<Item = Item>> OrderedSide<I> {
    fn new(inner: I) -> Self {
        Self {
            inner: inner.fuse(),
            last: None,
        }
    }

    fn pull(&mut self) -> Option<Item> {
        let value = match self.inner.next()? {
            Ok(value) => value,
            Err(e) => return Some(Err(e)),
        };
        if let Some(previous) = self.last {
            if value.row_key <= previous {
                return Some(Err(SourceError::OutOfOrder {
                    previous: previous.0,
                    next: value.row_key.0,
                }));
            }
        }
        self.last = Some(value.row_key);
        Some(Ok(value))
    }
}

/// Iterator adapter yielding rows present in both streams
pub struct PairedJoin<A, B>
where
    A: Iterator<Item = Item>,
    B: Iterator<Item = Item>,
{
    left: OrderedSide<A>,
    right: OrderedSide<B>,
    failed: bool,
}

impl<A, B> PairedJoin<A, B>
where
    A: Iterator<Item = Item>,
    B: Iterator<Item = Item>,
{
    pub fn new(left: A, right: B) -> Self {
        Self {
            left: OrderedSide::new(left),
            right: OrderedSide::new(right),
            failed: false,
        }
    }

    fn fail(&mut self, err: SourceError) -> Option<Result<PairedValue, SourceError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<A, B> Iterator for PairedJoin<A, B>
where
    A: Iterator<Item = Item>,
    B: Iterator<Item = Item>,
{
    type Item = Result<PairedValue, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut a = match self.left.pull()? {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let mut b = match self.right.pull()? {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };

        loop {
            match a.row_key.cmp(&b.row_key) {
                Ordering::Equal => {
                    return Some(Ok(PairedValue {
                        row_key: a.row_key,
                        raw_a: a.raw,
                        raw_b: b.raw,
                    }));
                }
                Ordering::Less => {
                    a = match self.left.pull()? {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                }
                Ordering::Greater => {
                    b = match self.right.pull()? {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                }
            }
        }
    }
}
