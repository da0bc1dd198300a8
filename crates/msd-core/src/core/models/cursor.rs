use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Raised when a cursor or an index leaves the valid range of its collection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Index {index} is out of bounds for a collection of length {len}")]
pub struct BoundsError {
    pub index: isize,
    pub len: usize,
}

impl BoundsError {
    pub fn new(index: isize, len: usize) -> Self {
        Self { index, len }
    }
}

/// A fixed-length, randomly addressable sequence of elements.
///
/// Implementors only describe how to reach element `index`; the traversal,
/// bounds checking and identity rules live in [`Collection`] and [`Cursor`].
pub trait Sequence {
    type Item<'a>
    where
        Self: 'a;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`. Callers guarantee `index < self.len()`.
    fn element(&self, index: usize) -> Self::Item<'_>;
}

impl<T> Sequence for Vec<T> {
    type Item<'a>
        = &'a T
    where
        T: 'a;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn element(&self, index: usize) -> &T {
        &self[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Owns a [`Sequence`] view and hands out cursors that borrow it.
///
/// Cursors from the same `Collection` can be compared and ordered; cursors from
/// different collections never compare equal.
#[derive(Debug, Clone)]
pub struct Collection<S> {
    sequence: S,
}

impl<S: Sequence> Collection<S> {
    pub fn new(sequence: S) -> Self {
        Self { sequence }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn begin(&self) -> Cursor<'_, S> {
        Cursor::new(self, 0, Direction::Forward)
    }

    pub fn end(&self) -> Cursor<'_, S> {
        Cursor::new(self, self.len(), Direction::Forward)
    }

    /// First position of a reverse traversal (the last element).
    pub fn rbegin(&self) -> Cursor<'_, S> {
        Cursor::new(self, 0, Direction::Reverse)
    }

    /// One-before-first sentinel of a reverse traversal.
    pub fn rend(&self) -> Cursor<'_, S> {
        Cursor::new(self, self.len(), Direction::Reverse)
    }

    /// Returns a forward cursor at `index`; negative values count back from `end`.
    pub fn cursor_at(&self, index: isize) -> Result<Cursor<'_, S>, BoundsError> {
        let position = self.resolve(index)?;
        Ok(Cursor::new(self, position, Direction::Forward))
    }

    /// Returns the element at `index`; negative values count back from `end`.
    pub fn get(&self, index: isize) -> Result<S::Item<'_>, BoundsError> {
        let position = self.resolve(index)?;
        Ok(self.sequence.element(position))
    }

    /// Iterates over every valid forward position.
    pub fn iter(&self) -> Positions<'_, S> {
        self.begin().positions()
    }

    /// Iterates over the elements themselves rather than over positions.
    pub fn items(&self) -> impl Iterator<Item = S::Item<'_>> + '_ {
        (0..self.len()).map(move |i| self.sequence.element(i))
    }

    pub fn sequence(&self) -> &S {
        &self.sequence
    }

    fn resolve(&self, index: isize) -> Result<usize, BoundsError> {
        let len = self.len();
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(BoundsError::new(index, len));
        }
        Ok(resolved as usize)
    }
}

impl<'c, S: Sequence> IntoIterator for &'c Collection<S> {
    type Item = Cursor<'c, S>;
    type IntoIter = Positions<'c, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A bounds-checked position inside a [`Collection`].
///
/// The position is kept as a meta index in `[0, len]` counted from the start of
/// the traversal: for a forward cursor it equals the element index, for a
/// reverse cursor it maps to `len - 1 - meta`. The value `len` is the `end`
/// sentinel in both modes and is never dereferenced.
///
/// Reading and moving are separate steps: [`Cursor::current`] inspects the
/// element, [`Cursor::advance`] moves.
pub struct Cursor<'c, S> {
    collection: &'c Collection<S>,
    position: usize,
    direction: Direction,
}

impl<'c, S: Sequence> Cursor<'c, S> {
    fn new(collection: &'c Collection<S>, position: usize, direction: Direction) -> Self {
        Self {
            collection,
            position,
            direction,
        }
    }

    pub fn meta_index(&self) -> usize {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_end(&self) -> bool {
        self.position >= self.collection.len()
    }

    /// Index of the referenced element in the underlying sequence.
    pub fn index(&self) -> Result<usize, BoundsError> {
        let len = self.collection.len();
        if self.position >= len {
            return Err(BoundsError::new(self.position as isize, len));
        }
        Ok(match self.direction {
            Direction::Forward => self.position,
            Direction::Reverse => len - 1 - self.position,
        })
    }

    pub fn current(&self) -> Result<S::Item<'c>, BoundsError> {
        let index = self.index()?;
        Ok(self.collection.sequence.element(index))
    }

    /// Moves one step towards `end`. Fails when already at `end`.
    pub fn advance(&mut self) -> Result<(), BoundsError> {
        *self = self.offset(1)?;
        Ok(())
    }

    /// Moves one step back towards the traversal start. Fails when already there.
    pub fn retreat(&mut self) -> Result<(), BoundsError> {
        *self = self.offset(-1)?;
        Ok(())
    }

    /// Returns the cursor `delta` steps further along the traversal, bounded by `[0, len]`.
    pub fn offset(&self, delta: isize) -> Result<Self, BoundsError> {
        let target = self.position as isize + delta;
        let len = self.collection.len();
        if target < 0 || target as usize > len {
            return Err(BoundsError::new(target, len));
        }
        Ok(Self::new(self.collection, target as usize, self.direction))
    }

    pub fn checked_add(&self, steps: usize) -> Result<Self, BoundsError> {
        self.offset(steps as isize)
    }

    pub fn checked_sub(&self, steps: usize) -> Result<Self, BoundsError> {
        self.offset(-(steps as isize))
    }

    /// Snapshots of every position from this one up to, but excluding, `end`.
    pub fn positions(self) -> Positions<'c, S> {
        Positions { cursor: self }
    }

    /// Number of steps from `other` to `self`, when both traverse the same collection the same way.
    pub fn distance_from(&self, other: &Self) -> Option<isize> {
        if !self.same_traversal(other) {
            return None;
        }
        Some(self.position as isize - other.position as isize)
    }

    fn same_traversal(&self, other: &Self) -> bool {
        std::ptr::eq(self.collection, other.collection) && self.direction == other.direction
    }

    // Element identity: forward end maps to `len`, reverse end to `-1`.
    fn slot(&self) -> isize {
        match self.direction {
            Direction::Forward => self.position as isize,
            Direction::Reverse => self.collection.len() as isize - 1 - self.position as isize,
        }
    }
}

impl<S> Clone for Cursor<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Cursor<'_, S> {}

impl<S: Sequence> PartialEq for Cursor<'_, S> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.collection, other.collection) && self.slot() == other.slot()
    }
}

impl<S: Sequence> PartialOrd for Cursor<'_, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.same_traversal(other) {
            Some(self.position.cmp(&other.position))
        } else if self == other {
            // Opposite traversals only order when they name the same element.
            Some(Ordering::Equal)
        } else {
            None
        }
    }
}

impl<S> fmt::Debug for Cursor<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("position", &self.position)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Iterator over cursor snapshots, produced by [`Cursor::positions`].
pub struct Positions<'c, S> {
    cursor: Cursor<'c, S>,
}

impl<'c, S: Sequence> Iterator for Positions<'c, S> {
    type Item = Cursor<'c, S>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_end() {
            return None;
        }
        let snapshot = self.cursor;
        self.cursor.advance().ok()?;
        Some(snapshot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .cursor
            .collection
            .len()
            .saturating_sub(self.cursor.position);
        (remaining, Some(remaining))
    }
}

impl<S: Sequence> ExactSizeIterator for Positions<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Collection<Vec<char>> {
        Collection::new(vec!['a', 'b', 'c', 'd', 'e'])
    }

    mod offsets {
        use super::*;

        #[test]
        fn begin_plus_len_equals_end() {
            let c = letters();
            assert_eq!(c.begin().checked_add(c.len()).unwrap(), c.end());
            assert_eq!(c.rbegin().checked_add(c.len()).unwrap(), c.rend());
        }

        #[test]
        fn adding_then_subtracting_returns_to_begin() {
            let c = letters();
            for i in 0..=c.len() {
                let moved = c.begin().checked_add(i).unwrap();
                assert_eq!(moved.checked_sub(i).unwrap(), c.begin());
            }
        }

        #[test]
        fn offsets_outside_the_range_fail() {
            let c = letters();
            assert_eq!(
                c.begin().checked_add(6).unwrap_err(),
                BoundsError::new(6, 5)
            );
            assert_eq!(
                c.begin().checked_sub(1).unwrap_err(),
                BoundsError::new(-1, 5)
            );
        }

        #[test]
        fn advancing_from_the_last_element_reaches_end_and_stops() {
            let c = letters();
            let mut cursor = c.end().checked_sub(1).unwrap();
            cursor.advance().unwrap();
            assert_eq!(cursor, c.end());
            assert!(cursor.advance().is_err());
            assert!(c.begin().clone().retreat().is_err());
        }
    }

    mod access {
        use super::*;

        #[test]
        fn end_is_never_dereferenced() {
            let c = letters();
            assert!(c.end().current().is_err());
            assert!(c.rend().current().is_err());
        }

        #[test]
        fn reverse_cursors_walk_from_the_last_element() {
            let c = letters();
            let values: Vec<char> = c.rbegin().positions().map(|p| *p.current().unwrap()).collect();
            assert_eq!(values, vec!['e', 'd', 'c', 'b', 'a']);
        }

        #[test]
        fn negative_indices_count_back_from_end() {
            let c = letters();
            assert_eq!(*c.get(-1).unwrap(), 'e');
            assert_eq!(*c.get(-5).unwrap(), 'a');
            assert_eq!(*c.get(2).unwrap(), 'c');
            assert!(c.get(-6).is_err());
            assert!(c.get(5).is_err());
            assert_eq!(c.cursor_at(-1).unwrap(), c.end().checked_sub(1).unwrap());
        }

        #[test]
        fn two_step_read_then_advance() {
            let c = letters();
            let mut cursor = c.begin();
            assert_eq!(*cursor.current().unwrap(), 'a');
            cursor.advance().unwrap();
            assert_eq!(*cursor.current().unwrap(), 'b');
            assert_eq!(cursor.meta_index(), 1);
            assert_eq!(cursor.index().unwrap(), 1);
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn iteration_yields_every_position_once() {
            let c = letters();
            let positions: Vec<usize> = c.iter().map(|p| p.meta_index()).collect();
            assert_eq!(positions, vec![0, 1, 2, 3, 4]);
            assert_eq!(c.iter().len(), 5);

            let mut count = 0;
            for cursor in &c {
                assert!(!cursor.is_end());
                count += 1;
            }
            assert_eq!(count, c.len());
        }

        #[test]
        fn forward_and_reverse_cursors_on_the_same_element_are_equal() {
            let c = letters();
            let forward = c.cursor_at(1).unwrap();
            let reverse = c.rbegin().checked_add(3).unwrap();
            assert_eq!(forward, reverse);
            assert_ne!(c.end(), c.rend());
            assert_eq!(forward.partial_cmp(&reverse), Some(Ordering::Equal));
            assert!(forward <= reverse && forward >= reverse);
        }

        #[test]
        fn opposite_traversals_on_different_elements_are_unordered() {
            let c = letters();
            let forward = c.cursor_at(0).unwrap();
            let reverse = c.rbegin();
            assert_ne!(forward, reverse);
            assert_eq!(forward.partial_cmp(&reverse), None);
        }

        #[test]
        fn cursors_of_different_collections_are_never_equal() {
            let a = letters();
            let b = letters();
            assert_ne!(a.begin(), b.begin());
            assert_eq!(a.begin().partial_cmp(&b.begin()), None);
        }

        #[test]
        fn cursors_order_by_traversal_position() {
            let c = letters();
            let second = c.cursor_at(1).unwrap();
            let fourth = c.cursor_at(3).unwrap();
            assert!(second < fourth);
            assert!(fourth < c.end());
            assert_eq!(fourth.distance_from(&second), Some(2));
        }

        #[test]
        fn slice_lookups_stay_optional_alongside_sequence_access() {
            let values = vec!['x', 'y'];
            assert_eq!(values.get(5), None);
            assert_eq!(values.get(1), Some(&'y'));
            assert_eq!(Sequence::element(&values, 0), &'x');
        }

        #[test]
        fn empty_collections_start_at_end() {
            let c: Collection<Vec<char>> = Collection::new(Vec::new());
            assert!(c.is_empty());
            assert_eq!(c.begin(), c.end());
            assert_eq!(c.iter().count(), 0);
        }
    }
}
