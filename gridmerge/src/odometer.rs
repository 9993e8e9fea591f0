/// Enumerates every index tuple of an N dimensional shape, in row major order (last axis varies
/// fastest).
///
/// The odometer can be driven one step at a time with `advance`, so callers can interleave a
/// storage read or write between steps, or used as an `Iterator` of owned tuples.
///
/// A rank 0 shape has exactly one (empty) tuple. A shape with any zero extent has none.
///
#[derive(Clone, Debug)]
pub struct Odometer {
    shape: Vec<usize>,
    index: Vec<usize>,
    done: bool,
}

impl Odometer {
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            index: vec![0; shape.len()],
            done: shape.iter().any(|&extent| extent == 0),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of tuples in a full traversal
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current tuple, or `None` once the traversal is finished.
    pub fn index(&self) -> Option<&[usize]> {
        if self.done {
            None
        } else {
            Some(&self.index)
        }
    }

    /// Step to the next tuple. Returns `false` when stepping past the last tuple, after which the
    /// odometer stays finished until `reset`.
    ///
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }

        for axis in (0..self.shape.len()).rev() {
            self.index[axis] += 1;
            if self.index[axis] < self.shape[axis] {
                return true;
            }
            self.index[axis] = 0;
        }

        // Every axis carried over (or rank 0), so that was the last tuple
        self.done = true;

        false
    }

    /// Restart the traversal from the first tuple.
    pub fn reset(&mut self) {
        self.index.iter_mut().for_each(|i| *i = 0);
        self.done = self.shape.iter().any(|&extent| extent == 0);
    }

    /// The position one past the last populated position of an axis that grows along its first
    /// dimension, ie `[shape[0], 0, ..., 0]`. For a rank 1 axis of length `n` this is `[n]`.
    ///
    pub fn append_index(shape: &[usize]) -> Vec<usize> {
        let mut index = vec![0; shape.len()];
        if let Some(first) = shape.first() {
            index[0] = *first;
        }

        index
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index()?.to_vec();
        self.advance();

        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_row_major_order() {
        let tuples: Vec<Vec<usize>> = Odometer::new(&[2, 3]).collect();
        assert_eq!(
            tuples,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
            ]
        );
    }

    #[test]
    fn test_completeness() {
        let shape = [3, 4, 5];
        let odometer = Odometer::new(&shape);
        assert_eq!(odometer.len(), 60);

        let tuples: Vec<Vec<usize>> = odometer.collect();
        assert_eq!(tuples.len(), 60);

        let distinct: HashSet<Vec<usize>> = tuples.iter().cloned().collect();
        assert_eq!(distinct.len(), 60);

        for tuple in &tuples {
            assert_eq!(tuple.len(), 3);
            for (axis, &i) in tuple.iter().enumerate() {
                assert!(i < shape[axis]);
            }
        }
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut odometer = Odometer::new(&[2]);
        assert_eq!(odometer.index(), Some(&[0][..]));
        assert!(odometer.advance());
        assert_eq!(odometer.index(), Some(&[1][..]));
        assert!(!odometer.advance());
        assert_eq!(odometer.index(), None);

        // No wraparound
        assert!(!odometer.advance());
        assert_eq!(odometer.index(), None);
    }

    #[test]
    fn test_reset() {
        let mut odometer = Odometer::new(&[2, 2]);
        let first: Vec<Vec<usize>> = odometer.by_ref().collect();
        assert_eq!(odometer.index(), None);

        odometer.reset();
        let second: Vec<Vec<usize>> = odometer.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rank_zero() {
        let tuples: Vec<Vec<usize>> = Odometer::new(&[]).collect();
        assert_eq!(tuples, vec![Vec::<usize>::new()]);
        assert_eq!(Odometer::new(&[]).len(), 1);
    }

    #[test]
    fn test_zero_extent() {
        let mut odometer = Odometer::new(&[3, 0, 2]);
        assert!(odometer.is_empty());
        assert_eq!(odometer.index(), None);
        assert_eq!(odometer.next(), None);

        odometer.reset();
        assert_eq!(odometer.index(), None);
    }

    #[test]
    fn test_append_index() {
        assert_eq!(Odometer::append_index(&[7]), vec![7]);
        assert_eq!(Odometer::append_index(&[0]), vec![0]);
        assert_eq!(Odometer::append_index(&[4, 3, 2]), vec![4, 0, 0]);
        assert_eq!(Odometer::append_index(&[]), Vec::<usize>::new());
    }
}
