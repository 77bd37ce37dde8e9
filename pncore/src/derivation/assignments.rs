use smallvec::SmallVec;

/// Cartesian product over per-symbol candidate lists.
///
/// Yields one tuple per combination, picking exactly one candidate per position; the
/// last position varies fastest. The same candidate may appear at several positions.
/// If any list is empty the product is empty.
#[derive(Debug, Clone)]
pub struct Assignments<'a, T> {
    lists: &'a [Vec<T>],
    cursor: SmallVec<usize, 4>,
    done: bool,
}

impl<'a, T: Copy> Assignments<'a, T> {
    pub fn new(lists: &'a [Vec<T>]) -> Self {
        Self {
            lists,
            cursor: lists.iter().map(|_| 0).collect(),
            done: lists.iter().any(Vec::is_empty),
        }
    }

    /// Total number of tuples the product contains.
    pub fn total(&self) -> usize {
        if self.lists.iter().any(Vec::is_empty) {
            0
        } else {
            self.lists.iter().map(Vec::len).product()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn advance(&mut self) {
        for pos in (0..self.cursor.len()).rev() {
            self.cursor[pos] += 1;
            if self.cursor[pos] < self.lists[pos].len() {
                return;
            }
            self.cursor[pos] = 0;
        }
        // Every position wrapped around.
        self.done = true;
    }
}

impl<T: Copy> Iterator for Assignments<'_, T> {
    type Item = SmallVec<T, 4>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = self
            .cursor
            .iter()
            .zip(self.lists)
            .map(|(&pos, list)| list[pos])
            .collect();
        self.advance();
        Some(item)
    }
}
