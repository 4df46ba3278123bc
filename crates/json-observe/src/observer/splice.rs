//! Minimal splice lists between two versions of a sequence.
//!
//! The calculator trims the shared prefix and suffix, then runs an
//! edit-distance pass over the remaining window in which a substitution costs
//! two (one removal plus one addition). That weighting keeps the longest run
//! of unchanged elements in place: `xxxx123 -> 123yyyy` becomes "remove 4,
//! keep 3, add 4" rather than seven updates.

use std::ops::Range;

use json_observe_value::Value;

/// One contiguous edit: at `index` in the *current* sequence, `added_count`
/// new elements replace the `removed` elements that used to be there.
#[derive(Debug, Clone, PartialEq)]
pub struct Splice<T = Value> {
    pub index: usize,
    pub removed: Vec<T>,
    pub added_count: usize,
}

impl<T> Splice<T> {
    pub fn new(index: usize, removed: Vec<T>, added_count: usize) -> Self {
        Self {
            index,
            removed,
            added_count,
        }
    }

    /// Index range of the added elements in the current sequence.
    pub fn added_range(&self) -> Range<usize> {
        self.index..self.index + self.added_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Leave,
    Update,
    Add,
    Delete,
}

/// Splices transforming `previous` into `current`, comparing elements with
/// `PartialEq`. For [`Value`] that is identity for containers and SameValue
/// for primitives.
///
/// # Example
///
/// ```
/// use json_observe::{calculate_splices, Splice};
///
/// let splices = calculate_splices(&[1, 9, 3, 4, 5], &[1, 2, 3, 4, 5]);
/// assert_eq!(splices, vec![Splice::new(1, vec![2], 1)]);
///
/// let splices = calculate_splices(&[1, 2, 3, 4], &[1, 2, 3]);
/// assert_eq!(splices, vec![Splice::new(3, vec![], 1)]);
/// ```
pub fn calculate_splices<T>(current: &[T], previous: &[T]) -> Vec<Splice<T>>
where
    T: Clone + PartialEq,
{
    calculate_splices_by(current, previous, |a, b| a == b)
}

/// [`calculate_splices`] with an explicit element equality.
pub fn calculate_splices_by<T, F>(current: &[T], previous: &[T], eq: F) -> Vec<Splice<T>>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    calc_splices(current, 0..current.len(), previous, 0..previous.len(), &eq)
}

/// Splices between windows of two sequences.
///
/// Prefix trimming only applies when both windows start at zero, and suffix
/// trimming only when both end at the sequence end.
pub fn calc_splices<T, F>(
    current: &[T],
    current_range: Range<usize>,
    old: &[T],
    old_range: Range<usize>,
    eq: &F,
) -> Vec<Splice<T>>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    let Range {
        start: mut current_start,
        end: mut current_end,
    } = current_range;
    let Range {
        start: mut old_start,
        end: mut old_end,
    } = old_range;

    let min_length = (current_end - current_start).min(old_end - old_start);
    let mut prefix = 0;
    if current_start == 0 && old_start == 0 {
        prefix = shared_prefix(current, old, min_length, eq);
    }
    let mut suffix = 0;
    if current_end == current.len() && old_end == old.len() {
        suffix = shared_suffix(current, old, min_length - prefix, eq);
    }

    current_start += prefix;
    old_start += prefix;
    current_end -= suffix;
    old_end -= suffix;

    if current_start == current_end && old_start == old_end {
        return Vec::new();
    }
    if current_start == current_end {
        return vec![Splice::new(current_start, old[old_start..old_end].to_vec(), 0)];
    }
    if old_start == old_end {
        return vec![Splice::new(current_start, Vec::new(), current_end - current_start)];
    }

    let distances = edit_distances(
        &current[current_start..current_end],
        &old[old_start..old_end],
        eq,
    );

    let mut splices = Vec::new();
    let mut splice: Option<Splice<T>> = None;
    let mut index = current_start;
    let mut old_index = old_start;
    for edit in edits_from_distances(&distances) {
        match edit {
            Edit::Leave => {
                if let Some(done) = splice.take() {
                    splices.push(done);
                }
                index += 1;
                old_index += 1;
            }
            Edit::Update => {
                let s = splice.get_or_insert_with(|| Splice::new(index, Vec::new(), 0));
                s.added_count += 1;
                s.removed.push(old[old_index].clone());
                index += 1;
                old_index += 1;
            }
            Edit::Add => {
                let s = splice.get_or_insert_with(|| Splice::new(index, Vec::new(), 0));
                s.added_count += 1;
                index += 1;
            }
            Edit::Delete => {
                let s = splice.get_or_insert_with(|| Splice::new(index, Vec::new(), 0));
                s.removed.push(old[old_index].clone());
                old_index += 1;
            }
        }
    }
    splices.extend(splice);
    splices
}

fn shared_prefix<T, F>(current: &[T], old: &[T], search_length: usize, eq: &F) -> usize
where
    F: Fn(&T, &T) -> bool,
{
    (0..search_length)
        .find(|&i| !eq(&current[i], &old[i]))
        .unwrap_or(search_length)
}

fn shared_suffix<T, F>(current: &[T], old: &[T], search_length: usize, eq: &F) -> usize
where
    F: Fn(&T, &T) -> bool,
{
    current
        .iter()
        .rev()
        .zip(old.iter().rev())
        .take(search_length)
        .take_while(|(a, b)| eq(a, b))
        .count()
}

/// Rows follow `old`, columns follow `current`. Only additions and deletions
/// cost; matching elements carry the diagonal.
fn edit_distances<T, F>(current: &[T], old: &[T], eq: &F) -> Vec<Vec<usize>>
where
    F: Fn(&T, &T) -> bool,
{
    let rows = old.len() + 1;
    let columns = current.len() + 1;
    let mut distances = vec![vec![0usize; columns]; rows];
    for (i, row) in distances.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in distances[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..rows {
        for j in 1..columns {
            distances[i][j] = if eq(&current[j - 1], &old[i - 1]) {
                distances[i - 1][j - 1]
            } else {
                let north = distances[i - 1][j] + 1;
                let west = distances[i][j - 1] + 1;
                north.min(west)
            };
        }
    }
    distances
}

/// Walks back from the bottom-right corner, preferring the diagonal on ties,
/// then a deletion, then an addition.
fn edits_from_distances(distances: &[Vec<usize>]) -> Vec<Edit> {
    let mut i = distances.len() - 1;
    let mut j = distances[0].len() - 1;
    let mut current = distances[i][j];
    let mut edits = Vec::with_capacity(i + j);

    while i > 0 || j > 0 {
        if i == 0 {
            edits.push(Edit::Add);
            j -= 1;
            continue;
        }
        if j == 0 {
            edits.push(Edit::Delete);
            i -= 1;
            continue;
        }

        let diagonal = distances[i - 1][j - 1];
        let deleted = distances[i - 1][j];
        let added = distances[i][j - 1];
        let min = if deleted < added {
            deleted.min(diagonal)
        } else {
            added.min(diagonal)
        };

        if min == diagonal {
            if diagonal == current {
                edits.push(Edit::Leave);
            } else {
                edits.push(Edit::Update);
                current = diagonal;
            }
            i -= 1;
            j -= 1;
        } else if min == deleted {
            edits.push(Edit::Delete);
            i -= 1;
            current = deleted;
        } else {
            edits.push(Edit::Add);
            j -= 1;
            current = added;
        }
    }

    edits.reverse();
    edits
}

/// Replays `splices` onto `previous`, taking added elements from `current`.
///
/// Afterwards `previous` equals `current` when `splices` was computed from
/// the two. Out-of-range splices are clamped rather than panicking.
pub fn apply_splices<T: Clone>(previous: &mut Vec<T>, current: &[T], splices: &[Splice<T>]) {
    for splice in splices {
        let start = splice.index.min(previous.len());
        let end = (splice.index + splice.removed.len()).min(previous.len());
        let added = splice.added_range();
        let added = added.start.min(current.len())..added.end.min(current.len());
        previous.splice(start..end, current[added].iter().cloned());
    }
}
