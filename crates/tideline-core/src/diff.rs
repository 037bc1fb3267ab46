//! Identity-preserving diff between two snapshots.
//!
//! Items are matched by [`ItemId`]. Matched items whose value changed (an
//! attribute flip) become in-place updates rather than delete + insert.
//! Matched items that keep their relative order stay put; the rest are moves.
//! The stationary set is a longest increasing subsequence of old positions
//! taken in new order, so the number of moves is minimal.
//!
//! Changeset positions use batch-update conventions:
//!
//! - `deletions`, `Move::from`, `Update::from` index the **old** snapshot
//! - `insertions`, `Move::to`, `Update::to` index the **new** snapshot

use tideline_types::DisplayItem;

use crate::error::CoreError;
use crate::snapshot::Snapshot;

/// An item that changes position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

/// An item whose identity matched but whose value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub from: usize,
    pub to: usize,
}

/// Minimal edit operations between two non-empty-baseline snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub deletions: Vec<usize>,
    pub insertions: Vec<usize>,
    pub moves: Vec<Move>,
    pub updates: Vec<Update>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
            && self.insertions.is_empty()
            && self.moves.is_empty()
            && self.updates.is_empty()
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.deletions.len() + self.insertions.len() + self.moves.len() + self.updates.len()
    }

    /// Apply the changeset to `old`, taking inserted and updated values from `new`.
    ///
    /// Surviving items that are neither moved nor deleted fill the remaining
    /// slots in their original order. Returns an error if the changeset does
    /// not fit the two lists.
    pub fn replay(
        &self,
        old: &[DisplayItem],
        new: &[DisplayItem],
    ) -> Result<Vec<DisplayItem>, CoreError> {
        let mut source: Vec<Option<DisplayItem>> = old.iter().cloned().map(Some).collect();
        let mut slots: Vec<Option<DisplayItem>> = vec![None; new.len()];

        for update in &self.updates {
            let value = new.get(update.to).ok_or_else(|| mismatch("update target", update.to))?;
            let current = source
                .get_mut(update.from)
                .ok_or_else(|| mismatch("update source", update.from))?;
            *current = Some(value.clone());
        }
        for &to in &self.insertions {
            let value = new.get(to).ok_or_else(|| mismatch("insertion", to))?;
            *slot_mut(&mut slots, to)? = Some(value.clone());
        }
        for mv in &self.moves {
            let item = source
                .get_mut(mv.from)
                .and_then(Option::take)
                .ok_or_else(|| mismatch("move source", mv.from))?;
            *slot_mut(&mut slots, mv.to)? = Some(item);
        }
        for &from in &self.deletions {
            let current = source.get_mut(from).ok_or_else(|| mismatch("deletion", from))?;
            *current = None;
        }

        let mut survivors = source.into_iter().flatten();
        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot.or_else(|| survivors.next()) {
                Some(item) => result.push(item),
                None => return Err(CoreError::ChangesetMismatch("too few surviving items".into())),
            }
        }
        if survivors.next().is_some() {
            return Err(CoreError::ChangesetMismatch("surviving items left over".into()));
        }
        Ok(result)
    }
}

fn mismatch(what: &str, index: usize) -> CoreError {
    CoreError::ChangesetMismatch(format!("{what} index {index} out of range"))
}

fn slot_mut(
    slots: &mut [Option<DisplayItem>],
    index: usize,
) -> Result<&mut Option<DisplayItem>, CoreError> {
    match slots.get_mut(index) {
        Some(slot) if slot.is_none() => Ok(slot),
        Some(_) => Err(CoreError::ChangesetMismatch(format!("slot {index} filled twice"))),
        None => Err(mismatch("target slot", index)),
    }
}

/// How the display surface should move from one snapshot to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditScript {
    /// The old snapshot was empty: replace everything, no diff computed.
    Reload,
    /// Apply these operations.
    Patch(Changeset),
}

impl EditScript {
    /// True when applying the script changes nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, EditScript::Patch(changes) if changes.is_empty())
    }

    pub fn is_reload(&self) -> bool {
        matches!(self, EditScript::Reload)
    }

    pub fn changeset(&self) -> Option<&Changeset> {
        match self {
            EditScript::Patch(changes) => Some(changes),
            EditScript::Reload => None,
        }
    }
}

/// Compute the edit script turning `old` into `new`.
pub fn diff(old: &Snapshot, new: &Snapshot) -> EditScript {
    if old.is_empty() && !new.is_empty() {
        return EditScript::Reload;
    }

    let mut changes = Changeset::default();
    // (old position, new position) of every matched item, in new order.
    let mut matched: Vec<(usize, usize)> = Vec::new();

    for (to, item) in new.iter().enumerate() {
        match old.position(&item.id()) {
            Some(from) => {
                matched.push((from, to));
                if old.get(from) != Some(item) {
                    changes.updates.push(Update { from, to });
                }
            }
            None => changes.insertions.push(to),
        }
    }

    changes.deletions = old
        .iter()
        .enumerate()
        .filter(|(_, item)| !new.contains(&item.id()))
        .map(|(from, _)| from)
        .collect();

    let old_positions: Vec<usize> = matched.iter().map(|&(from, _)| from).collect();
    let stationary = longest_increasing_mask(&old_positions);
    changes.moves = matched
        .iter()
        .zip(stationary)
        .filter(|(_, keep)| !keep)
        .map(|(&(from, to), _)| Move { from, to })
        .collect();

    EditScript::Patch(changes)
}

/// Mark the members of one longest strictly increasing subsequence.
///
/// Patience sorting with predecessor links; among equally long candidates the
/// one ending earliest in the input wins, which keeps the result stable.
fn longest_increasing_mask(values: &[usize]) -> Vec<bool> {
    // tails[k] = index of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; values.len()];

    for (i, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&t| values[t] < value);
        if slot > 0 {
            predecessor[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut mask = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        mask[i] = true;
        cursor = predecessor[i];
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideline_types::{Attribute, EntryId};

    fn id(n: u8) -> EntryId {
        EntryId::from_bytes([n; 16])
    }

    fn content(n: u8) -> DisplayItem {
        DisplayItem::content(id(n), Attribute::default())
    }

    fn snapshot(items: Vec<DisplayItem>) -> Snapshot {
        Snapshot::new(items).expect("unique items")
    }

    fn contents(ns: &[u8]) -> Snapshot {
        snapshot(ns.iter().map(|&n| content(n)).collect())
    }

    /// Diff, replay, and check the replay reproduces `new`.
    fn patch(old: &Snapshot, new: &Snapshot) -> Changeset {
        let changes = diff(old, new).changeset().cloned().expect("patch");
        let replayed = changes.replay(old.items(), new.items()).expect("replay");
        assert_eq!(replayed, new.items());
        changes
    }

    // =========================================================================
    // Baseline Handling
    // =========================================================================

    #[test]
    fn test_empty_old_is_full_reload() {
        assert_eq!(diff(&Snapshot::empty(), &contents(&[1, 2])), EditScript::Reload);
    }

    #[test]
    fn test_empty_to_empty_is_noop() {
        assert!(diff(&Snapshot::empty(), &Snapshot::empty()).is_empty());
    }

    #[test]
    fn test_identical_snapshots_produce_empty_script() {
        let s = snapshot(vec![
            content(1),
            DisplayItem::GapMarker { anchor: id(1) },
            content(2),
            DisplayItem::BottomLoader,
        ]);
        let script = diff(&s, &s.clone());
        assert!(script.is_empty());
        assert!(!script.is_reload());
    }

    // =========================================================================
    // Operations
    // =========================================================================

    #[test]
    fn test_prepend_is_insertions_only() {
        let changes = patch(&contents(&[3, 4]), &contents(&[1, 2, 3, 4]));
        assert_eq!(changes.insertions, vec![0, 1]);
        assert!(changes.moves.is_empty());
        assert!(changes.deletions.is_empty());
    }

    #[test]
    fn test_removal_is_deletion_only() {
        let changes = patch(&contents(&[1, 2, 3]), &contents(&[1, 3]));
        assert_eq!(changes.deletions, vec![1]);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_gap_filled_replaces_marker() {
        let old = snapshot(vec![
            DisplayItem::content(id(1), Attribute { is_separator_hidden: true, ..Attribute::default() }),
            DisplayItem::GapMarker { anchor: id(1) },
            content(4),
        ]);
        let new = contents(&[1, 2, 3, 4]);

        let changes = patch(&old, &new);
        assert_eq!(changes.deletions, vec![1]);
        assert_eq!(changes.insertions, vec![1, 2]);
        assert_eq!(changes.updates, vec![Update { from: 0, to: 0 }]);
        assert!(changes.moves.is_empty());
    }

    #[test]
    fn test_attribute_change_is_update_not_move() {
        let old = contents(&[1, 2]);
        let new = snapshot(vec![
            content(1),
            DisplayItem::content(id(2), Attribute { is_content_revealed: true, ..Attribute::default() }),
        ]);

        let changes = patch(&old, &new);
        assert_eq!(changes.updates, vec![Update { from: 1, to: 1 }]);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_single_move_is_minimal() {
        let changes = patch(&contents(&[1, 2, 3, 4]), &contents(&[2, 3, 4, 1]));
        assert_eq!(changes.moves, vec![Move { from: 0, to: 3 }]);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_reverse_keeps_one_stationary() {
        let changes = patch(&contents(&[1, 2, 3, 4]), &contents(&[4, 3, 2, 1]));
        assert_eq!(changes.moves.len(), 3);
    }

    #[test]
    fn test_mixed_changes_replay() {
        let old = snapshot(vec![
            content(1),
            content(2),
            DisplayItem::GapMarker { anchor: id(2) },
            content(5),
            content(6),
            DisplayItem::BottomLoader,
        ]);
        let new = snapshot(vec![
            content(0),
            content(5),
            content(1),
            DisplayItem::content(id(2), Attribute { is_content_revealed: true, ..Attribute::default() }),
            content(3),
            content(6),
        ]);

        let changes = patch(&old, &new);
        assert_eq!(changes.deletions, vec![2, 5]);
        assert_eq!(changes.insertions, vec![0, 4]);
        assert_eq!(changes.moves, vec![Move { from: 3, to: 1 }]);
        assert_eq!(changes.updates, vec![Update { from: 1, to: 3 }]);
    }

    #[test]
    fn test_replay_rejects_mismatched_changeset() {
        let changes = Changeset {
            insertions: vec![5],
            ..Changeset::default()
        };
        let result = changes.replay(&[content(1)], &[content(1)]);
        assert!(matches!(result, Err(CoreError::ChangesetMismatch(_))));
    }

    #[test]
    fn test_longest_increasing_mask() {
        assert_eq!(longest_increasing_mask(&[]), Vec::<bool>::new());
        assert_eq!(longest_increasing_mask(&[0, 1, 2]), vec![true, true, true]);
        assert_eq!(longest_increasing_mask(&[3, 0, 1, 2]), vec![false, true, true, true]);
        assert_eq!(longest_increasing_mask(&[1, 0]).iter().filter(|&&k| k).count(), 1);
    }
}
