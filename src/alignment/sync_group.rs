/*!
 * Sync groups: the partition of candidate indices onto anchor indices.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

use super::overlap::OverlapMatrix;

/// One aligned utterance: anchor indices paired with candidate indices
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncGroup {
    pub anchors: Vec<usize>,
    pub candidates: Vec<usize>,
}

impl SyncGroup {
    pub fn new(anchors: Vec<usize>, candidates: Vec<usize>) -> Self {
        Self { anchors, candidates }
    }

    /// Group for a single anchor
    pub fn single(anchor: usize, candidates: Vec<usize>) -> Self {
        Self::new(vec![anchor], candidates)
    }

    /// The group's only anchor, if it has exactly one
    pub fn anchor(&self) -> Option<usize> {
        match self.anchors.as_slice() {
            [anchor] => Some(*anchor),
            _ => None,
        }
    }

    fn insert_candidate(&mut self, candidate: usize) {
        if let Err(position) = self.candidates.binary_search(&candidate) {
            self.candidates.insert(position, candidate);
        }
    }

    fn remove_candidate(&mut self, candidate: usize) {
        self.candidates.retain(|&c| c != candidate);
    }
}

/// Default derivation: one group per anchor, every candidate on the anchor
/// row with the largest raw overlap (lowest row on ties).
pub fn derive_sync_groups(overlap: &OverlapMatrix) -> Vec<SyncGroup> {
    let mut groups: Vec<SyncGroup> = (0..overlap.rows())
        .map(|i| SyncGroup::single(i, Vec::new()))
        .collect();

    for candidate in 0..overlap.columns() {
        if let Some(anchor) = overlap.best_anchor(candidate) {
            groups[anchor].candidates.push(candidate);
        }
    }

    groups
}

/// Position of the group holding `anchor`
pub fn group_of_anchor(groups: &[SyncGroup], anchor: usize) -> Option<usize> {
    groups.iter().position(|g| g.anchors.contains(&anchor))
}

/// Move `candidate` from wherever it is into group `target`
pub fn move_candidate(groups: &[SyncGroup], candidate: usize, target: usize) -> Vec<SyncGroup> {
    let mut moved = groups.to_vec();
    for group in moved.iter_mut() {
        group.remove_candidate(candidate);
    }
    moved[target].insert_candidate(candidate);
    moved
}

/// Groups after candidate `index` was split in two.
///
/// Indices after `index` shift up by one; the first piece (`index`) goes to
/// group `first_target` and the second (`index + 1`) to `second_target`.
pub fn remap_after_split(
    groups: &[SyncGroup],
    index: usize,
    first_target: usize,
    second_target: usize,
) -> Vec<SyncGroup> {
    let mut remapped: Vec<SyncGroup> = groups
        .iter()
        .map(|g| {
            let candidates = g
                .candidates
                .iter()
                .filter(|&&c| c != index)
                .map(|&c| if c > index { c + 1 } else { c })
                .collect();
            SyncGroup::new(g.anchors.clone(), candidates)
        })
        .collect();
    remapped[first_target].insert_candidate(index);
    remapped[second_target].insert_candidate(index + 1);
    remapped
}

/// Groups after candidate `index` was removed; later indices shift down by one
pub fn remap_after_removal(groups: &[SyncGroup], index: usize) -> Vec<SyncGroup> {
    groups
        .iter()
        .map(|g| {
            let candidates = g
                .candidates
                .iter()
                .filter(|&&c| c != index)
                .map(|&c| if c > index { c - 1 } else { c })
                .collect();
            SyncGroup::new(g.anchors.clone(), candidates)
        })
        .collect()
}

/// Check the distribution/shifting invariant.
///
/// Every group holds exactly one anchor, anchors run consecutively from 0 to
/// `anchor_count - 1`, and every candidate index below `candidate_count`
/// appears exactly once.
pub fn validate_sync_groups(
    groups: &[SyncGroup],
    anchor_count: usize,
    candidate_count: usize,
) -> Result<(), String> {
    if groups.len() != anchor_count {
        return Err(format!(
            "expected {} sync groups, found {}",
            anchor_count,
            groups.len()
        ));
    }

    let mut seen = vec![false; candidate_count];
    for (position, group) in groups.iter().enumerate() {
        match group.anchor() {
            Some(anchor) if anchor == position => {}
            Some(anchor) => {
                return Err(format!(
                    "sync group {} holds anchor {}; groups must be consecutive",
                    position, anchor
                ))
            }
            None => {
                return Err(format!(
                    "sync group {} holds {} anchors, expected exactly one",
                    position,
                    group.anchors.len()
                ))
            }
        }
        for &candidate in &group.candidates {
            if candidate >= candidate_count {
                return Err(format!(
                    "sync group {} references candidate {} but only {} exist",
                    position, candidate, candidate_count
                ));
            }
            if seen[candidate] {
                return Err(format!("candidate {} appears in more than one place", candidate));
            }
            seen[candidate] = true;
        }
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(format!("candidate {} is not in any sync group", missing));
    }

    Ok(())
}

/// Render groups as `[anchors] -> [candidates]` lines
pub struct SyncGroupsDisplay<'a>(pub &'a [SyncGroup]);

impl fmt::Display for SyncGroupsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Sync groups:")?;
        for group in self.0 {
            writeln!(f, "  {:?} -> {:?}", group.anchors, group.candidates)?;
        }
        Ok(())
    }
}
