/*!
 * The working state of one block's alignment.
 *
 * An `Alignment` is never edited in place: every stage consumes it and
 * returns a new value. Sync groups are read through `sync_groups()`, which
 * returns the installed override or derives them from the overlap matrix, so
 * no cached grouping can outlive a structural edit.
 */

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::errors::AlignmentError;
use crate::series::{Segment, Series};

use super::overlap::OverlapMatrix;
use super::sync_group::{self, SyncGroup, SyncGroupsDisplay};

#[derive(Debug, Clone)]
pub struct Alignment {
    anchor: Arc<Series>,
    candidate: Series,
    sync_override: Option<Vec<SyncGroup>>,
    settled: BTreeSet<usize>,
}

impl Alignment {
    pub fn new(anchor: Series, candidate: Series) -> Self {
        Self {
            anchor: Arc::new(anchor),
            candidate,
            sync_override: None,
            settled: BTreeSet::new(),
        }
    }

    pub fn anchor(&self) -> &Series {
        &self.anchor
    }

    pub fn candidate(&self) -> &Series {
        &self.candidate
    }

    pub fn overlap(&self) -> OverlapMatrix {
        OverlapMatrix::compute(&self.anchor, &self.candidate)
    }

    /// The override if one is installed, otherwise the default derivation
    pub fn sync_groups(&self) -> Vec<SyncGroup> {
        match &self.sync_override {
            Some(groups) => groups.clone(),
            None => sync_group::derive_sync_groups(&self.overlap()),
        }
    }

    pub fn has_override(&self) -> bool {
        self.sync_override.is_some()
    }

    /// Whether the candidate's placement was decided explicitly
    pub fn is_settled(&self, candidate: usize) -> bool {
        self.settled.contains(&candidate)
    }

    /// Install a complete replacement grouping
    pub fn with_sync_groups(self, groups: Vec<SyncGroup>) -> Self {
        Self {
            sync_override: Some(groups),
            ..self
        }
    }

    /// Drop the override; groups are derived from timing again
    pub fn without_override(self) -> Self {
        Self {
            sync_override: None,
            ..self
        }
    }

    /// Mark candidates as explicitly placed
    pub fn settling<I: IntoIterator<Item = usize>>(mut self, candidates: I) -> Self {
        self.settled.extend(candidates);
        self
    }

    /// Replace the candidate series and grouping wholesale.
    ///
    /// Used by the merge, proof and translate stages, whose output series is
    /// built fresh in group order. The settled set no longer applies.
    pub fn with_candidate(self, candidate: Series, groups: Vec<SyncGroup>) -> Self {
        Self {
            anchor: self.anchor,
            candidate,
            sync_override: Some(groups),
            settled: BTreeSet::new(),
        }
    }

    /// Split candidate `index` after `offset` characters.
    ///
    /// The first piece joins group `first_target`, the second joins
    /// `second_target`; both pieces are settled.
    pub fn split_candidate(
        self,
        index: usize,
        offset: usize,
        first_target: usize,
        second_target: usize,
    ) -> Result<Self, AlignmentError> {
        let segment = self.candidate.get(index).ok_or_else(|| self.structural(format!(
            "cannot split candidate {}: only {} candidates exist",
            index,
            self.candidate.len()
        )))?;
        let (head, tail) = segment.split_at_char(offset)?;

        let groups = sync_group::remap_after_split(&self.sync_groups(), index, first_target, second_target);
        let mut settled: BTreeSet<usize> = self
            .settled
            .iter()
            .map(|&c| if c > index { c + 1 } else { c })
            .collect();
        settled.insert(index);
        settled.insert(index + 1);

        Ok(Self {
            candidate: self.candidate.replacing(index, vec![head, tail]),
            sync_override: Some(groups),
            settled,
            anchor: self.anchor,
        })
    }

    /// Remove candidate `index`; later candidate indices shift down by one
    pub fn remove_candidate(self, index: usize) -> Result<Self, AlignmentError> {
        if index >= self.candidate.len() {
            return Err(self.structural(format!(
                "cannot remove candidate {}: only {} candidates exist",
                index,
                self.candidate.len()
            )));
        }

        let sync_override = self
            .sync_override
            .as_ref()
            .map(|groups| sync_group::remap_after_removal(groups, index));
        let settled = self
            .settled
            .iter()
            .filter(|&&c| c != index)
            .map(|&c| if c > index { c - 1 } else { c })
            .collect();

        Ok(Self {
            candidate: self.candidate.removing(index),
            sync_override,
            settled,
            anchor: self.anchor,
        })
    }

    /// Replace the text of candidate `index`, keeping timing and grouping
    pub fn with_candidate_text(self, index: usize, text: String) -> Result<Self, AlignmentError> {
        let segment = self.candidate.get(index).ok_or_else(|| self.structural(format!(
            "cannot edit candidate {}: only {} candidates exist",
            index,
            self.candidate.len()
        )))?;
        let replaced = Segment::new(segment.start_ms, segment.end_ms, text);
        let groups = self.sync_groups();

        Ok(Self {
            candidate: self.candidate.replacing(index, vec![replaced]),
            sync_override: Some(groups),
            ..self
        })
    }

    /// Concatenated anchor text of a group
    pub fn anchor_text(&self, group: &SyncGroup) -> String {
        self.anchor.concat_text(&group.anchors)
    }

    /// Concatenated candidate text of a group
    pub fn candidate_text(&self, group: &SyncGroup) -> String {
        self.candidate.concat_text(&group.candidates)
    }

    /// Check the one-anchor-per-group partition invariant
    pub fn validate(&self) -> Result<(), AlignmentError> {
        sync_group::validate_sync_groups(&self.sync_groups(), self.anchor.len(), self.candidate.len())
            .map_err(|message| self.structural(message))
    }

    /// Full state rendering for diagnosis
    pub fn dump(&self) -> String {
        self.to_string()
    }

    /// Build a structural error carrying the current state dump
    pub fn structural(&self, message: impl Into<String>) -> AlignmentError {
        AlignmentError::Structural {
            message: message.into(),
            dump: self.dump(),
        }
    }

    pub fn into_candidate(self) -> Series {
        self.candidate
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Anchor:")?;
        for (i, segment) in self.anchor.iter().enumerate() {
            writeln!(f, "  [{:>3}] {}", i, segment)?;
        }
        writeln!(f, "Candidate:")?;
        for (i, segment) in self.candidate.iter().enumerate() {
            let marker = if self.settled.contains(&i) { "*" } else { " " };
            writeln!(f, "  [{:>3}]{} {}", i, marker, segment)?;
        }
        write!(f, "{}", self.overlap())?;
        let source = if self.sync_override.is_some() { "override" } else { "derived" };
        writeln!(f, "({})", source)?;
        write!(f, "{}", SyncGroupsDisplay(&self.sync_groups()))
    }
}
