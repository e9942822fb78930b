/*!
 * Time-overlap model between the anchor and candidate series.
 */

use std::fmt;

use crate::series::Series;

/// Overlap in milliseconds between every anchor (row) and candidate (column)
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapMatrix {
    rows: usize,
    columns: usize,
    overlap: Vec<Vec<u64>>,
    scaled: Vec<Vec<f64>>,
}

impl OverlapMatrix {
    /// Compute raw and column-scaled overlap.
    ///
    /// Each column of the scaled matrix is divided by its maximum; an
    /// all-zero column is divided by 1 and stays zero.
    pub fn compute(anchor: &Series, candidate: &Series) -> Self {
        let overlap: Vec<Vec<u64>> = anchor
            .iter()
            .map(|a| candidate.iter().map(|c| a.overlap_ms(c)).collect())
            .collect();

        let column_max: Vec<u64> = (0..candidate.len())
            .map(|j| {
                let max = overlap.iter().map(|row| row[j]).max().unwrap_or(0);
                if max == 0 { 1 } else { max }
            })
            .collect();

        let scaled = overlap
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&column_max)
                    .map(|(&value, &max)| value as f64 / max as f64)
                    .collect()
            })
            .collect();

        Self {
            rows: anchor.len(),
            columns: candidate.len(),
            overlap,
            scaled,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Raw overlap in ms
    pub fn overlap(&self, anchor: usize, candidate: usize) -> u64 {
        self.overlap[anchor][candidate]
    }

    /// Column-normalized overlap in [0, 1]
    pub fn scaled(&self, anchor: usize, candidate: usize) -> f64 {
        self.scaled[anchor][candidate]
    }

    /// Anchor row with the largest raw overlap for `candidate`, lowest index on ties
    pub fn best_anchor(&self, candidate: usize) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (i, row) in self.overlap.iter().enumerate() {
            match best {
                Some((_, value)) if row[candidate] <= value => {}
                _ => best = Some((i, row[candidate])),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Anchor rows whose scaled overlap with `candidate` exceeds `threshold`
    pub fn rows_above(&self, candidate: usize, threshold: f64) -> Vec<usize> {
        (0..self.rows)
            .filter(|&i| self.scaled[i][candidate] > threshold)
            .collect()
    }
}

impl fmt::Display for OverlapMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Overlap (ms):")?;
        for (i, row) in self.overlap.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|v| format!("{:>6}", v)).collect();
            writeln!(f, "  [{:>3}] {}", i, cells.join(" "))?;
        }
        writeln!(f, "Scaled overlap:")?;
        for (i, row) in self.scaled.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|v| format!("{:>6.2}", v)).collect();
            writeln!(f, "  [{:>3}] {}", i, cells.join(" "))?;
        }
        Ok(())
    }
}
