use serde::{Deserialize, Serialize};

use crate::profile::ColorTable;

/// Per-point labels and per-color totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointClassification {
    /// Profile index for each sample, `None` for empty.
    pub labels: Vec<Option<usize>>,
    /// Count per profile, in table order.
    pub counts: Vec<u32>,
}

impl PointClassification {
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Label every sample with the first matching profile of `table`.
pub fn classify_samples(table: &ColorTable, samples: &[[u8; 3]]) -> PointClassification {
    let mut counts = vec![0u32; table.len()];
    let labels: Vec<Option<usize>> = samples
        .iter()
        .map(|&rgb| {
            let label = table.classify(rgb);
            if let Some(i) = label {
                counts[i] += 1;
            }
            label
        })
        .collect();
    PointClassification { labels, counts }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_table_order() {
        let table = ColorTable::default();
        let magenta = [233, 30, 99];
        let yellow = [255, 235, 59];
        let empty = [120, 118, 115];
        let samples = [magenta, empty, yellow, magenta, yellow, magenta, empty];
        let c = classify_samples(&table, &samples);
        assert_eq!(c.counts, vec![3, 2, 0, 0]);
        assert_eq!(c.total(), 5);
        assert_eq!(c.labels[0], Some(0));
        assert_eq!(c.labels[1], None);
        assert_eq!(c.labels[2], Some(1));
    }

    #[test]
    fn no_samples_gives_zero_counts() {
        let c = classify_samples(&ColorTable::default(), &[]);
        assert_eq!(c.counts, vec![0; 4]);
        assert!(c.labels.is_empty());
    }
}
