//! Per-batch result aggregation.

use super::model::{FolderOutcome, FolderStatus};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub success_count: usize,
    pub failure_count: usize,
    /// Folders that were already empty
    pub skipped_count: usize,
    /// One line per failed folder, in request order
    pub failures: Vec<String>,
}

/// Count outcomes by status and collect failure details in input order.
pub fn aggregate(outcomes: &[FolderOutcome]) -> Summary {
    let mut s = Summary::default();
    for o in outcomes {
        match o.status {
            FolderStatus::Success => s.success_count += 1,
            FolderStatus::Empty => s.skipped_count += 1,
            _ => {
                s.failure_count += 1;
                s.failures.push(o.to_string());
            }
        }
    }
    s
}

impl Summary {
    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count + self.skipped_count
    }

    /// One-line overview, e.g. `2 folders flattened, 1 failed`.
    pub fn headline(&self) -> String {
        let noun = if self.success_count == 1 { "folder" } else { "folders" };
        let mut line = format!("{} {noun} flattened", self.success_count);
        if self.skipped_count > 0 {
            line.push_str(&format!(", {} already empty", self.skipped_count));
        }
        if self.failure_count > 0 {
            line.push_str(&format!(", {} failed", self.failure_count));
        }
        line
    }

    /// Headline followed by every failure detail.
    pub fn report(&self) -> String {
        let mut text = self.headline();
        for line in &self.failures {
            text.push_str("\n  - ");
            text.push_str(line);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_preserves_failure_order() {
        let outcomes = vec![
            FolderOutcome::new("/P/B", FolderStatus::NotAFolder),
            FolderOutcome::new("/P/A", FolderStatus::Success),
            FolderOutcome::new("/P/E", FolderStatus::Empty),
            FolderOutcome::new("/P/C", FolderStatus::DeleteFailed).with_detail("busy"),
        ];
        let s = aggregate(&outcomes);
        assert_eq!((s.success_count, s.failure_count, s.skipped_count), (1, 2, 1));
        assert_eq!(s.total(), 4);
        assert!(s.failures[0].starts_with("/P/B: not a folder"));
        assert!(s.failures[1].ends_with("(busy)"));
    }

    #[test]
    fn headline_wording() {
        let s = aggregate(&[FolderOutcome::new("/P/A", FolderStatus::Success)]);
        assert_eq!(s.headline(), "1 folder flattened");
        assert!(!s.has_failures());

        let s = aggregate(&[
            FolderOutcome::new("/P/A", FolderStatus::MoveFailed),
            FolderOutcome::new("/P/E", FolderStatus::Empty),
        ]);
        assert_eq!(s.headline(), "0 folders flattened, 1 already empty, 1 failed");
        assert_eq!(s.report().lines().count(), 2);
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(aggregate(&[]), Summary::default());
    }
}
