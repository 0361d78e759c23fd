use sparts_types::{BlockRef, EntityFamily, EntityId};

use crate::record::StateRecord;

/// Result of history validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub family: Option<EntityFamily>,
    pub id: Option<EntityId>,
    pub version_count: usize,
    pub identity_constant: bool,
    pub links_valid: bool,
    pub blocks_decreasing: bool,
    pub terminated: bool,
    pub timestamps_ordered: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Position in the newest-first history.
    pub index: usize,
    pub block: BlockRef,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    IdentityChanged,
    BrokenLink,
    BlockNotDecreasing,
    MissingTerminal,
    TimestampOrder,
}

/// Integrity checks over a walked history (newest first).
pub struct HistoryValidator;

impl HistoryValidator {
    /// Validate a full history, which must end at a creation record.
    pub fn validate(history: &[StateRecord]) -> ValidationReport {
        let mut report = Self::validate_links(history);
        if let Some(oldest) = history.last() {
            if !oldest.is_creation() {
                report.terminated = false;
                report.violations.push(Violation {
                    index: history.len() - 1,
                    block: oldest.cur_block,
                    kind: ViolationKind::MissingTerminal,
                    description: format!(
                        "oldest version links to block {} instead of \"0\"",
                        oldest.prev_block
                    ),
                });
            }
        }
        report
    }

    /// Validate a slice of a history, such as the result of a ranged query.
    ///
    /// Consecutive entries of a ranged result are consecutive versions, so
    /// the same link checks apply; only the terminal check is skipped.
    pub fn validate_links(history: &[StateRecord]) -> ValidationReport {
        let first = history.first();
        let mut report = ValidationReport {
            family: first.map(|r| r.family),
            id: first.map(|r| r.id.clone()),
            version_count: history.len(),
            identity_constant: true,
            links_valid: true,
            blocks_decreasing: true,
            terminated: true,
            timestamps_ordered: true,
            violations: Vec::new(),
        };

        for (index, pair) in history.windows(2).enumerate() {
            let (newer, older) = (&pair[0], &pair[1]);
            let index = index + 1;

            if older.family != newer.family || older.id != newer.id {
                report.identity_constant = false;
                report.violations.push(Violation {
                    index,
                    block: older.cur_block,
                    kind: ViolationKind::IdentityChanged,
                    description: format!("{} {} follows {} {}", older.family, older.id, newer.family, newer.id),
                });
            }
            if newer.prev_block != older.cur_block {
                report.links_valid = false;
                report.violations.push(Violation {
                    index,
                    block: older.cur_block,
                    kind: ViolationKind::BrokenLink,
                    description: format!(
                        "newer version links to block {}, found version from block {}",
                        newer.prev_block, older.cur_block
                    ),
                });
            }
            if older.cur_block >= newer.cur_block {
                report.blocks_decreasing = false;
                report.violations.push(Violation {
                    index,
                    block: older.cur_block,
                    kind: ViolationKind::BlockNotDecreasing,
                    description: format!(
                        "block {} is not older than block {}",
                        older.cur_block, newer.cur_block
                    ),
                });
            }
            if older.timestamp > newer.timestamp {
                report.timestamps_ordered = false;
                report.violations.push(Violation {
                    index,
                    block: older.cur_block,
                    kind: ViolationKind::TimestampOrder,
                    description: format!(
                        "version stamped {} is older than one stamped {}",
                        older.timestamp, newer.timestamp
                    ),
                });
            }
        }
        report
    }
}
