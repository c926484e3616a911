//! Append-only, hash-chained time capture.
//!
//! Every [`TimeBlock`] stores a SHA-256 hash over its content and the hash of
//! the previous block for the same employee. Blocks are never edited; a
//! correction is a new block that references the block it corrects.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Hash used as `previous_hash` for an employee's first block.
pub const TIME_BLOCK_CHAIN_GENESIS: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

const HASH_DOMAIN: &[u8] = b"overtime-time-block-v2";

/// What kind of time a block captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    /// Productive work.
    Regular,
    /// Paid break.
    PaidBreak,
    /// Unpaid break.
    UnpaidBreak,
    /// Travel between sites.
    Travel,
    /// Training.
    Training,
}

impl WorkType {
    fn as_str(self) -> &'static str {
        match self {
            WorkType::Regular => "regular",
            WorkType::PaidBreak => "paid_break",
            WorkType::UnpaidBreak => "unpaid_break",
            WorkType::Travel => "travel",
            WorkType::Training => "training",
        }
    }

    /// Returns true if time of this kind counts as worked time.
    pub fn is_paid(self) -> bool {
        !matches!(self, WorkType::UnpaidBreak)
    }
}

/// An atomic, tamper-evident time entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Block id.
    pub id: Uuid,
    /// The shift this block belongs to.
    pub shift_id: String,
    /// The employee whose chain this block extends.
    pub employee_id: String,
    /// Position in the employee's chain (starts at 1).
    pub sequence: u64,
    /// Block start.
    pub start: NaiveDateTime,
    /// Block end.
    pub end: NaiveDateTime,
    /// Kind of time captured.
    pub work_type: WorkType,
    /// The block this one corrects, if it is a correction.
    #[serde(default)]
    pub corrects: Option<Uuid>,
    /// Hash of the previous block in the chain.
    pub previous_hash: String,
    /// Hash of this block's content.
    pub hash: String,
    /// When the block was appended.
    pub created_at: DateTime<Utc>,
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Computes a block hash over every field except `hash` and `created_at`.
///
/// Strings are length-prefixed so adjacent fields cannot trade bytes.
pub fn compute_block_hash(block: &TimeBlock) -> String {
    let mut hasher = Sha256::new();
    hasher.update(HASH_DOMAIN);
    hasher.update(block.id.as_bytes());
    update_str(&mut hasher, &block.shift_id);
    update_str(&mut hasher, &block.employee_id);
    hasher.update(block.sequence.to_le_bytes());
    hasher.update(block.start.and_utc().timestamp().to_le_bytes());
    hasher.update(block.end.and_utc().timestamp().to_le_bytes());
    update_str(&mut hasher, block.work_type.as_str());
    match block.corrects {
        Some(target) => {
            hasher.update([1u8]);
            hasher.update(target.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    update_str(&mut hasher, &block.previous_hash);
    hex::encode(hasher.finalize())
}

impl TimeBlock {
    /// Recomputes the hash and compares it with the stored value.
    ///
    /// # Example
    ///
    /// ```
    /// use overtime_engine::models::{TimeBlockLog, WorkType};
    /// use chrono::NaiveDateTime;
    ///
    /// let start = NaiveDateTime::parse_from_str("2026-03-02 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
    /// let end = NaiveDateTime::parse_from_str("2026-03-02 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
    ///
    /// let mut log = TimeBlockLog::new("emp_001");
    /// let mut block = log.append("shift_001", start, end, WorkType::Regular, None).unwrap().clone();
    /// assert!(block.verify_hash());
    ///
    /// block.end = end + chrono::Duration::hours(1);
    /// assert!(!block.verify_hash());
    /// ```
    pub fn verify_hash(&self) -> bool {
        compute_block_hash(self) == self.hash
    }

    /// Duration in whole minutes (never negative).
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }
}

/// An employee's append-only block chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlockLog {
    employee_id: String,
    blocks: Vec<TimeBlock>,
}

impl TimeBlockLog {
    /// Creates an empty chain for `employee_id`.
    pub fn new(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            blocks: Vec::new(),
        }
    }

    /// Rebuilds a chain from stored blocks, verifying it.
    pub fn from_blocks(employee_id: impl Into<String>, blocks: Vec<TimeBlock>) -> EngineResult<Self> {
        let log = Self {
            employee_id: employee_id.into(),
            blocks,
        };
        verify_chain(&log.blocks)?;
        Ok(log)
    }

    /// The employee whose chain this is.
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    /// All blocks, in sequence order.
    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    /// Appends a new block to the chain and returns it.
    ///
    /// `corrects` must reference an existing block of this chain.
    pub fn append(
        &mut self,
        shift_id: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        work_type: WorkType,
        corrects: Option<Uuid>,
    ) -> EngineResult<&TimeBlock> {
        let shift_id = shift_id.into();
        if end < start {
            return Err(EngineError::InvalidTimeRange {
                shift_id,
                message: format!("time block ends ({}) before it starts ({})", end, start),
            });
        }
        if let Some(target) = corrects
            && !self.blocks.iter().any(|b| b.id == target)
        {
            return Err(EngineError::CalculationError {
                message: format!("correction target {} is not in this chain", target),
                partial_trace: Vec::new(),
            });
        }

        let (sequence, previous_hash) = match self.blocks.last() {
            Some(last) => (last.sequence + 1, last.hash.clone()),
            None => (1, TIME_BLOCK_CHAIN_GENESIS.to_string()),
        };
        let mut block = TimeBlock {
            id: Uuid::new_v4(),
            shift_id,
            employee_id: self.employee_id.clone(),
            sequence,
            start,
            end,
            work_type,
            corrects,
            previous_hash,
            hash: String::new(),
            created_at: Utc::now(),
        };
        block.hash = compute_block_hash(&block);
        self.blocks.push(block);
        let index = self.blocks.len() - 1;
        Ok(&self.blocks[index])
    }

    /// Verifies every hash and link in the chain.
    pub fn verify(&self) -> EngineResult<()> {
        verify_chain(&self.blocks)
    }

    /// Blocks for `shift_id` that have not been replaced by a correction.
    pub fn effective_blocks(&self, shift_id: &str) -> Vec<&TimeBlock> {
        effective_blocks(&self.blocks, shift_id)
    }
}

/// Verifies a sequence of blocks from one chain.
///
/// Each block's hash must recompute, sequences must strictly increase and
/// each `previous_hash` must equal the preceding block's hash. A slice that
/// starts mid-chain is accepted as long as it is internally linked.
pub fn verify_chain(blocks: &[TimeBlock]) -> EngineResult<()> {
    let mut previous: Option<&TimeBlock> = None;
    for block in blocks {
        let linked = match previous {
            Some(prev) => block.sequence > prev.sequence && block.previous_hash == prev.hash,
            None => block.sequence > 1 || block.previous_hash == TIME_BLOCK_CHAIN_GENESIS,
        };
        if !linked || !block.verify_hash() {
            return Err(EngineError::TimeBlockTampered {
                block_id: block.id,
                sequence: block.sequence,
                partial_trace: Vec::new(),
            });
        }
        previous = Some(block);
    }
    Ok(())
}

/// Blocks for `shift_id` whose content has not been superseded by a correction.
pub fn effective_blocks<'a>(blocks: &'a [TimeBlock], shift_id: &str) -> Vec<&'a TimeBlock> {
    blocks
        .iter()
        .filter(|b| b.shift_id == shift_id)
        .filter(|b| !blocks.iter().any(|other| other.corrects == Some(b.id)))
        .collect()
}
