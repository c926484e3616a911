//! Persistence boundary.
//!
//! The engine components never talk to storage directly. All I/O happens at
//! the boundary through these traits, before the pure computations run.
//! [`InMemoryStore`] is the reference implementation used by the service
//! binary and the tests.
//!
//! [`BudgetRepository::update_budget`] runs its closure inside a per-budget
//! critical section and keeps the changes only when the closure succeeds, so
//! a capacity check and the spend it guards cannot interleave with another
//! request on the same budget. [`LineRepository::update_lines`] gives the same
//! guarantee for lines; a line update may charge a budget from inside its
//! closure, so locks are always taken lines first, then budget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{OvertimeBudget, OvertimeLine, Policy, Shift, TimeBlock, TimeBlockLog, WorkType};

/// Stores policy versions.
pub trait PolicyRepository: Send + Sync {
    /// Returns every stored policy version.
    fn list_policies(&self) -> EngineResult<Vec<Policy>>;

    /// Inserts a policy, or replaces the version with the same id.
    fn save_policy(&self, policy: Policy) -> EngineResult<()>;
}

/// Stores shifts.
pub trait ShiftRepository: Send + Sync {
    /// Returns the shift with `shift_id`, or `ShiftNotFound`.
    fn get_shift(&self, shift_id: &str) -> EngineResult<Shift>;

    /// Inserts or replaces a shift.
    fn save_shift(&self, shift: Shift) -> EngineResult<()>;

    /// Shifts for `employee_id` that started in `[from, to)`, oldest first.
    fn shifts_for_employee(
        &self,
        employee_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> EngineResult<Vec<Shift>>;
}

/// Append-only time block storage.
pub trait TimeBlockRepository: Send + Sync {
    /// Every block in the employee's chain, in sequence order.
    fn time_blocks(&self, employee_id: &str) -> EngineResult<Vec<TimeBlock>>;

    /// Appends a block to the employee's chain.
    fn append_time_block(
        &self,
        employee_id: &str,
        shift_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        work_type: WorkType,
        corrects: Option<Uuid>,
    ) -> EngineResult<TimeBlock>;
}

/// Stores overtime lines.
pub trait LineRepository: Send + Sync {
    /// Inserts or replaces lines.
    fn save_lines(&self, lines: &[OvertimeLine]) -> EngineResult<()>;

    /// Returns the line with `id`, or `LineNotFound`.
    fn get_line(&self, id: Uuid) -> EngineResult<OvertimeLine>;

    /// Lines produced for `shift_id`, including superseded ones.
    fn lines_for_shift(&self, shift_id: &str) -> EngineResult<Vec<OvertimeLine>>;

    /// Lines whose work date falls in `[from, to]`.
    fn lines_between(&self, from: NaiveDate, to: NaiveDate) -> EngineResult<Vec<OvertimeLine>>;

    /// Applies `update` to each line in `ids`; nothing is stored unless every update succeeds.
    ///
    /// Updates to the same line are serialized: `update` sees the line as
    /// stored by the previous writer. `update` must not call back into the
    /// line repository.
    fn update_lines(
        &self,
        ids: &[Uuid],
        update: &mut dyn FnMut(&mut OvertimeLine) -> EngineResult<()>,
    ) -> EngineResult<Vec<OvertimeLine>>;
}

/// Stores budgets.
pub trait BudgetRepository: Send + Sync {
    /// Returns every budget.
    fn list_budgets(&self) -> EngineResult<Vec<OvertimeBudget>>;

    /// Returns the budget with `id`, or `BudgetNotFound`.
    fn get_budget(&self, id: Uuid) -> EngineResult<OvertimeBudget>;

    /// Inserts or replaces a budget.
    fn save_budget(&self, budget: OvertimeBudget) -> EngineResult<()>;

    /// Runs `update` on the budget while holding its lock.
    ///
    /// The stored budget changes only if `update` returns `Ok`; the updated
    /// budget is returned.
    fn update_budget(
        &self,
        id: Uuid,
        update: &mut dyn FnMut(&mut OvertimeBudget) -> EngineResult<()>,
    ) -> EngineResult<OvertimeBudget>;
}

/// Everything the service needs from storage.
pub trait Store:
    PolicyRepository + ShiftRepository + TimeBlockRepository + LineRepository + BudgetRepository
{
}

impl<T> Store for T where
    T: PolicyRepository + ShiftRepository + TimeBlockRepository + LineRepository + BudgetRepository
{
}

/// In-memory store.
///
/// Maps are guarded by `RwLock`s; each budget additionally sits behind its
/// own `Mutex` so updates to different budgets never block each other.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    policies: RwLock<Vec<Policy>>,
    shifts: RwLock<HashMap<String, Shift>>,
    time_blocks: RwLock<HashMap<String, TimeBlockLog>>,
    lines: RwLock<Vec<OvertimeLine>>,
    budgets: RwLock<HashMap<Uuid, Arc<Mutex<OvertimeBudget>>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyRepository for InMemoryStore {
    fn list_policies(&self) -> EngineResult<Vec<Policy>> {
        Ok(self
            .policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_policy(&self, policy: Policy) -> EngineResult<()> {
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        match policies.iter_mut().find(|p| p.id == policy.id) {
            Some(existing) => *existing = policy,
            None => policies.push(policy),
        }
        Ok(())
    }
}

impl ShiftRepository for InMemoryStore {
    fn get_shift(&self, shift_id: &str) -> EngineResult<Shift> {
        self.shifts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(shift_id)
            .cloned()
            .ok_or_else(|| EngineError::ShiftNotFound {
                shift_id: shift_id.to_string(),
            })
    }

    fn save_shift(&self, shift: Shift) -> EngineResult<()> {
        self.shifts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(shift.id.clone(), shift);
        Ok(())
    }

    fn shifts_for_employee(
        &self,
        employee_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> EngineResult<Vec<Shift>> {
        let mut shifts: Vec<Shift> = self
            .shifts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.employee_id == employee_id && s.actual_start >= from && s.actual_start < to)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| s.actual_start);
        Ok(shifts)
    }
}

impl TimeBlockRepository for InMemoryStore {
    fn time_blocks(&self, employee_id: &str) -> EngineResult<Vec<TimeBlock>> {
        Ok(self
            .time_blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(employee_id)
            .map(|log| log.blocks().to_vec())
            .unwrap_or_default())
    }

    fn append_time_block(
        &self,
        employee_id: &str,
        shift_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        work_type: WorkType,
        corrects: Option<Uuid>,
    ) -> EngineResult<TimeBlock> {
        let mut logs = self.time_blocks.write().unwrap_or_else(PoisonError::into_inner);
        let log = logs
            .entry(employee_id.to_string())
            .or_insert_with(|| TimeBlockLog::new(employee_id));
        log.append(shift_id, start, end, work_type, corrects).cloned()
    }
}

impl LineRepository for InMemoryStore {
    fn save_lines(&self, new_lines: &[OvertimeLine]) -> EngineResult<()> {
        let mut lines = self.lines.write().unwrap_or_else(PoisonError::into_inner);
        for line in new_lines {
            match lines.iter_mut().find(|l| l.id == line.id) {
                Some(existing) => *existing = line.clone(),
                None => lines.push(line.clone()),
            }
        }
        Ok(())
    }

    fn get_line(&self, id: Uuid) -> EngineResult<OvertimeLine> {
        self.lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(EngineError::LineNotFound { line_id: id })
    }

    fn lines_for_shift(&self, shift_id: &str) -> EngineResult<Vec<OvertimeLine>> {
        Ok(self
            .lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.shift_id == shift_id)
            .cloned()
            .collect())
    }

    fn lines_between(&self, from: NaiveDate, to: NaiveDate) -> EngineResult<Vec<OvertimeLine>> {
        Ok(self
            .lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.work_date >= from && l.work_date <= to)
            .cloned()
            .collect())
    }

    fn update_lines(
        &self,
        ids: &[Uuid],
        update: &mut dyn FnMut(&mut OvertimeLine) -> EngineResult<()>,
    ) -> EngineResult<Vec<OvertimeLine>> {
        let mut lines = self.lines.write().unwrap_or_else(PoisonError::into_inner);
        let mut staged = Vec::with_capacity(ids.len());
        for id in ids {
            let index = lines
                .iter()
                .position(|l| l.id == *id)
                .ok_or(EngineError::LineNotFound { line_id: *id })?;
            let mut line = lines[index].clone();
            update(&mut line)?;
            staged.push((index, line));
        }
        let updated = staged.iter().map(|(_, line)| line.clone()).collect();
        for (index, line) in staged {
            lines[index] = line;
        }
        Ok(updated)
    }
}

impl InMemoryStore {
    fn budget_cell(&self, id: Uuid) -> EngineResult<Arc<Mutex<OvertimeBudget>>> {
        self.budgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(EngineError::BudgetNotFound { budget_id: id })
    }
}

impl BudgetRepository for InMemoryStore {
    fn list_budgets(&self) -> EngineResult<Vec<OvertimeBudget>> {
        let cells: Vec<Arc<Mutex<OvertimeBudget>>> = self
            .budgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut budgets: Vec<OvertimeBudget> = cells
            .iter()
            .map(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect();
        budgets.sort_by(|a, b| a.period_start.cmp(&b.period_start).then(a.name.cmp(&b.name)));
        Ok(budgets)
    }

    fn get_budget(&self, id: Uuid) -> EngineResult<OvertimeBudget> {
        let cell = self.budget_cell(id)?;
        let budget = cell.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(budget)
    }

    fn save_budget(&self, budget: OvertimeBudget) -> EngineResult<()> {
        let existing = self
            .budgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&budget.id)
            .cloned();
        match existing {
            Some(cell) => *cell.lock().unwrap_or_else(PoisonError::into_inner) = budget,
            None => {
                self.budgets
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(budget.id, Arc::new(Mutex::new(budget)));
            }
        }
        Ok(())
    }

    fn update_budget(
        &self,
        id: Uuid,
        update: &mut dyn FnMut(&mut OvertimeBudget) -> EngineResult<()>,
    ) -> EngineResult<OvertimeBudget> {
        let cell = self.budget_cell(id)?;
        let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
        let mut working = guard.clone();
        update(&mut working)?;
        *guard = working.clone();
        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapType, TransactionType};
    use rust_decimal::Decimal;
    use std::thread;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn budget() -> OvertimeBudget {
        OvertimeBudget::new(
            "org_001",
            "ICU March",
            date(2026, 3, 1),
            date(2026, 3, 31),
            CapType::Hard,
            "USD",
        )
        .for_cost_center("ICU")
        .with_amount_cap(Decimal::from(1000))
    }

    #[test]
    fn test_shift_round_trip_and_not_found() {
        let store = InMemoryStore::new();
        let shift = Shift::completed("s1", "emp_001", dt("2026-03-02 08:00:00"), dt("2026-03-02 16:00:00"));
        store.save_shift(shift.clone()).unwrap();

        assert_eq!(store.get_shift("s1").unwrap(), shift);
        assert!(matches!(
            store.get_shift("missing"),
            Err(EngineError::ShiftNotFound { .. })
        ));
    }

    #[test]
    fn test_shifts_for_employee_window_sorted() {
        let store = InMemoryStore::new();
        for (id, day) in [("s3", 4), ("s1", 2), ("s2", 3)] {
            let start = dt(&format!("2026-03-0{} 08:00:00", day));
            store
                .save_shift(Shift::completed(id, "emp_001", start, start + chrono::Duration::hours(8)))
                .unwrap();
        }
        store
            .save_shift(Shift::completed("other", "emp_002", dt("2026-03-03 08:00:00"), dt("2026-03-03 16:00:00")))
            .unwrap();

        let shifts = store
            .shifts_for_employee("emp_001", dt("2026-03-02 00:00:00"), dt("2026-03-04 00:00:00"))
            .unwrap();
        let ids: Vec<&str> = shifts.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_time_blocks_chain_per_employee() {
        let store = InMemoryStore::new();
        let first = store
            .append_time_block("emp_001", "s1", dt("2026-03-02 08:00:00"), dt("2026-03-02 12:00:00"), WorkType::Regular, None)
            .unwrap();
        let second = store
            .append_time_block("emp_001", "s1", dt("2026-03-02 12:30:00"), dt("2026-03-02 16:00:00"), WorkType::Regular, None)
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_hash, first.hash);
        assert!(store.time_blocks("emp_002").unwrap().is_empty());
    }

    #[test]
    fn test_failed_budget_update_leaves_budget_unchanged() {
        let store = InMemoryStore::new();
        let budget = budget();
        let id = budget.id;
        store.save_budget(budget).unwrap();

        let result = store.update_budget(id, &mut |b| {
            b.spend(Decimal::from(4), Decimal::from(100), None, None, date(2026, 3, 5), "test")?;
            Err(EngineError::CalculationError {
                message: "abort".to_string(),
                partial_trace: Vec::new(),
            })
        });

        assert!(result.is_err());
        let stored = store.get_budget(id).unwrap();
        assert_eq!(stored.spent_amount, Decimal::ZERO);
        assert!(stored.transactions.is_empty());
    }

    #[test]
    fn test_concurrent_spends_are_serialized() {
        let store = Arc::new(InMemoryStore::new());
        let budget = budget();
        let id = budget.id;
        store.save_budget(budget).unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .update_budget(id, &mut |b| {
                            b.spend(Decimal::ONE, Decimal::from(10), None, None, date(2026, 3, 5), "worker")
                                .map(|_| ())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.get_budget(id).unwrap();
        assert_eq!(stored.spent_amount, Decimal::from(200));
        assert_eq!(
            stored
                .transactions
                .iter()
                .filter(|t| t.kind == TransactionType::Spend)
                .count(),
            20
        );
    }

    #[test]
    fn test_missing_budget() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get_budget(Uuid::new_v4()),
            Err(EngineError::BudgetNotFound { .. })
        ));
    }
}
