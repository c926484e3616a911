//! Budget validation.
//!
//! [`BudgetValidator`] resolves the budget governing a cost centre or project,
//! checks capacity, records spend under a per-budget critical section and
//! projects period-end spend with [`project_budget`].

mod forecast;
mod validator;

pub use forecast::{BudgetForecast, ForecastOutlook, project_budget};
pub use validator::{BUDGET_ACTOR, BudgetAlert, BudgetCapacity, BudgetValidator, SpendRequest};
