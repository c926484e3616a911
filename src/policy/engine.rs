//! Policy resolution and seeding.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditRecord, Policy, Shift};
use crate::observability::{EngineEvent, SharedObserver};
use crate::repository::PolicyRepository;

use super::compliance::{ComplianceReport, validate_compliance};
use super::templates;

/// Actor recorded on seeded policies.
pub const SEED_ACTOR: &str = "policy_seed";

/// The jurisdiction and date a policy is wanted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyQuery {
    /// ISO country code.
    pub country: String,
    /// Sector.
    #[serde(default)]
    pub sector: Option<String>,
    /// State or province.
    #[serde(default)]
    pub state_province: Option<String>,
    /// Union agreement key.
    #[serde(default)]
    pub union_agreement: Option<String>,
    /// Restricts the search to policies of this organization (or shared ones).
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Date the policy must be effective on.
    pub date: NaiveDate,
}

impl PolicyQuery {
    /// A country-wide query.
    pub fn new(country: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            country: country.into(),
            sector: None,
            state_province: None,
            union_agreement: None,
            organization_id: None,
            date,
        }
    }

    /// Narrows the query to a sector.
    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Narrows the query to a state or province.
    pub fn state(mut self, state_province: impl Into<String>) -> Self {
        self.state_province = Some(state_province.into());
        self
    }

    /// Narrows the query to a union agreement.
    pub fn union_agreement(mut self, union_agreement: impl Into<String>) -> Self {
        self.union_agreement = Some(union_agreement.into());
        self
    }

    /// Restricts the query to an organization.
    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    fn matches(&self, policy: &Policy) -> bool {
        let organization_ok = match (&policy.organization_id, &self.organization_id) {
            (None, _) | (Some(_), None) => true,
            (Some(owner), Some(requested)) => owner == requested,
        };
        organization_ok
            && policy.is_effective_on(self.date)
            && policy.matches_scope(
                &self.country,
                self.sector.as_deref(),
                self.state_province.as_deref(),
                self.union_agreement.as_deref(),
            )
    }
}

/// Orders candidates: more specific first, then newer version, then later
/// effective date, then lower id so the choice is always deterministic.
fn rank(a: &Policy, b: &Policy) -> Ordering {
    b.specificity()
        .cmp(&a.specificity())
        .then(b.version.cmp(&a.version))
        .then(b.effective_from.cmp(&a.effective_from))
        .then(a.id.cmp(&b.id))
}

/// Picks the most specific policy matching `query`, returning it and the number of candidates.
///
/// # Example
///
/// ```
/// use overtime_engine::policy::{PolicyQuery, select_policy, templates};
/// use chrono::NaiveDate;
///
/// let policies = vec![templates::us_federal().unwrap(), templates::us_california().unwrap()];
/// let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
///
/// let (policy, candidates) = select_policy(&policies, &PolicyQuery::new("US", date).state("CA")).unwrap();
/// assert_eq!(policy.name, "US California Labor Code");
/// assert_eq!(candidates, 2);
///
/// let (policy, _) = select_policy(&policies, &PolicyQuery::new("US", date).state("TX")).unwrap();
/// assert_eq!(policy.name, "US Federal FLSA");
/// ```
pub fn select_policy<'a>(policies: &'a [Policy], query: &PolicyQuery) -> Option<(&'a Policy, usize)> {
    let mut candidates: Vec<&Policy> = policies.iter().filter(|p| query.matches(p)).collect();
    candidates.sort_by(|a, b| rank(a, b));
    candidates.first().map(|p| (*p, candidates.len()))
}

/// Resolves policies from a repository and seeds jurisdiction templates.
#[derive(Clone)]
pub struct PolicyEngine {
    repository: Arc<dyn PolicyRepository>,
    observer: SharedObserver,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine").finish_non_exhaustive()
    }
}

impl PolicyEngine {
    /// Creates an engine over `repository`.
    pub fn new(repository: Arc<dyn PolicyRepository>, observer: SharedObserver) -> Self {
        Self {
            repository,
            observer,
        }
    }

    /// Returns the single most specific active policy for `query`.
    ///
    /// Fails with `PolicyNotFound` when nothing matches. There is no fallback
    /// to another jurisdiction.
    pub fn find_applicable_policy(&self, query: &PolicyQuery) -> EngineResult<Policy> {
        let policies = self.repository.list_policies()?;
        match select_policy(&policies, query) {
            Some((policy, candidates)) => {
                self.observer.on_event(&EngineEvent::PolicyResolved {
                    policy_id: policy.id,
                    policy_name: policy.name.clone(),
                    version: policy.version,
                    candidates,
                });
                Ok(policy.clone())
            }
            None => {
                self.observer.on_event(&EngineEvent::PolicyNotFound {
                    country: query.country.clone(),
                    sector: query.sector.clone(),
                    date: query.date,
                });
                Err(EngineError::PolicyNotFound {
                    country: query.country.clone(),
                    sector: query.sector.clone(),
                    date: query.date,
                })
            }
        }
    }

    /// Instantiates every jurisdiction template for `organization_id`.
    ///
    /// `effective_from` overrides the templates' own start dates. Templates
    /// the organization already has (same name) are skipped, so seeding twice
    /// creates nothing new. Returns the policies created.
    pub fn seed_default_policies(
        &self,
        organization_id: &str,
        effective_from: Option<NaiveDate>,
    ) -> EngineResult<Vec<Policy>> {
        let existing = self.repository.list_policies()?;
        let mut created = Vec::new();

        for mut policy in templates::all()? {
            let already_seeded = existing.iter().any(|p| {
                p.organization_id.as_deref() == Some(organization_id) && p.name == policy.name
            });
            if already_seeded {
                continue;
            }
            policy.id = uuid::Uuid::new_v4();
            policy.organization_id = Some(organization_id.to_string());
            if let Some(from) = effective_from {
                policy.effective_from = from;
            }
            policy.audit = AuditRecord::new(SEED_ACTOR);
            policy.validate()?;
            self.repository.save_policy(policy.clone())?;
            created.push(policy);
        }

        Ok(created)
    }

    /// Closes `policy_id` and stores a successor version effective from `effective_from`.
    pub fn supersede_policy(
        &self,
        policy_id: uuid::Uuid,
        effective_from: NaiveDate,
        actor: &str,
    ) -> EngineResult<Policy> {
        let mut current = self
            .repository
            .list_policies()?
            .into_iter()
            .find(|p| p.id == policy_id)
            .ok_or_else(|| EngineError::InvalidPolicy {
                policy: policy_id.to_string(),
                message: "policy does not exist".to_string(),
            })?;
        let successor = current.supersede(effective_from, actor)?;
        self.repository.save_policy(current)?;
        self.repository.save_policy(successor.clone())?;
        Ok(successor)
    }

    /// Checks a proposed or completed shift against the policy's hard limits.
    ///
    /// Uses the shift's elapsed hours (breaks included) since limits govern
    /// time at work, not paid time.
    pub fn validate_shift(
        &self,
        shift: &Shift,
        consecutive_days: u32,
        hours_since_last_shift: Option<Decimal>,
        policy: &Policy,
    ) -> ComplianceReport {
        let hours = shift.elapsed_hours().unwrap_or(Decimal::ZERO);
        validate_compliance(hours, consecutive_days, hours_since_last_shift, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{RecordingObserver, noop};
    use crate::repository::InMemoryStore;
    use chrono::NaiveDateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_engine() -> (PolicyEngine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let engine = PolicyEngine::new(store.clone(), noop());
        engine
            .seed_default_policies("org_001", Some(date(2026, 1, 1)))
            .unwrap();
        (engine, store)
    }

    #[test]
    fn test_state_policy_beats_country_policy() {
        let (engine, _) = seeded_engine();
        let policy = engine
            .find_applicable_policy(&PolicyQuery::new("US", date(2026, 3, 2)).state("CA"))
            .unwrap();
        assert_eq!(policy.state_province.as_deref(), Some("CA"));
    }

    #[test]
    fn test_sector_policy_selected() {
        let (engine, _) = seeded_engine();
        let policy = engine
            .find_applicable_policy(&PolicyQuery::new("GB", date(2026, 3, 2)).sector("healthcare"))
            .unwrap();
        assert_eq!(policy.name, "UK NHS Agenda for Change");
    }

    /// Scenario 5: no policy for FR/GENERAL, and no fallback.
    #[test]
    fn test_unknown_jurisdiction_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = Arc::new(RecordingObserver::new());
        let engine = PolicyEngine::new(store, recorder.clone());
        engine.seed_default_policies("org_001", Some(date(2026, 1, 1))).unwrap();

        let err = engine
            .find_applicable_policy(&PolicyQuery::new("FR", date(2026, 3, 2)).sector("GENERAL"))
            .unwrap_err();

        assert!(matches!(err, EngineError::PolicyNotFound { ref country, .. } if country == "FR"));
        assert!(err.is_safety_or_hard_stop());
        assert!(matches!(
            recorder.events().last(),
            Some(EngineEvent::PolicyNotFound { .. })
        ));
    }

    #[test]
    fn test_before_effective_date_not_found() {
        let (engine, _) = seeded_engine();
        assert!(engine
            .find_applicable_policy(&PolicyQuery::new("US", date(2025, 6, 1)))
            .is_err());
    }

    #[test]
    fn test_newer_version_wins_and_closed_version_ignored() {
        let (engine, store) = seeded_engine();
        let current = engine
            .find_applicable_policy(&PolicyQuery::new("ZA", date(2026, 3, 2)))
            .unwrap();

        let successor = engine
            .supersede_policy(current.id, date(2026, 7, 1), "policy_admin")
            .unwrap();
        assert_eq!(successor.version, 2);

        let before = engine
            .find_applicable_policy(&PolicyQuery::new("ZA", date(2026, 6, 30)))
            .unwrap();
        let after = engine
            .find_applicable_policy(&PolicyQuery::new("ZA", date(2026, 7, 1)))
            .unwrap();
        assert_eq!(before.version, 1);
        assert_eq!(after.version, 2);
        assert_eq!(store.list_policies().unwrap().len(), 7);
    }

    #[test]
    fn test_equal_rank_tie_is_deterministic() {
        let mut a = templates::ng_labour().unwrap();
        let mut b = templates::ng_labour().unwrap();
        a.id = uuid::Uuid::from_u128(2);
        b.id = uuid::Uuid::from_u128(1);
        let policies = vec![a, b];

        let (chosen, candidates) =
            select_policy(&policies, &PolicyQuery::new("NG", date(2026, 3, 2))).unwrap();
        assert_eq!(candidates, 2);
        assert_eq!(chosen.id, uuid::Uuid::from_u128(1));
    }

    #[test]
    fn test_union_policy_most_specific() {
        let mut general = templates::uk_nhs().unwrap();
        general.sector = None;
        general.name = "UK general".to_string();
        let mut union = templates::uk_nhs().unwrap();
        union.union_agreement = Some("RCN".to_string());
        union.name = "UK RCN".to_string();
        let policies = vec![general, union, templates::uk_nhs().unwrap()];

        let query = PolicyQuery::new("GB", date(2026, 3, 2))
            .sector("HEALTHCARE")
            .union_agreement("RCN");
        let (chosen, candidates) = select_policy(&policies, &query).unwrap();
        assert_eq!(chosen.name, "UK RCN");
        assert_eq!(candidates, 3);
    }

    #[test]
    fn test_organization_scoping() {
        let (engine, _) = seeded_engine();
        let query = PolicyQuery::new("US", date(2026, 3, 2)).organization("org_002");
        assert!(engine.find_applicable_policy(&query).is_err());
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let (engine, store) = seeded_engine();
        let again = engine
            .seed_default_policies("org_001", Some(date(2026, 1, 1)))
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(store.list_policies().unwrap().len(), 6);

        let other = engine
            .seed_default_policies("org_002", None)
            .unwrap();
        assert_eq!(other.len(), 6);
    }

    #[test]
    fn test_validate_shift_uses_elapsed_hours() {
        let (engine, _) = seeded_engine();
        let policy = templates::uk_nhs().unwrap();
        let start = NaiveDateTime::parse_from_str("2026-03-02 07:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let shift = Shift::completed("s1", "emp_001", start, start + chrono::Duration::hours(14));

        let report = engine.validate_shift(&shift, 1, None, &policy);
        assert!(!report.compliant);
    }
}
