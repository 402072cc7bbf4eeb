//! Tracking of previously seen products across scrape cycles.
//!
//! The first successful scrape primes the tracker: everything on the page is
//! recorded and nothing is reported. From then on every scrape is compared
//! against the tracked set and yields [`Delta`]s:
//!
//! - an identifier that was not tracked is [`Delta::New`]
//! - a tracked identifier whose payload the [`ChangeDetector`] flags is [`Delta::Changed`]
//! - a tracked identifier missing from the scrape is [`Delta::Removed`]
//!
//! The tracked set is always replaced by the latest scrape, so a product
//! that drops off and comes back is reported as new again.

use crate::models::{increased_locations, StockLevels};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Lifecycle of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No successful scrape recorded yet
    Priming,
    /// Reporting differences against the tracked set
    Steady,
}

/// Whether an empty first scrape counts as priming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimingPolicy {
    /// Any successful scrape primes, even one with no products. Everything
    /// found afterwards is then reported as new.
    #[default]
    AcceptEmpty,
    /// Stay in priming until a scrape returns at least one product.
    RequireProducts,
}

impl fmt::Display for PrimingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimingPolicy::AcceptEmpty => write!(f, "accept_empty"),
            PrimingPolicy::RequireProducts => write!(f, "require_products"),
        }
    }
}

/// Decides whether a product seen in consecutive scrapes changed in a way
/// worth reporting.
pub trait ChangeDetector<P>: Send + Sync {
    fn changed(&self, previous: &P, current: &P) -> bool;
}

/// Reports only appearance and disappearance.
#[derive(Debug, Default, Clone, Copy)]
pub struct PresenceOnly;

impl<P> ChangeDetector<P> for PresenceOnly {
    fn changed(&self, _previous: &P, _current: &P) -> bool {
        false
    }
}

/// Reports a change when any location gained online or in-store stock.
///
/// An empty current snapshot means the stock could not be read and is never
/// treated as a change.
#[derive(Debug, Default, Clone, Copy)]
pub struct StockIncrease;

impl ChangeDetector<StockLevels> for StockIncrease {
    fn changed(&self, previous: &StockLevels, current: &StockLevels) -> bool {
        !current.is_empty() && !increased_locations(previous, current).is_empty()
    }
}

/// One difference between the tracked set and the latest scrape.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta<P> {
    New { id: String },
    Changed { id: String, previous: P },
    Removed { id: String, previous: P },
}

impl<P> Delta<P> {
    pub fn id(&self) -> &str {
        match self {
            Delta::New { id } | Delta::Changed { id, .. } | Delta::Removed { id, .. } => id,
        }
    }
}

/// Result of feeding one successful scrape to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation<P> {
    /// The scrape primed the tracker with this many identifiers.
    Primed { tracked: usize },
    /// Empty scrape ignored while priming under [`PrimingPolicy::RequireProducts`].
    PrimingDeferred,
    /// Differences against the previous scrape, new and changed entries in
    /// scrape order followed by removals sorted by identifier.
    Steady(Vec<Delta<P>>),
}

/// Set of identifiers seen in the last successful scrape, each with a payload.
pub struct Tracker<P> {
    entries: HashMap<String, P>,
    phase: Phase,
    policy: PrimingPolicy,
    detector: Box<dyn ChangeDetector<P>>,
}

impl<P: Clone> Tracker<P> {
    pub fn new(policy: PrimingPolicy, detector: impl ChangeDetector<P> + 'static) -> Self {
        Self { entries: HashMap::new(), phase: Phase::Priming, policy, detector: Box::new(detector) }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn policy(&self) -> PrimingPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Payload recorded for `id` by the last successful scrape.
    pub fn get(&self, id: &str) -> Option<&P> {
        self.entries.get(id)
    }

    /// Tracked identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Feeds one successful scrape. Failed scrapes must not be observed, so
    /// the tracked set stays as it was.
    ///
    /// When an identifier appears more than once, the first occurrence wins.
    pub fn observe(&mut self, items: impl IntoIterator<Item = (String, P)>) -> Observation<P> {
        let mut seen = HashSet::new();
        let current: Vec<(String, P)> =
            items.into_iter().filter(|(id, _)| seen.insert(id.clone())).collect();

        match self.phase {
            Phase::Priming => {
                if current.is_empty() && self.policy == PrimingPolicy::RequireProducts {
                    return Observation::PrimingDeferred;
                }

                self.entries = current.into_iter().collect();
                self.phase = Phase::Steady;
                Observation::Primed { tracked: self.entries.len() }
            }
            Phase::Steady => {
                let mut deltas = Vec::new();

                for (id, payload) in &current {
                    match self.entries.get(id) {
                        None => deltas.push(Delta::New { id: id.clone() }),
                        Some(previous) if self.detector.changed(previous, payload) => {
                            deltas.push(Delta::Changed { id: id.clone(), previous: previous.clone() })
                        }
                        Some(_) => {}
                    }
                }

                let mut next: HashMap<String, P> = current.into_iter().collect();

                let mut removed: Vec<(String, P)> = std::mem::take(&mut self.entries)
                    .into_iter()
                    .filter(|(id, _)| !next.contains_key(id))
                    .collect();
                removed.sort_by(|a, b| a.0.cmp(&b.0));
                deltas.extend(removed.into_iter().map(|(id, previous)| Delta::Removed { id, previous }));

                std::mem::swap(&mut self.entries, &mut next);
                Observation::Steady(deltas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockLevel;

    fn ids(list: &[&str]) -> Vec<(String, ())> {
        list.iter().map(|id| (id.to_string(), ())).collect()
    }

    fn presence(policy: PrimingPolicy) -> Tracker<()> {
        Tracker::new(policy, PresenceOnly)
    }

    fn levels(entries: &[(&str, u32, u32)]) -> StockLevels {
        entries.iter().map(|(loc, o, s)| (loc.to_string(), StockLevel::new(*o, *s))).collect()
    }

    fn new_ids<P>(observation: &Observation<P>) -> Vec<&str> {
        match observation {
            Observation::Steady(deltas) => deltas
                .iter()
                .filter(|d| matches!(d, Delta::New { .. }))
                .map(|d| d.id())
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_priming_reports_nothing() {
        let mut tracker = presence(PrimingPolicy::AcceptEmpty);
        assert_eq!(tracker.phase(), Phase::Priming);

        let observation = tracker.observe(ids(&["a", "b", "c"]));
        assert_eq!(observation, Observation::Primed { tracked: 3 });
        assert_eq!(tracker.phase(), Phase::Steady);
        assert_eq!(tracker.ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_single_new_id() {
        let mut tracker = presence(PrimingPolicy::AcceptEmpty);
        tracker.observe(ids(&["a", "b"]));

        let observation = tracker.observe(ids(&["a", "b", "new_id"]));
        assert_eq!(observation, Observation::Steady(vec![Delta::New { id: "new_id".into() }]));
        assert!(tracker.contains("new_id"));
    }

    #[test]
    fn test_identical_lists_are_idempotent() {
        let mut tracker = presence(PrimingPolicy::AcceptEmpty);
        tracker.observe(ids(&["a", "b"]));

        for _ in 0..3 {
            assert_eq!(tracker.observe(ids(&["a", "b"])), Observation::Steady(Vec::new()));
        }
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_removed_sorted_and_untracked() {
        let mut tracker = presence(PrimingPolicy::AcceptEmpty);
        tracker.observe(ids(&["z", "a", "m"]));

        let observation = tracker.observe(ids(&["m"]));
        assert_eq!(
            observation,
            Observation::Steady(vec![
                Delta::Removed { id: "a".into(), previous: () },
                Delta::Removed { id: "z".into(), previous: () },
            ])
        );
        assert_eq!(tracker.ids(), vec!["m"]);
    }

    #[test]
    fn test_reappearing_product_is_new_again() {
        let mut tracker = presence(PrimingPolicy::AcceptEmpty);
        tracker.observe(ids(&["a", "b"]));
        tracker.observe(ids(&["a"]));

        assert_eq!(new_ids(&tracker.observe(ids(&["a", "b"]))), vec!["b"]);
    }

    #[test]
    fn test_empty_priming_then_products_all_new() {
        let mut tracker = presence(PrimingPolicy::AcceptEmpty);

        assert_eq!(tracker.observe(ids(&[])), Observation::Primed { tracked: 0 });
        assert_eq!(tracker.observe(ids(&[])), Observation::Steady(Vec::new()));

        let observation = tracker.observe(ids(&["1", "2", "3", "4", "5"]));
        assert_eq!(new_ids(&observation), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_require_products_defers_priming() {
        let mut tracker = presence(PrimingPolicy::RequireProducts);

        assert_eq!(tracker.observe(ids(&[])), Observation::PrimingDeferred);
        assert_eq!(tracker.phase(), Phase::Priming);

        assert_eq!(tracker.observe(ids(&["1", "2"])), Observation::Primed { tracked: 2 });
        assert_eq!(tracker.observe(ids(&["1", "2"])), Observation::Steady(Vec::new()));
    }

    #[test]
    fn test_duplicates_first_wins() {
        let mut tracker: Tracker<u32> = Tracker::new(PrimingPolicy::AcceptEmpty, PresenceOnly);
        tracker.observe(vec![("a".to_string(), 1), ("a".to_string(), 2)]);

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("a"), Some(&1));

        let observation = tracker.observe(vec![("b".to_string(), 1), ("b".to_string(), 9)]);
        assert_eq!(new_ids(&observation), vec!["b"]);
        assert_eq!(tracker.get("b"), Some(&1));
    }

    #[test]
    fn test_stock_increase_reported_as_changed() {
        let mut tracker = Tracker::new(PrimingPolicy::AcceptEmpty, StockIncrease);
        tracker.observe(vec![("sku".to_string(), levels(&[("NSW", 0, 2)]))]);

        let observation = tracker.observe(vec![("sku".to_string(), levels(&[("NSW", 3, 2)]))]);
        assert_eq!(
            observation,
            Observation::Steady(vec![Delta::Changed {
                id: "sku".into(),
                previous: levels(&[("NSW", 0, 2)])
            }])
        );
        assert_eq!(tracker.get("sku"), Some(&levels(&[("NSW", 3, 2)])));
    }

    #[test]
    fn test_stock_decrease_is_not_a_change() {
        let mut tracker = Tracker::new(PrimingPolicy::AcceptEmpty, StockIncrease);
        tracker.observe(vec![("sku".to_string(), levels(&[("VIC", 5, 5)]))]);

        let observation = tracker.observe(vec![("sku".to_string(), levels(&[("VIC", 1, 5)]))]);
        assert_eq!(observation, Observation::Steady(Vec::new()));
    }

    #[test]
    fn test_unknown_stock_is_not_a_change() {
        assert!(!StockIncrease.changed(&levels(&[("QLD", 1, 1)]), &StockLevels::new()));
        assert!(StockIncrease.changed(&StockLevels::new(), &levels(&[("QLD", 1, 0)])));
    }

    #[test]
    fn test_priming_policy_display_and_serde() {
        assert_eq!(PrimingPolicy::default(), PrimingPolicy::AcceptEmpty);
        assert_eq!(PrimingPolicy::RequireProducts.to_string(), "require_products");

        let parsed: PrimingPolicy = serde_json::from_str("\"require_products\"").unwrap();
        assert_eq!(parsed, PrimingPolicy::RequireProducts);
    }
}
