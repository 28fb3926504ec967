//! Risk tracking
//!
//! Reviewers record a disposition per synthetic-ID pattern. A pattern is
//! either an exact synthetic ID or contains `*` wildcards: an inner `*`
//! stands for exactly one ID segment, a trailing `*` for the rest of the ID.
//! When several patterns match a risk the exact one wins, otherwise the
//! wildcard pattern with the most literal text. Matching ignores ASCII case,
//! like category lookup in the rule registry.

use crate::config::OrphanPolicy;
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::identity::{category_of, ID_SEPARATOR};
use crate::models::{Risk, RiskStatus};
use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Tracking entry as written in a model file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTrackingEntry {
    pub status: String,
    pub justification: String,
    pub ticket: String,
    /// `YYYY-MM-DD`, may be empty
    pub date: String,
    pub checked_by: String,
}

/// Validated tracking entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskTracking {
    pub pattern: String,
    pub status: RiskStatus,
    pub justification: String,
    pub ticket: String,
    pub date: Option<NaiveDate>,
    pub checked_by: String,
}

impl RiskTracking {
    pub fn parse(pattern: &str, entry: &RiskTrackingEntry) -> ThreatGraphResult<Self> {
        let context = format!("risk tracking '{}'", pattern);
        let status = entry
            .status
            .parse::<RiskStatus>()
            .map_err(|e| ThreatGraphError::config(&context, e.to_string()))?;
        let date = match entry.date.trim() {
            "" => None,
            text => Some(NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| {
                ThreatGraphError::config(&context, format!("unparseable date '{}': {}", text, e))
            })?),
        };
        Ok(Self {
            pattern: pattern.trim().to_string(),
            status,
            justification: entry.justification.trim().to_string(),
            ticket: entry.ticket.trim().to_string(),
            date,
            checked_by: entry.checked_by.trim().to_string(),
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.pattern.contains('*')
    }
}

/// Compile a wildcard pattern into an anchored regex
fn wildcard_regex(pattern: &str) -> ThreatGraphResult<Regex> {
    let (body, open_tail) = match pattern.strip_suffix('*') {
        Some(body) => (body, true),
        None => (pattern, false),
    };
    let segment = format!("[^{}]+", ID_SEPARATOR);
    let mut expression = format!("^{}", regex::escape(body).replace(r"\*", &segment));
    if open_tail {
        expression.push_str(".+");
    }
    expression.push('$');
    RegexBuilder::new(&expression)
        .case_insensitive(true)
        .build()
        .map_err(|e| ThreatGraphError::regex(e, pattern))
}

struct WildcardEntry {
    regex: Regex,
    literal_len: usize,
    tracking: RiskTracking,
}

/// All tracking entries of a model, ready for lookup
#[derive(Default)]
pub struct TrackingTable {
    /// Keyed by the lowercased pattern
    exact: BTreeMap<String, RiskTracking>,
    wildcards: Vec<WildcardEntry>,
}

impl TrackingTable {
    /// Validate entries against the set of loaded category IDs.
    ///
    /// Bad statuses, bad dates and patterns naming no loaded category are
    /// configuration errors.
    pub fn build(
        entries: &BTreeMap<String, RiskTrackingEntry>,
        known_categories: &BTreeSet<String>,
    ) -> ThreatGraphResult<Self> {
        let known_categories: BTreeSet<String> =
            known_categories.iter().map(|id| id.to_ascii_lowercase()).collect();
        let mut table = Self::default();
        for (pattern, entry) in entries {
            let tracking = RiskTracking::parse(pattern, entry)?;
            let category = category_of(&tracking.pattern);
            if tracking.is_wildcard() {
                let regex = wildcard_regex(&tracking.pattern)?;
                let category_known = if category.contains('*') {
                    let category_regex = wildcard_regex(category)?;
                    known_categories.iter().any(|known| category_regex.is_match(known))
                } else {
                    known_categories.contains(&category.to_ascii_lowercase())
                };
                if !category_known {
                    return Err(unknown_category(&tracking.pattern, category));
                }
                table.wildcards.push(WildcardEntry {
                    regex,
                    literal_len: tracking.pattern.chars().filter(|c| *c != '*').count(),
                    tracking,
                });
            } else {
                if !known_categories.contains(&category.to_ascii_lowercase()) {
                    return Err(unknown_category(&tracking.pattern, category));
                }
                let key = tracking.pattern.to_ascii_lowercase();
                if let Some(previous) = table.exact.get(&key) {
                    return Err(ThreatGraphError::config(
                        format!("risk tracking '{}'", tracking.pattern),
                        format!("same synthetic ID as '{}'", previous.pattern),
                    ));
                }
                table.exact.insert(key, tracking);
            }
        }
        log::debug!(
            "Risk tracking: {} exact and {} wildcard entries",
            table.exact.len(),
            table.wildcards.len()
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most specific entry for a synthetic ID
    pub fn lookup(&self, synthetic_id: &str) -> Option<&RiskTracking> {
        if let Some(exact) = self.exact.get(&synthetic_id.to_ascii_lowercase()) {
            return Some(exact);
        }
        let mut best: Option<&WildcardEntry> = None;
        for candidate in self.wildcards.iter().filter(|w| w.regex.is_match(synthetic_id)) {
            match best {
                Some(current) if candidate.literal_len <= current.literal_len => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|entry| &entry.tracking)
    }

    /// Attach tracking to the generated risks and collect orphans
    pub fn reconcile(&self, risks: &[Risk], policy: OrphanPolicy) -> ThreatGraphResult<Reconciliation> {
        let mut reconciliation = Reconciliation::default();
        let mut used = BTreeSet::new();
        for risk in risks {
            match self.lookup(&risk.synthetic_id) {
                Some(tracking) => {
                    log::trace!("Risk '{}' tracked by '{}'", risk.synthetic_id, tracking.pattern);
                    used.insert(tracking.pattern.clone());
                    reconciliation.tracked.insert(risk.synthetic_id.clone(), tracking.clone());
                }
                None => reconciliation.untracked.push(risk.synthetic_id.clone()),
            }
        }

        // a pattern is orphaned only when it matches nothing at all
        let matches_any = |regex: &Regex| risks.iter().any(|risk| regex.is_match(&risk.synthetic_id));
        for tracking in self.exact.values() {
            if !used.contains(&tracking.pattern) {
                reconciliation.orphaned.push(tracking.pattern.clone());
            }
        }
        for wildcard in &self.wildcards {
            if !used.contains(&wildcard.tracking.pattern) && !matches_any(&wildcard.regex) {
                reconciliation.orphaned.push(wildcard.tracking.pattern.clone());
            }
        }
        reconciliation.orphaned.sort();

        if !reconciliation.orphaned.is_empty() {
            match policy {
                OrphanPolicy::Warn => {
                    for pattern in &reconciliation.orphaned {
                        log::warn!("Risk tracking '{}' matches no generated risk", pattern);
                    }
                }
                OrphanPolicy::Ignore => {
                    log::debug!("Ignoring {} orphaned risk tracking entries", reconciliation.orphaned.len());
                }
                OrphanPolicy::Error => {
                    return Err(ThreatGraphError::OrphanedTracking(reconciliation.orphaned));
                }
            }
        }
        Ok(reconciliation)
    }
}

fn unknown_category(pattern: &str, category: &str) -> ThreatGraphError {
    ThreatGraphError::config(
        format!("risk tracking '{}'", pattern),
        format!("unknown risk category '{}'", category),
    )
}

/// Outcome of matching tracking entries against one run's risks
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    /// Synthetic ID to the entry that applies to it
    pub tracked: BTreeMap<String, RiskTracking>,
    /// Synthetic IDs without any entry, in risk order
    pub untracked: Vec<String>,
    /// Patterns that matched no generated risk
    pub orphaned: Vec<String>,
}

impl Reconciliation {
    /// Status of a risk; untracked risks are unchecked
    pub fn status_of(&self, synthetic_id: &str) -> RiskStatus {
        self.tracked
            .get(synthetic_id)
            .map(|tracking| tracking.status)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: &str) -> RiskTrackingEntry {
        RiskTrackingEntry {
            status: status.to_string(),
            justification: "reviewed".to_string(),
            date: "2024-03-01".to_string(),
            ..Default::default()
        }
    }

    fn risk(id: &str) -> Risk {
        Risk {
            category_id: category_of(id).to_string(),
            synthetic_id: id.to_string(),
            ..Default::default()
        }
    }

    fn known() -> BTreeSet<String> {
        ["category-x", "missing-vault", "xml-external-entity"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_wildcard_tracks_every_matching_risk() {
        let mut entries = BTreeMap::new();
        entries.insert("category-x@*".to_string(), entry("accepted"));
        let table = TrackingTable::build(&entries, &known()).unwrap();
        let risks = vec![risk("category-x@web"), risk("category-x@db@link")];
        let result = table.reconcile(&risks, OrphanPolicy::Error).unwrap();
        assert_eq!(result.tracked.len(), 2);
        assert!(result.untracked.is_empty());
        assert!(result.orphaned.is_empty());
        assert_eq!(result.status_of("category-x@db@link"), RiskStatus::Accepted);
    }

    #[test]
    fn test_inner_wildcard_is_one_segment() {
        let regex = wildcard_regex("category-x@*@db").unwrap();
        assert!(regex.is_match("category-x@web@db"));
        assert!(!regex.is_match("category-x@web@app@db"));
        assert!(!regex.is_match("category-x@@db"));
        assert!(!regex.is_match("other-category-x@web@db"));
    }

    #[test]
    fn test_most_specific_entry_wins() {
        let mut entries = BTreeMap::new();
        entries.insert("category-x@*".to_string(), entry("in-discussion"));
        entries.insert("category-x@web@*".to_string(), entry("in-progress"));
        entries.insert("category-x@web@db".to_string(), entry("mitigated"));
        let table = TrackingTable::build(&entries, &known()).unwrap();
        assert_eq!(table.lookup("category-x@web@db").unwrap().status, RiskStatus::Mitigated);
        assert_eq!(table.lookup("category-x@web@app").unwrap().status, RiskStatus::InProgress);
        assert_eq!(table.lookup("category-x@api").unwrap().status, RiskStatus::InDiscussion);
        assert!(table.lookup("missing-vault@db").is_none());
    }

    #[test]
    fn test_orphan_policies() {
        let mut entries = BTreeMap::new();
        entries.insert("missing-vault@db".to_string(), entry("accepted"));
        entries.insert("xml-external-entity@*".to_string(), entry("accepted"));
        let table = TrackingTable::build(&entries, &known()).unwrap();
        let risks = vec![risk("category-x@web")];

        let warned = table.reconcile(&risks, OrphanPolicy::Warn).unwrap();
        assert_eq!(warned.orphaned, vec!["missing-vault@db", "xml-external-entity@*"]);
        assert_eq!(warned.untracked, vec!["category-x@web"]);
        assert_eq!(warned.status_of("category-x@web"), RiskStatus::Unchecked);

        assert!(table.reconcile(&risks, OrphanPolicy::Ignore).is_ok());
        let err = table.reconcile(&risks, OrphanPolicy::Error).unwrap_err();
        assert!(matches!(err, ThreatGraphError::OrphanedTracking(ref patterns) if patterns.len() == 2));
    }

    #[test]
    fn test_configuration_errors() {
        let mut bad_status = BTreeMap::new();
        bad_status.insert("missing-vault@db".to_string(), entry("ignored"));
        let err = TrackingTable::build(&bad_status, &known()).err().unwrap();
        assert!(err.is_configuration());

        let mut bad_date = BTreeMap::new();
        let mut dated = entry("accepted");
        dated.date = "01/03/2024".to_string();
        bad_date.insert("missing-vault@db".to_string(), dated);
        assert!(TrackingTable::build(&bad_date, &known()).err().unwrap().is_configuration());

        let mut unknown = BTreeMap::new();
        unknown.insert("no-such-rule@*".to_string(), entry("accepted"));
        let err = TrackingTable::build(&unknown, &known()).err().unwrap();
        assert!(err.to_string().contains("no-such-rule"));
    }

    #[test]
    fn test_patterns_ignore_case() {
        let mut entries = BTreeMap::new();
        entries.insert("Missing-Vault@*".to_string(), entry("accepted"));
        entries.insert("XML-External-Entity@Web".to_string(), entry("mitigated"));
        let table = TrackingTable::build(&entries, &known()).unwrap();
        assert_eq!(table.lookup("missing-vault@db").unwrap().status, RiskStatus::Accepted);
        assert_eq!(table.lookup("xml-external-entity@web").unwrap().status, RiskStatus::Mitigated);

        let risks = vec![risk("missing-vault@db"), risk("xml-external-entity@web")];
        let result = table.reconcile(&risks, OrphanPolicy::Error).unwrap();
        assert_eq!(result.tracked.len(), 2);
        assert!(result.orphaned.is_empty());

        let mut clashing = BTreeMap::new();
        clashing.insert("missing-vault@db".to_string(), entry("accepted"));
        clashing.insert("Missing-Vault@DB".to_string(), entry("mitigated"));
        assert!(TrackingTable::build(&clashing, &known()).err().unwrap().is_configuration());
    }

    #[test]
    fn test_date_parsed() {
        let tracking = RiskTracking::parse("missing-vault@db", &entry("accepted")).unwrap();
        assert_eq!(tracking.date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}
