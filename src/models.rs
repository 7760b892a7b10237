use serde::{Deserialize, Serialize};

/// One distinct (foreign player id, display name, season year) triple drawn
/// from the WAR tables; the unit of work for reconciliation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WarIdentity {
    pub playerid: String,
    pub name_common: Option<String>,
    pub yearid: Option<i32>,
}

/// How a crosswalk entry was derived. Ordering reflects the strict lookup
/// priority: an id present in several sources keeps the highest tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Manually curated mapping from the override file.
    Override,
    /// Direct hit on a cross-reference column of a canonical table.
    High,
    /// Name + estimated-birth-year-window match.
    Medium,
    /// No source produced a canonical id.
    None,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Override => "override",
            MatchTier::High => "high",
            MatchTier::Medium => "medium",
            MatchTier::None => "none",
        }
    }
}

/// Run-scoped mapping for one foreign player identifier. Exactly one entry
/// exists per distinct foreign id per run; persisted only by write-back.
#[derive(Debug, Clone)]
pub struct CrosswalkEntry {
    pub canonical_id: Option<String>,
    pub tier: MatchTier,
}

impl CrosswalkEntry {
    /// Only authoritative tiers feed the cross-reference enrichment step;
    /// a fuzzy guess must never be written back as if it were curated.
    pub fn eligible_for_enrichment(&self) -> bool {
        self.canonical_id.is_some()
            && matches!(self.tier, MatchTier::Override | MatchTier::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_tier_is_never_enriched() {
        let entry = CrosswalkEntry {
            canonical_id: Some("ruthba01".into()),
            tier: MatchTier::Medium,
        };
        assert!(!entry.eligible_for_enrichment());
    }

    #[test]
    fn override_and_high_are_enriched() {
        for tier in [MatchTier::Override, MatchTier::High] {
            let entry = CrosswalkEntry {
                canonical_id: Some("ruthba01".into()),
                tier,
            };
            assert!(entry.eligible_for_enrichment());
        }
    }

    #[test]
    fn unmatched_entry_is_never_enriched() {
        let entry = CrosswalkEntry {
            canonical_id: None,
            tier: MatchTier::None,
        };
        assert!(!entry.eligible_for_enrichment());
    }
}
