//! Detection predicate: decides whether a report is anomalous.
//!
//! A predicate is a disjunction of clauses. The clauses only compare the
//! signals the authority already computed; no scoring happens here.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::authority::Report;

/// One way a report can be anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Clause {
    /// `score >= threshold`. Reports without a score never match.
    ScoreAtLeast(f64),
    /// The authority raised the boolean flag.
    Flagged,
    /// The key or one of the aliases is on the authority's blacklist.
    Blacklisted,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScoreAtLeast(t) => write!(f, "score>={t}"),
            Self::Flagged => write!(f, "flagged"),
            Self::Blacklisted => write!(f, "blacklisted"),
        }
    }
}

/// Why a report matched: the clauses that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub clauses: Vec<Clause>,
    pub score: Option<f64>,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        write!(f, "matched [{}]", names.join(", "))?;
        if let Some(score) = self.score {
            write!(f, " score={score:.3}")?;
        }
        Ok(())
    }
}

/// Logical OR over [`Clause`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPredicate {
    clauses: Vec<Clause>,
}

impl DetectionPredicate {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether any clause needs the blacklist, so the engine can skip fetching it.
    pub fn needs_blacklist(&self) -> bool {
        self.clauses.contains(&Clause::Blacklisted)
    }

    /// Replace the threshold of every score clause.
    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        for clause in &mut self.clauses {
            if let Clause::ScoreAtLeast(t) = clause {
                *t = threshold;
            }
        }
        self
    }

    /// Evaluate `report`; `None` when no clause matches.
    pub fn evaluate(&self, report: &Report, blacklist: &HashSet<String>) -> Option<Detection> {
        let fired: Vec<Clause> = self
            .clauses
            .iter()
            .copied()
            .filter(|clause| clause_matches(*clause, report, blacklist))
            .collect();
        if fired.is_empty() {
            None
        } else {
            Some(Detection {
                clauses: fired,
                score: report.score,
            })
        }
    }
}

fn clause_matches(clause: Clause, report: &Report, blacklist: &HashSet<String>) -> bool {
    match clause {
        // NaN scores compare false and never match.
        Clause::ScoreAtLeast(threshold) => report.score.is_some_and(|s| s >= threshold),
        Clause::Flagged => report.flagged,
        Clause::Blacklisted => {
            blacklist.contains(report.key.as_str())
                || report.aliases.iter().any(|a| blacklist.contains(a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_clauses() -> DetectionPredicate {
        DetectionPredicate::new(vec![
            Clause::ScoreAtLeast(0.8),
            Clause::Flagged,
            Clause::Blacklisted,
        ])
    }

    #[test]
    fn quiet_report_does_not_match() {
        let p = all_clauses();
        assert!(p.evaluate(&Report::new("a").with_score(0.2), &HashSet::new()).is_none());
        assert!(p.evaluate(&Report::new("a"), &HashSet::new()).is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        let p = all_clauses();
        let d = p
            .evaluate(&Report::new("a").with_score(0.8), &HashSet::new())
            .unwrap();
        assert_eq!(d.clauses, vec![Clause::ScoreAtLeast(0.8)]);
    }

    #[test]
    fn nan_score_never_matches() {
        let p = all_clauses();
        assert!(
            p.evaluate(&Report::new("a").with_score(f64::NAN), &HashSet::new())
                .is_none()
        );
    }

    #[test]
    fn any_clause_suffices_and_all_are_reported() {
        let p = all_clauses();
        let blacklist: HashSet<String> = ["0xbad".to_string()].into_iter().collect();
        let report = Report::new("a")
            .with_score(0.95)
            .flagged()
            .with_alias("0xbad");
        let d = p.evaluate(&report, &blacklist).unwrap();
        assert_eq!(d.clauses.len(), 3);

        let only_flag = p.evaluate(&Report::new("b").flagged(), &HashSet::new()).unwrap();
        assert_eq!(only_flag.clauses, vec![Clause::Flagged]);
    }

    #[test]
    fn blacklist_checks_key_and_aliases() {
        let p = DetectionPredicate::new(vec![Clause::Blacklisted]);
        let blacklist: HashSet<String> = ["phish.example".to_string()].into_iter().collect();
        assert!(p.evaluate(&Report::new("phish.example"), &blacklist).is_some());
        assert!(
            p.evaluate(&Report::new("tx-1").with_alias("phish.example"), &blacklist)
                .is_some()
        );
        assert!(p.evaluate(&Report::new("tx-2"), &blacklist).is_none());
        assert!(p.needs_blacklist());
        assert!(!all_clauses().with_score_threshold(0.1).clauses().is_empty());
    }

    #[test]
    fn threshold_override_applies_to_score_clauses() {
        let p = all_clauses().with_score_threshold(0.5);
        assert_eq!(p.clauses()[0], Clause::ScoreAtLeast(0.5));
        assert!(
            p.evaluate(&Report::new("a").with_score(0.6), &HashSet::new())
                .is_some()
        );
    }

    #[test]
    fn detection_display_lists_clauses() {
        let d = Detection {
            clauses: vec![Clause::ScoreAtLeast(0.8), Clause::Flagged],
            score: Some(0.91),
        };
        assert_eq!(d.to_string(), "matched [score>=0.8, flagged] score=0.910");
    }
}
