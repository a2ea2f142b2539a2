//! Claim evaluation - score inferred claims against gold claims.
//!
//! Matching is greedy and first-match-wins in list order, not an optimal
//! assignment: with duplicate-valued claims, order affects which specific
//! inferred claim pairs with which gold claim, but never the counts,
//! because equality is by content rather than identity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::claim::Claim;

/// A gold claim paired with the inferred claim that matched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimPair {
    pub gold: Claim,
    pub inferred: Claim,
}

/// The outcome of evaluating inferred claims against gold claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedClaims {
    pub true_positive_claims: Vec<ClaimPair>,
    pub false_positive_claims: Vec<Claim>,
    pub false_negative_claims: Vec<Claim>,
}

impl EvaluatedClaims {
    pub fn true_positive_count(&self) -> usize {
        self.true_positive_claims.len()
    }

    pub fn false_positive_count(&self) -> usize {
        self.false_positive_claims.len()
    }

    pub fn false_negative_count(&self) -> usize {
        self.false_negative_claims.len()
    }

    /// TP / (TP + FP); 0 when the denominator is 0.
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positive_count(),
            self.true_positive_count() + self.false_positive_count(),
        )
    }

    /// TP / (TP + FN); 0 when the denominator is 0.
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positive_count(),
            self.true_positive_count() + self.false_negative_count(),
        )
    }

    /// 2·TP / (2·TP + FP + FN); 0 when the denominator is 0.
    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positive_count(),
            2 * self.true_positive_count()
                + self.false_positive_count()
                + self.false_negative_count(),
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Partition a mixed set of gold and inferred claims into true-positive
/// pairs, false positives, and false negatives.
///
/// Returns `None` when the input contains no gold claims: evaluation is
/// undefined without ground truth.
pub fn evaluate_claims(claims: &[Claim]) -> Option<EvaluatedClaims> {
    // Drop repeated identifiers outright.
    let mut seen_identifiers: HashSet<&str> = HashSet::new();
    let mut gold: Vec<&Claim> = Vec::new();
    let mut inferred: Vec<&Claim> = Vec::new();
    for claim in claims {
        if !seen_identifiers.insert(&claim.identifier) {
            warn!(identifier = %claim.identifier, "dropping claim with duplicate identifier");
            continue;
        }
        if claim.gold {
            gold.push(claim);
        } else {
            inferred.push(claim);
        }
    }

    // Content-level dedup within each set, first occurrence kept.
    let gold = content_dedup(gold);
    let inferred = content_dedup(inferred);

    if gold.is_empty() {
        return None;
    }

    // Greedy one-to-one matching in claim order.
    let mut matched = vec![false; inferred.len()];
    let mut true_positive_claims = Vec::new();
    let mut false_negative_claims = Vec::new();

    for gold_claim in &gold {
        let candidate = inferred
            .iter()
            .enumerate()
            .find(|(index, inferred_claim)| {
                !matched[*index] && gold_claim.content_equals(inferred_claim)
            })
            .map(|(index, _)| index);

        match candidate {
            Some(index) => {
                matched[index] = true;
                true_positive_claims.push(ClaimPair {
                    gold: (*gold_claim).clone(),
                    inferred: inferred[index].clone(),
                });
            }
            None => false_negative_claims.push((*gold_claim).clone()),
        }
    }

    let false_positive_claims = inferred
        .iter()
        .zip(&matched)
        .filter(|(_, was_matched)| !**was_matched)
        .map(|(claim, _)| (*claim).clone())
        .collect();

    Some(EvaluatedClaims {
        true_positive_claims,
        false_positive_claims,
        false_negative_claims,
    })
}

fn content_dedup<'c>(claims: Vec<&'c Claim>) -> Vec<&'c Claim> {
    let mut unique: Vec<&Claim> = Vec::new();
    for claim in claims {
        if !unique.iter().any(|kept| kept.content_equals(claim)) {
            unique.push(claim);
        }
    }
    unique
}
