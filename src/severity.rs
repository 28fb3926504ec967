//! Severity lookup shared by every rule

use crate::models::{Impact, Likelihood, Severity};

/// Combine exploitation likelihood and impact into a severity tier.
///
/// The product of both weights (1 to 4 each) is bucketed, which keeps the
/// table monotonic along both axes.
pub fn calculate_severity(likelihood: Likelihood, impact: Impact) -> Severity {
    let result = likelihood.weight() * impact.weight();
    match result {
        0..=1 => Severity::Low,
        2..=3 => Severity::Medium,
        4..=8 => Severity::Elevated,
        9..=12 => Severity::High,
        _ => Severity::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_values() {
        assert_eq!(calculate_severity(Likelihood::Unlikely, Impact::Low), Severity::Low);
        assert_eq!(calculate_severity(Likelihood::Likely, Impact::Medium), Severity::Elevated);
        assert_eq!(calculate_severity(Likelihood::VeryLikely, Impact::High), Severity::High);
        assert_eq!(calculate_severity(Likelihood::Frequent, Impact::VeryHigh), Severity::Critical);
        assert_eq!(calculate_severity(Likelihood::Unlikely, Impact::High), Severity::Medium);
    }

    #[test]
    fn test_monotonic_in_both_axes() {
        for (li, likelihood) in Likelihood::ALL.iter().enumerate() {
            for (ii, impact) in Impact::ALL.iter().enumerate() {
                let base = calculate_severity(*likelihood, *impact);
                if let Some(next) = Likelihood::ALL.get(li + 1) {
                    assert!(
                        calculate_severity(*next, *impact) >= base,
                        "raising likelihood from {} lowered severity at impact {}",
                        likelihood,
                        impact
                    );
                }
                if let Some(next) = Impact::ALL.get(ii + 1) {
                    assert!(
                        calculate_severity(*likelihood, *next) >= base,
                        "raising impact from {} lowered severity at likelihood {}",
                        impact,
                        likelihood
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_tier_is_reachable() {
        let mut seen: Vec<Severity> = Likelihood::ALL
            .iter()
            .flat_map(|l| Impact::ALL.iter().map(move |i| calculate_severity(*l, *i)))
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen, Severity::ALL.to_vec());
    }
}
