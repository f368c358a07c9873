// Hard filter and compatibility scoring
//
// The default gate (Policy A) requires gender equality only and prices the
// remaining basic attributes as score penalties. The `strict-gate` feature
// (Policy B) additionally requires smoker, dorm building, and stay period
// equality, in which case those attributes carry no penalty term.

use gmatch_cache::{BasicProfile, MatePreference, QueueEntry, DIMENSION_COUNT};

const PENALTY: f64 = 5.0;

/// Eligibility gate; failure suppresses edge creation entirely.
#[cfg(not(feature = "strict-gate"))]
pub fn hard_filter(a: &BasicProfile, b: &BasicProfile) -> bool {
    a.gender == b.gender
}

#[cfg(feature = "strict-gate")]
pub fn hard_filter(a: &BasicProfile, b: &BasicProfile) -> bool {
    a.gender == b.gender
        && a.is_smoker == b.is_smoker
        && a.dorm_building == b.dorm_building
        && a.stay_period == b.stay_period
}

/// Directional score: weighted inverse scale distance, normalized by the
/// weight total. A zero weight total contributes 0.
fn directional(from: &QueueEntry, to: &QueueEntry) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for i in 0..DIMENSION_COUNT {
        let weight = from.weights.0[i];
        let distance = (from.survey.0[i] as f64 - to.survey.0[i] as f64).abs();
        weighted_sum += weight * (1.0 - distance / 4.0);
        weight_total += weight;
    }

    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

fn preference_penalty(pref: MatePreference, partner_has: bool) -> f64 {
    match pref {
        MatePreference::Prefer if !partner_has => PENALTY,
        MatePreference::Avoid if partner_has => PENALTY,
        _ => 0.0,
    }
}

/// Soft penalties under Policy A: 5 points per mismatched building or stay
/// period, and 5 points per violated appliance preference on either side.
#[cfg(not(feature = "strict-gate"))]
fn soft_penalty(a: &BasicProfile, b: &BasicProfile) -> f64 {
    let mut penalty = 0.0;

    if a.dorm_building != b.dorm_building {
        penalty += PENALTY;
    }
    if a.stay_period != b.stay_period {
        penalty += PENALTY;
    }

    penalty += preference_penalty(a.mate_fridge, b.has_fridge);
    penalty += preference_penalty(b.mate_fridge, a.has_fridge);
    penalty += preference_penalty(a.mate_router, b.has_router);
    penalty += preference_penalty(b.mate_router, a.has_router);

    penalty
}

#[cfg(feature = "strict-gate")]
fn soft_penalty(a: &BasicProfile, b: &BasicProfile) -> f64 {
    // Building and stay period are gated, not priced; appliance preferences
    // still apply.
    preference_penalty(a.mate_fridge, b.has_fridge)
        + preference_penalty(b.mate_fridge, a.has_fridge)
        + preference_penalty(a.mate_router, b.has_router)
        + preference_penalty(b.mate_router, a.has_router)
}

/// Symmetric compatibility in [0, 100], two fractional digits.
pub fn compatibility(u: &QueueEntry, v: &QueueEntry) -> f64 {
    let base = 100.0 * (directional(u, v) + directional(v, u)) / 2.0;
    let score = (base - soft_penalty(&u.basic, &v.basic)).clamp(0.0, 100.0);
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gmatch_cache::{Gender, SurveyVector, WeightVector};
    use uuid::Uuid;

    fn profile(gender: Gender) -> BasicProfile {
        BasicProfile {
            gender,
            dorm_building: 'G',
            stay_period: 2,
            is_smoker: false,
            has_fridge: false,
            mate_fridge: MatePreference::DontCare,
            has_router: false,
            mate_router: MatePreference::DontCare,
        }
    }

    fn entry(gender: Gender) -> QueueEntry {
        QueueEntry {
            user_id: Uuid::new_v4(),
            property_id: 1,
            survey_id: 1,
            basic: profile(gender),
            survey: SurveyVector([3; DIMENSION_COUNT]),
            weights: WeightVector([1.0; DIMENSION_COUNT]),
            priority: 0,
            registered_at: Utc::now(),
            edge_calculated: false,
        }
    }

    #[test]
    fn test_identical_entries_score_100() {
        let u = entry(Gender::Male);
        let v = entry(Gender::Male);
        assert_eq!(compatibility(&u, &v), 100.00);
    }

    #[test]
    fn test_score_symmetric() {
        let mut u = entry(Gender::Female);
        let mut v = entry(Gender::Female);
        u.survey.0[0] = 1;
        u.weights.0[3] = 1.5;
        v.survey.0[7] = 5;
        v.weights.0[7] = 0.5;
        assert_eq!(compatibility(&u, &v), compatibility(&v, &u));
    }

    #[test]
    fn test_single_dimension_distance() {
        let u = entry(Gender::Male);
        let mut v = entry(Gender::Male);
        // Distance 2 on one of 19 equally weighted dimensions:
        // S = (18 + 0.5) / 19 in both directions.
        v.survey.0[0] = 1;
        assert_eq!(compatibility(&u, &v), 97.37);
    }

    #[test]
    fn test_asymmetric_weights_average_directions() {
        let mut u = entry(Gender::Male);
        let mut v = entry(Gender::Male);
        v.survey.0[0] = 1;
        u.weights.0[0] = 1.5;
        // S(u->v) = (0.75 + 18) / 19.5, S(v->u) = (0.5 + 18) / 19.
        assert_eq!(compatibility(&u, &v), 96.76);
    }

    #[test]
    fn test_zero_weight_total_scores_zero() {
        let mut u = entry(Gender::Male);
        let mut v = entry(Gender::Male);
        u.weights = WeightVector([0.0; DIMENSION_COUNT]);
        v.weights = WeightVector([0.0; DIMENSION_COUNT]);
        assert_eq!(compatibility(&u, &v), 0.0);
    }

    #[test]
    fn test_hard_filter_rejects_gender_mismatch() {
        assert!(!hard_filter(&profile(Gender::Male), &profile(Gender::Female)));
        assert!(hard_filter(&profile(Gender::Male), &profile(Gender::Male)));
    }

    #[cfg(not(feature = "strict-gate"))]
    #[test]
    fn test_smoker_mismatch_passes_default_gate() {
        let a = profile(Gender::Male);
        let mut b = profile(Gender::Male);
        b.is_smoker = true;
        assert!(hard_filter(&a, &b));
    }

    #[cfg(feature = "strict-gate")]
    #[test]
    fn test_smoker_mismatch_fails_strict_gate() {
        let a = profile(Gender::Male);
        let mut b = profile(Gender::Male);
        b.is_smoker = true;
        assert!(!hard_filter(&a, &b));
    }

    #[cfg(not(feature = "strict-gate"))]
    #[test]
    fn test_soft_penalties_subtracted() {
        let mut u = entry(Gender::Male);
        let mut v = entry(Gender::Male);
        // Building mismatch, stay mismatch, and u prefers a fridge v lacks.
        u.basic.dorm_building = 'G';
        v.basic.dorm_building = 'I';
        u.basic.stay_period = 1;
        v.basic.stay_period = 2;
        u.basic.mate_fridge = MatePreference::Prefer;
        assert_eq!(compatibility(&u, &v), 85.00);
    }

    #[cfg(not(feature = "strict-gate"))]
    #[test]
    fn test_avoid_preference_penalized_per_side() {
        let mut u = entry(Gender::Male);
        let mut v = entry(Gender::Male);
        // Both avoid routers and both have one: two violations.
        u.basic.has_router = true;
        u.basic.mate_router = MatePreference::Avoid;
        v.basic.has_router = true;
        v.basic.mate_router = MatePreference::Avoid;
        assert_eq!(compatibility(&u, &v), 90.00);
    }

    #[cfg(not(feature = "strict-gate"))]
    #[test]
    fn test_score_clamped_at_zero() {
        let mut u = entry(Gender::Male);
        let mut v = entry(Gender::Male);
        u.survey = SurveyVector([1; DIMENSION_COUNT]);
        v.survey = SurveyVector([5; DIMENSION_COUNT]);
        // Base score 0, penalties would push it negative.
        u.basic.dorm_building = 'I';
        u.basic.stay_period = 1;
        assert_eq!(compatibility(&u, &v), 0.0);
    }
}
