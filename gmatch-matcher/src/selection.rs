// Candidate admission, deterministic ordering, and greedy pair selection
//
// Pure functions over the cycle snapshot so determinism and exclusivity are
// testable without any I/O.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use gmatch_cache::{Edge, QueueEntry};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct SelectionParams {
    /// Minimum score admitted to the greedy step.
    pub threshold: f64,
    /// When set, an edge is also admitted if either endpoint's priority has
    /// reached this floor, letting long-waiters escape the threshold.
    pub priority_bypass: Option<u32>,
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    edge: &'a Edge,
    priority_sum: u64,
}

fn endpoint_priorities(edge: &Edge, users: &HashMap<Uuid, QueueEntry>) -> Option<(u32, u32)> {
    let a = users.get(&edge.user_a)?.priority;
    let b = users.get(&edge.user_b)?.priority;
    Some((a, b))
}

fn admitted(edge: &Edge, priorities: (u32, u32), params: &SelectionParams) -> bool {
    if edge.score >= params.threshold {
        return true;
    }
    match params.priority_bypass {
        Some(floor) => priorities.0.max(priorities.1) >= floor,
        None => false,
    }
}

/// Sort key: aging first, then score, then the canonical pair so equal
/// entries always order the same way.
fn compare(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.priority_sum
        .cmp(&a.priority_sum)
        .then_with(|| b.edge.score.partial_cmp(&a.edge.score).unwrap_or(Ordering::Equal))
        .then_with(|| (a.edge.user_a, a.edge.user_b).cmp(&(b.edge.user_a, b.edge.user_b)))
}

/// Run admission, ordering, and the greedy scan over edges whose endpoints
/// are both present in `users`. No user id appears in more than one returned
/// edge.
pub fn select_pairs(
    edges: &[Edge],
    users: &HashMap<Uuid, QueueEntry>,
    params: &SelectionParams,
) -> Vec<Edge> {
    let mut candidates: Vec<Candidate<'_>> = edges
        .iter()
        .filter_map(|edge| {
            let priorities = endpoint_priorities(edge, users)?;
            admitted(edge, priorities, params).then_some(Candidate {
                edge,
                priority_sum: priorities.0 as u64 + priorities.1 as u64,
            })
        })
        .collect();

    candidates.sort_by(compare);

    let mut paired: HashSet<Uuid> = HashSet::new();
    let mut selected = Vec::new();

    for candidate in candidates {
        let edge = candidate.edge;
        if paired.contains(&edge.user_a) || paired.contains(&edge.user_b) {
            continue;
        }
        paired.insert(edge.user_a);
        paired.insert(edge.user_b);
        selected.push(edge.clone());
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gmatch_cache::{
        BasicProfile, Gender, MatePreference, SurveyVector, WeightVector, DIMENSION_COUNT,
    };

    fn entry(user_id: Uuid, priority: u32) -> QueueEntry {
        QueueEntry {
            user_id,
            property_id: 1,
            survey_id: 1,
            basic: BasicProfile {
                gender: Gender::Male,
                dorm_building: 'G',
                stay_period: 2,
                is_smoker: false,
                has_fridge: false,
                mate_fridge: MatePreference::DontCare,
                has_router: false,
                mate_router: MatePreference::DontCare,
            },
            survey: SurveyVector([3; DIMENSION_COUNT]),
            weights: WeightVector([1.0; DIMENSION_COUNT]),
            priority,
            registered_at: Utc::now(),
            edge_calculated: true,
        }
    }

    fn setup(priorities: &[u32]) -> (Vec<Uuid>, HashMap<Uuid, QueueEntry>) {
        let mut ids: Vec<Uuid> = (0..priorities.len()).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        let users = ids
            .iter()
            .zip(priorities)
            .map(|(id, p)| (*id, entry(*id, *p)))
            .collect();
        (ids, users)
    }

    const PARAMS: SelectionParams = SelectionParams {
        threshold: 80.0,
        priority_bypass: None,
    };

    #[test]
    fn test_threshold_admission() {
        let (ids, users) = setup(&[0, 0]);
        let below = Edge::new(ids[0], ids[1], 79.99, Utc::now());
        let at = Edge::new(ids[0], ids[1], 80.0, Utc::now());

        assert!(select_pairs(&[below], &users, &PARAMS).is_empty());
        assert_eq!(select_pairs(&[at], &users, &PARAMS).len(), 1);
    }

    #[test]
    fn test_priority_bypass_admits_below_threshold() {
        let (ids, users) = setup(&[10, 0]);
        let edge = Edge::new(ids[0], ids[1], 70.0, Utc::now());

        assert!(select_pairs(&[edge.clone()], &users, &PARAMS).is_empty());

        let bypass = SelectionParams {
            threshold: 80.0,
            priority_bypass: Some(10),
        };
        assert_eq!(select_pairs(&[edge], &users, &bypass).len(), 1);
    }

    #[test]
    fn test_priority_sum_outranks_score() {
        let (ids, users) = setup(&[5, 5, 0, 0]);
        let aged = Edge::new(ids[0], ids[1], 81.0, Utc::now());
        let fresh = Edge::new(ids[2], ids[3], 99.0, Utc::now());
        // Shared endpoint forces a choice between the two groups.
        let cross = Edge::new(ids[1], ids[2], 95.0, Utc::now());

        let selected = select_pairs(&[fresh.clone(), cross, aged.clone()], &users, &PARAMS);
        // Aged pair first (priority sum 10), then the fresh pair.
        assert_eq!(selected, vec![aged, fresh]);
    }

    #[test]
    fn test_exclusivity_no_duplicate_users() {
        let (ids, users) = setup(&[0, 0, 0]);
        let ab = Edge::new(ids[0], ids[1], 95.0, Utc::now());
        let ac = Edge::new(ids[0], ids[2], 90.0, Utc::now());
        let bc = Edge::new(ids[1], ids[2], 85.0, Utc::now());

        let selected = select_pairs(&[ab.clone(), ac, bc], &users, &PARAMS);
        assert_eq!(selected, vec![ab]);

        let mut seen = HashSet::new();
        for edge in &selected {
            assert!(seen.insert(edge.user_a));
            assert!(seen.insert(edge.user_b));
        }
    }

    #[test]
    fn test_deterministic_under_shuffled_input() {
        let (ids, users) = setup(&[0, 0, 0, 0]);
        let edges = vec![
            Edge::new(ids[0], ids[1], 90.0, Utc::now()),
            Edge::new(ids[2], ids[3], 90.0, Utc::now()),
            Edge::new(ids[0], ids[2], 90.0, Utc::now()),
        ];

        let mut reversed = edges.clone();
        reversed.reverse();

        assert_eq!(
            select_pairs(&edges, &users, &PARAMS),
            select_pairs(&reversed, &users, &PARAMS)
        );
    }

    #[test]
    fn test_edge_with_missing_endpoint_ignored() {
        let (ids, users) = setup(&[0]);
        let gone = Uuid::new_v4();
        let edge = Edge::new(ids[0], gone, 99.0, Utc::now());
        assert!(select_pairs(&[edge], &users, &PARAMS).is_empty());
    }
}
