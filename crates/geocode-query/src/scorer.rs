//! Score fusion and deterministic ranking.

use geocode_core::models::{FeatureId, RankedResult};

/// A candidate with its component scores, before ranking
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate {
    pub id: FeatureId,
    pub text_score: f64,
    pub spatial_score: f64,
}

/// Fuses textual and spatial scores into one ranking score.
///
/// Weights are configuration-level constants, not request-level. Ranking is
/// deterministic: equal combined scores order by ascending id, which keeps
/// pagination stable and tests reproducible.
#[derive(Debug, Clone, Copy)]
pub struct CandidateScorer {
    w_text: f64,
    w_spatial: f64,
}

impl CandidateScorer {
    pub fn new(w_text: f64, w_spatial: f64) -> Self {
        Self { w_text, w_spatial }
    }

    /// Linear decay of distance within the effective radius: 1 at distance
    /// 0, 0 at the radius. Candidates beyond the radius are excluded, not
    /// scored.
    pub fn spatial_score(distance_m: f64, radius_m: f64) -> Option<f64> {
        if radius_m <= 0.0 || distance_m > radius_m {
            return None;
        }
        Some(1.0 - distance_m / radius_m)
    }

    pub fn combine(&self, text_score: f64, spatial_score: f64) -> f64 {
        self.w_text * text_score + self.w_spatial * spatial_score
    }

    /// Rank candidates by descending combined score, ties by ascending id,
    /// truncated to `limit`, with rank positions assigned.
    pub fn rank(&self, candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<RankedResult> {
        let mut scored: Vec<(ScoredCandidate, f64)> = candidates
            .into_iter()
            .map(|c| (c, self.combine(c.text_score, c.spatial_score)))
            .collect();

        scored.sort_unstable_by(|a, b| {
            b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (c, combined))| RankedResult {
                id: c.id,
                text_score: c.text_score,
                spatial_score: c.spatial_score,
                combined_score: combined,
                rank,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, text: f64, spatial: f64) -> ScoredCandidate {
        ScoredCandidate { id: FeatureId(id), text_score: text, spatial_score: spatial }
    }

    #[test]
    fn test_spatial_score_decays_linearly() {
        assert_eq!(CandidateScorer::spatial_score(0.0, 1000.0), Some(1.0));
        assert_eq!(CandidateScorer::spatial_score(500.0, 1000.0), Some(0.5));
        assert_eq!(CandidateScorer::spatial_score(1000.0, 1000.0), Some(0.0));
        assert_eq!(CandidateScorer::spatial_score(1001.0, 1000.0), None);
    }

    #[test]
    fn test_rank_orders_by_combined_score() {
        let scorer = CandidateScorer::new(0.6, 0.4);
        let results = scorer.rank(
            vec![candidate(0, 0.2, 0.2), candidate(1, 1.0, 1.0), candidate(2, 0.5, 0.5)],
            10,
        );

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, FeatureId(1));
        assert_eq!(results[1].id, FeatureId(2));
        assert_eq!(results[2].id, FeatureId(0));
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[2].rank, 2);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let scorer = CandidateScorer::new(1.0, 0.0);
        let results = scorer.rank(
            vec![candidate(7, 0.8, 0.0), candidate(3, 0.8, 0.0), candidate(5, 0.8, 0.0)],
            10,
        );
        let ids: Vec<u64> = results.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let scorer = CandidateScorer::new(0.6, 0.4);
        let input = vec![
            candidate(4, 0.3, 0.9),
            candidate(1, 0.9, 0.0),
            candidate(2, 0.3, 0.9),
            candidate(0, 0.54, 0.54),
        ];
        let first = scorer.rank(input.clone(), 10);
        let second = scorer.rank(input, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncates_to_limit() {
        let scorer = CandidateScorer::new(1.0, 0.0);
        let candidates: Vec<ScoredCandidate> =
            (0..20).map(|i| candidate(i, 1.0 - i as f64 / 20.0, 0.0)).collect();
        let results = scorer.rank(candidates, 5);
        assert_eq!(results.len(), 5);
        assert_eq!(results.last().unwrap().rank, 4);
    }
}
