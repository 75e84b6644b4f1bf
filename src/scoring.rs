//! Popularity Scoring
//!
//! Pure, deterministic computation of a freshness-decayed engagement score
//! from like/view counts and post age. Recomputed eagerly after every
//! like/unlike (push model) and written to the post record and every feed
//! row that references it.

/// Popularity scorer with tunable engagement weights and decay curve.
///
/// The score is `(likes * like_weight + views * view_weight) * decay`, where
/// `decay = max(decay_floor, 1 / (1 + age_hours * decay_per_hour))`. The
/// result is monotonically increasing in engagement and decreasing in age.
#[derive(Debug, Clone)]
pub struct PopularityScorer {
    /// Weight of a single like
    pub like_weight: f64,
    /// Weight of a single view
    pub view_weight: f64,
    /// Decay rate applied per hour of age
    pub decay_per_hour: f64,
    /// Lower bound on the age decay factor
    pub decay_floor: f64,
    /// Flat score assigned to a freshly created post
    ///
    /// Intentionally not weighted by author reputation.
    pub initial_score: f64,
}

impl Default for PopularityScorer {
    fn default() -> Self {
        Self {
            like_weight: 2.0,
            view_weight: 0.1,
            decay_per_hour: 0.1,
            decay_floor: 0.1,
            initial_score: 1.0,
        }
    }
}

impl PopularityScorer {
    /// Create a scorer with the default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Age decay factor for a post of the given age in hours.
    pub fn age_decay(&self, age_hours: f64) -> f64 {
        let decay = 1.0 / (1.0 + age_hours.max(0.0) * self.decay_per_hour);
        decay.max(self.decay_floor)
    }

    /// Compute the popularity score for the given engagement and age.
    pub fn score(&self, like_count: u64, view_count: u64, age_hours: f64) -> f64 {
        let engagement =
            like_count as f64 * self.like_weight + view_count as f64 * self.view_weight;
        engagement * self.age_decay(age_hours)
    }
}
