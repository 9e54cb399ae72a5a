//! Exam score to mastery tier

use crate::types::MasteryTier;

/// Lowest score classified as Advanced
pub const ADVANCED_MIN_SCORE: i64 = 85;

/// Lowest score classified as Intermediate
pub const INTERMEDIATE_MIN_SCORE: i64 = 55;

/// Map an overall exam score (0-100) to a mastery tier
pub fn classify(score: i64) -> MasteryTier {
    if score >= ADVANCED_MIN_SCORE {
        MasteryTier::Advanced
    } else if score >= INTERMEDIATE_MIN_SCORE {
        MasteryTier::Intermediate
    } else {
        MasteryTier::Basic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(54), MasteryTier::Basic);
        assert_eq!(classify(55), MasteryTier::Intermediate);
        assert_eq!(classify(84), MasteryTier::Intermediate);
        assert_eq!(classify(85), MasteryTier::Advanced);
    }

    #[test]
    fn test_classify_extremes() {
        assert_eq!(classify(0), MasteryTier::Basic);
        assert_eq!(classify(-10), MasteryTier::Basic);
        assert_eq!(classify(100), MasteryTier::Advanced);
        assert_eq!(classify(250), MasteryTier::Advanced);
    }

    #[test]
    fn test_classify_full_range() {
        for score in 0..=100 {
            let expected = if score < 55 {
                MasteryTier::Basic
            } else if score < 85 {
                MasteryTier::Intermediate
            } else {
                MasteryTier::Advanced
            };
            assert_eq!(classify(score), expected, "score {}", score);
        }
    }
}
