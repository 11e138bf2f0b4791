//! Simulated verification outcomes.
//!
//! No embedding is computed. A similarity score is drawn from
//! Uniform(0.80, 0.99), rounded to three decimals, and branched on two
//! thresholds. A real matcher would replace [`OutcomeSimulator`] behind the
//! [`Verifier`] trait.

use crate::roster;
use crate::types::{InmateRecord, VerificationResult, TIMESTAMP_FORMAT};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

const SIMILARITY_DRAW_LOW: f64 = 0.80;
const SIMILARITY_DRAW_HIGH: f64 = 0.99;
const DEFAULT_MATCH_THRESHOLD: u16 = 870;
const DEFAULT_FALLBACK_THRESHOLD: u16 = 850;

/// Cosine similarity held in integer thousandths (0..=1000).
///
/// Keeping the score integral makes `floor(similarity * 100)` and the
/// threshold comparisons exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Similarity(u16);

impl Similarity {
    pub const MIN_DRAW: Similarity = Similarity(800);
    pub const MAX_DRAW: Similarity = Similarity(990);

    pub fn from_thousandths(thousandths: u16) -> Self {
        Self(thousandths.min(1000))
    }

    /// Round a raw score to three decimals. Out-of-range input is clamped to [0, 1].
    pub fn from_f64(value: f64) -> Self {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self((clamped * 1000.0).round() as u16)
    }

    /// Draw a score from Uniform(0.80, 0.99), rounded to three decimals.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_f64(rng.gen_range(SIMILARITY_DRAW_LOW..SIMILARITY_DRAW_HIGH))
    }

    pub fn thousandths(self) -> u16 {
        self.0
    }

    pub fn value(self) -> f64 {
        f64::from(self.0) / 1000.0
    }

    /// Confidence percentage, `floor(similarity * 100)`.
    pub fn confidence(self) -> u8 {
        (self.0 / 10) as u8
    }
}

/// Decision thresholds. A score strictly above `match_above` is a match; a
/// score strictly below `fallback_below` is flagged as a fallback-model result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub match_above: Similarity,
    pub fallback_below: Similarity,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            match_above: Similarity(DEFAULT_MATCH_THRESHOLD),
            fallback_below: Similarity(DEFAULT_FALLBACK_THRESHOLD),
        }
    }
}

impl Thresholds {
    /// Both bounds are rounded to the nearest thousandth, the same precision
    /// as a drawn score, so `0.8704` becomes `0.870`. Values outside
    /// `[0, 1]` are clamped and NaN becomes `0`.
    pub fn new(match_above: f64, fallback_below: f64) -> Self {
        Self {
            match_above: Similarity::from_f64(match_above),
            fallback_below: Similarity::from_f64(fallback_below),
        }
    }
}

/// Strategy for turning a capture into a verification result.
pub trait Verifier {
    fn verify(&mut self, at: DateTime<Utc>) -> VerificationResult;
}

/// Random-draw verifier over the fixed mock gallery.
pub struct OutcomeSimulator<R> {
    rng: R,
    thresholds: Thresholds,
    gallery: Vec<InmateRecord>,
}

impl<R: Rng> OutcomeSimulator<R> {
    pub fn new(rng: R, thresholds: Thresholds) -> Self {
        Self {
            rng,
            thresholds,
            gallery: roster::mock_gallery(),
        }
    }

    /// Build the result for an already drawn score.
    ///
    /// On a match one gallery record is picked uniformly at random.
    pub fn resolve(&mut self, similarity: Similarity, at: DateTime<Utc>) -> VerificationResult {
        let success = similarity > self.thresholds.match_above;
        let used_fallback = similarity < self.thresholds.fallback_below;
        let confidence = similarity.confidence();

        tracing::debug!(
            similarity = similarity.value(),
            confidence,
            success,
            used_fallback,
            "simulated verification"
        );

        let matched = if success {
            self.gallery.choose(&mut self.rng)
        } else {
            None
        };

        match matched {
            Some(inmate) => VerificationResult {
                success: true,
                inmate_id: inmate.inmate_id.clone(),
                name: inmate.name.clone(),
                confidence,
                sentence: inmate.sentence.clone(),
                last_verified: at.format(TIMESTAMP_FORMAT).to_string(),
                crime: inmate.crime.clone(),
                legal_status: inmate.legal_status.to_string(),
                cosine_similarity: similarity.value(),
                used_fallback,
            },
            None => VerificationResult {
                success: false,
                inmate_id: String::new(),
                name: String::new(),
                confidence,
                sentence: String::new(),
                last_verified: String::new(),
                crime: String::new(),
                legal_status: String::new(),
                cosine_similarity: similarity.value(),
                used_fallback,
            },
        }
    }
}

impl<R: Rng> Verifier for OutcomeSimulator<R> {
    fn verify(&mut self, at: DateTime<Utc>) -> VerificationResult {
        let similarity = Similarity::draw(&mut self.rng);
        self.resolve(similarity, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simulator(seed: u64) -> OutcomeSimulator<StdRng> {
        OutcomeSimulator::new(StdRng::seed_from_u64(seed), Thresholds::default())
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T14:30:22Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_draw_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let s = Similarity::draw(&mut rng);
            assert!(s >= Similarity::MIN_DRAW && s <= Similarity::MAX_DRAW, "{s:?}");
            assert!((0.80..=0.99).contains(&s.value()));
            assert!((80..=99).contains(&s.confidence()));
        }
    }

    #[test]
    fn test_confidence_is_floor_of_percent() {
        assert_eq!(Similarity::from_thousandths(879).confidence(), 87);
        assert_eq!(Similarity::from_thousandths(800).confidence(), 80);
        assert_eq!(Similarity::from_thousandths(990).confidence(), 99);
        assert_eq!(Similarity::from_f64(0.8149).confidence(), 81);
    }

    #[test]
    fn test_from_f64_rounds_and_clamps() {
        assert_eq!(Similarity::from_f64(0.8765).thousandths(), 877);
        assert_eq!(Similarity::from_f64(1.7).thousandths(), 1000);
        assert_eq!(Similarity::from_f64(-0.2).thousandths(), 0);
        assert_eq!(Similarity::from_f64(f64::NAN).thousandths(), 0);
    }

    #[test]
    fn test_match_threshold_is_strict() {
        let mut sim = simulator(1);
        let at_threshold = sim.resolve(Similarity::from_thousandths(870), now());
        assert!(!at_threshold.success);

        let above = sim.resolve(Similarity::from_thousandths(871), now());
        assert!(above.success);
        assert!(!above.used_fallback);
    }

    #[test]
    fn test_fallback_threshold_is_strict() {
        let mut sim = simulator(2);
        assert!(sim.resolve(Similarity::from_thousandths(849), now()).used_fallback);
        assert!(!sim.resolve(Similarity::from_thousandths(850), now()).used_fallback);
    }

    #[test]
    fn test_failure_has_empty_identity() {
        let mut sim = simulator(3);
        let result = sim.resolve(Similarity::from_thousandths(820), now());
        assert!(!result.success);
        assert!(result.used_fallback);
        assert_eq!(result.confidence, 82);
        assert!(result.inmate_id.is_empty());
        assert!(result.name.is_empty());
        assert!(result.crime.is_empty());
        assert!(result.sentence.is_empty());
        assert!(result.legal_status.is_empty());
        assert!(result.last_verified.is_empty());
    }

    #[test]
    fn test_success_attaches_gallery_record() {
        let gallery = roster::mock_gallery();
        let mut sim = simulator(4);
        let result = sim.resolve(Similarity::from_thousandths(950), now());
        assert!(result.success);
        assert_eq!(result.last_verified, "2024-01-15 14:30:22");

        let inmate = gallery
            .iter()
            .find(|i| i.inmate_id == result.inmate_id)
            .expect("matched id must come from the mock gallery");
        assert_eq!(result.name, inmate.name);
        assert_eq!(result.crime, inmate.crime);
        assert_eq!(result.sentence, inmate.sentence);
        assert_eq!(result.legal_status, inmate.legal_status.to_string());
    }

    #[test]
    fn test_random_verifications_hold_invariants() {
        let gallery = roster::mock_gallery();
        let mut sim = simulator(42);
        let mut saw_match = false;
        let mut saw_miss = false;

        for _ in 0..2_000 {
            let r = sim.verify(now());
            let s = Similarity::from_f64(r.cosine_similarity);
            assert_eq!(r.confidence, s.confidence());
            assert_eq!(r.success, r.cosine_similarity > 0.87);
            assert_eq!(r.used_fallback, r.cosine_similarity < 0.85);
            if r.success {
                saw_match = true;
                assert!(gallery.iter().any(|i| i.inmate_id == r.inmate_id && i.name == r.name));
                assert!(!r.name.is_empty());
            } else {
                saw_miss = true;
                assert!(r.inmate_id.is_empty() && r.name.is_empty());
            }
        }

        assert!(saw_match && saw_miss);
    }

    #[test]
    fn test_matches_cover_whole_gallery() {
        let mut sim = simulator(9);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let r = sim.resolve(Similarity::from_thousandths(900), now());
            seen.insert(r.inmate_id);
        }
        assert_eq!(seen.len(), roster::mock_gallery().len());
    }

    #[test]
    fn test_custom_thresholds() {
        let mut sim = OutcomeSimulator::new(StdRng::seed_from_u64(5), Thresholds::new(0.95, 0.90));
        let r = sim.resolve(Similarity::from_thousandths(920), now());
        assert!(!r.success);
        assert!(!r.used_fallback);
    }

    #[test]
    fn test_thresholds_round_to_thousandths() {
        let t = Thresholds::new(0.8704, 0.8496);
        assert_eq!(t.match_above.thousandths(), 870);
        assert_eq!(t.fallback_below.thousandths(), 850);
        assert_eq!(t, Thresholds::default());
    }
}
