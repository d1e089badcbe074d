use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use challenge_core::model::{CardId, ChallengeSettings, StudyCard};

/// Selection result for a challenge card-set.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    pub cards: Vec<StudyCard>,
    /// Cards that passed the category and difficulty filters.
    pub matched: usize,
    /// Cards drawn from the unfiltered pool to reach the requested size.
    pub backfilled: usize,
}

impl SelectionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Builds a challenge card-set from the full pool according to settings.
pub struct CardPoolSelector<'a> {
    settings: &'a ChallengeSettings,
}

impl<'a> CardPoolSelector<'a> {
    #[must_use]
    pub fn new(settings: &'a ChallengeSettings) -> Self {
        Self { settings }
    }

    fn is_eligible(&self, card: &StudyCard) -> bool {
        let categories = self.settings.categories();
        (categories.is_empty() || categories.contains(card.category()))
            && self.settings.difficulty().admits(card.difficulty())
    }

    /// Pick up to `cards_count` cards.
    ///
    /// Filtered cards are shuffled and truncated; if too few match, the rest is
    /// drawn at random from the unfiltered pool. The result has
    /// `min(cards_count, unique pool size)` cards and never repeats an id.
    pub fn build<R: Rng + ?Sized>(self, pool: &[StudyCard], rng: &mut R) -> SelectionPlan {
        let mut seen = HashSet::new();
        let unique: Vec<&StudyCard> = pool.iter().filter(|c| seen.insert(c.id())).collect();
        let requested = usize::try_from(self.settings.cards_count()).unwrap_or(usize::MAX);
        let target = requested.min(unique.len());

        let mut selected: Vec<&StudyCard> = unique
            .iter()
            .copied()
            .filter(|c| self.is_eligible(c))
            .collect();
        selected.shuffle(rng);
        selected.truncate(target);
        let matched = selected.len();

        let missing = target - matched;
        if missing > 0 {
            let chosen: HashSet<CardId> = selected.iter().map(|c| c.id()).collect();
            let mut rest: Vec<&StudyCard> = unique
                .iter()
                .copied()
                .filter(|c| !chosen.contains(&c.id()))
                .collect();
            rest.shuffle(rng);
            selected.extend(rest.into_iter().take(missing));
        }

        let backfilled = selected.len() - matched;
        if backfilled > 0 {
            log::debug!("backfilled {backfilled} cards from outside the filters");
        }

        SelectionPlan {
            cards: selected.into_iter().cloned().collect(),
            matched,
            backfilled,
        }
    }
}

/// Select a card-set using the caller's random source.
pub fn select_cards<R: Rng + ?Sized>(
    pool: &[StudyCard],
    settings: &ChallengeSettings,
    rng: &mut R,
) -> Vec<StudyCard> {
    CardPoolSelector::new(settings).build(pool, rng).cards
}

/// Deterministic selection for a given seed.
#[must_use]
pub fn select_cards_seeded(
    pool: &[StudyCard],
    settings: &ChallengeSettings,
    seed: u64,
) -> Vec<StudyCard> {
    let mut rng = StdRng::seed_from_u64(seed);
    select_cards(pool, settings, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use challenge_core::model::{ChallengeDifficulty, ChallengeSettingsDraft, Difficulty};

    fn card(id: u64, category: &str, difficulty: Difficulty) -> StudyCard {
        StudyCard::new(CardId::new(id), format!("Q{id}"), "A", None, category, difficulty).unwrap()
    }

    fn settings(cards_count: u32, difficulty: ChallengeDifficulty, categories: &[&str]) -> ChallengeSettings {
        ChallengeSettingsDraft {
            cards_count,
            difficulty,
            categories: categories.iter().map(|c| (*c).to_owned()).collect(),
            ..ChallengeSettingsDraft::default()
        }
        .clamp()
    }

    fn ids(cards: &[StudyCard]) -> HashSet<CardId> {
        cards.iter().map(StudyCard::id).collect()
    }

    #[test]
    fn category_shortfall_is_backfilled_from_other_categories() {
        let mut pool: Vec<StudyCard> = (1..=3).map(|i| card(i, "Cardiology", Difficulty::Easy)).collect();
        pool.extend((4..=20).map(|i| card(i, "Renal", Difficulty::Easy)));
        let cfg = settings(10, ChallengeDifficulty::Hard, &["Cardiology"]);

        let plan = CardPoolSelector::new(&cfg).build(&pool, &mut StdRng::seed_from_u64(7));

        assert_eq!(plan.total(), 10);
        assert_eq!(plan.matched, 3);
        assert_eq!(plan.backfilled, 7);
        assert_eq!(ids(&plan.cards).len(), 10);
        let cardiology = plan.cards.iter().filter(|c| c.category() == "Cardiology").count();
        assert_eq!(cardiology, 3);
        assert!(plan.cards[..3].iter().all(|c| c.category() == "Cardiology"));
    }

    #[test]
    fn small_pool_yields_whole_pool() {
        let pool: Vec<StudyCard> = (1..=3).map(|i| card(i, "Renal", Difficulty::Hard)).collect();
        let cfg = settings(10, ChallengeDifficulty::Easy, &[]);
        let cards = select_cards_seeded(&pool, &cfg, 1);
        assert_eq!(cards.len(), 3);
        assert_eq!(ids(&cards), ids(&pool));
    }

    #[test]
    fn empty_pool_yields_empty_set() {
        let cfg = settings(10, ChallengeDifficulty::Medium, &[]);
        assert!(select_cards_seeded(&[], &cfg, 3).is_empty());
    }

    #[test]
    fn medium_prefers_easy_and_medium_cards() {
        let mut pool: Vec<StudyCard> = (1..=10).map(|i| card(i, "A", Difficulty::Hard)).collect();
        pool.extend((11..=20).map(|i| card(i, "A", Difficulty::Medium)));
        pool.extend((21..=30).map(|i| card(i, "A", Difficulty::Easy)));
        let cfg = settings(15, ChallengeDifficulty::Medium, &[]);

        let cards = select_cards_seeded(&pool, &cfg, 11);
        assert_eq!(cards.len(), 15);
        assert!(cards.iter().all(|c| c.difficulty() != Difficulty::Hard));
    }

    #[test]
    fn same_seed_same_selection() {
        let pool: Vec<StudyCard> = (1..=40).map(|i| card(i, "A", Difficulty::Easy)).collect();
        let cfg = settings(12, ChallengeDifficulty::Expert, &[]);
        assert_eq!(
            select_cards_seeded(&pool, &cfg, 42),
            select_cards_seeded(&pool, &cfg, 42)
        );
    }

    #[test]
    fn duplicate_pool_ids_are_not_repeated() {
        let pool = vec![
            card(1, "A", Difficulty::Easy),
            card(1, "A", Difficulty::Easy),
            card(2, "A", Difficulty::Easy),
        ];
        let cfg = settings(5, ChallengeDifficulty::Easy, &[]);
        let cards = select_cards_seeded(&pool, &cfg, 9);
        assert_eq!(cards.len(), 2);
        assert_eq!(ids(&cards).len(), 2);
    }

    #[test]
    fn selection_size_is_min_of_count_and_pool() {
        for pool_len in [0_u64, 4, 5, 17, 40] {
            let pool: Vec<StudyCard> = (0..pool_len).map(|i| card(i, "A", Difficulty::Medium)).collect();
            for count in [5_u32, 12, 30] {
                let cfg = settings(count, ChallengeDifficulty::Easy, &["B"]);
                let cards = select_cards_seeded(&pool, &cfg, u64::from(count) + pool_len);
                let expected = (count as usize).min(pool.len());
                assert_eq!(cards.len(), expected);
                assert_eq!(ids(&cards).len(), expected);
            }
        }
    }
}
