use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::StoreError;
use crate::store::{Phrase, PhraseStore};

/// Served when nothing stored fits the requested band.
pub const DEFAULT_PHRASES: [&str; 5] = [
    "Aprender a digitar rápido é essencial",
    "A prática constante leva à perfeição",
    "Digitar sem olhar para o teclado é importante",
    "Velocidade e precisão são fundamentais",
    "Erros são oportunidades de aprendizado",
];

/// Served by the stateless endpoint when a difficulty has no phrases at all.
pub const FALLBACK_PHRASE: &str = "Digite esta frase padrão quando não há frases no banco.";
pub const FALLBACK_DIFFICULTY: i32 = 1;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Inclusive range of acceptable word counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBand {
    pub min: usize,
    pub max: usize,
}

impl WordBand {
    /// Harder difficulties and higher player levels ask for longer phrases.
    pub fn for_player(difficulty: i32, level: i32) -> Self {
        let difficulty = usize::try_from(difficulty.max(1)).unwrap_or(1);
        let level = usize::try_from(level.max(0)).unwrap_or(0);

        let min = 3 + (difficulty - 1) * 2 + level / 5;
        let max = min + 2 + level / 10;
        Self { min, max }
    }

    pub fn contains(&self, words: usize) -> bool {
        self.min <= words && words <= self.max
    }
}

/// Picks a phrase for `get_phrase`, length-banded by difficulty and player level.
///
/// Never returns an empty string: with no stored match it draws from
/// [`DEFAULT_PHRASES`].
pub fn select_phrase<R: Rng + ?Sized>(
    store: &dyn PhraseStore,
    difficulty: i32,
    level: i32,
    rng: &mut R,
) -> Result<String, StoreError> {
    let band = WordBand::for_player(difficulty, level);
    let candidates = store.query(difficulty, Some(band))?;

    if let Some(phrase) = candidates.choose(rng) {
        return Ok(phrase.text.clone());
    }

    debug!(
        "no stored phrase at difficulty {} with {}..={} words, using a default",
        difficulty, band.min, band.max
    );
    let pick = rng.gen_range(0..DEFAULT_PHRASES.len());
    Ok(DEFAULT_PHRASES[pick].to_owned())
}

/// Any stored phrase at exactly `difficulty`.
pub fn random_phrase<R: Rng + ?Sized>(
    store: &dyn PhraseStore,
    difficulty: i32,
    rng: &mut R,
) -> Result<Option<Phrase>, StoreError> {
    let candidates = store.query(difficulty, None)?;
    Ok(candidates.choose(rng).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::NewPhrase;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn phrase_of(words: usize) -> String {
        (0..words)
            .map(|i| format!("palavra{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn populated() -> MemoryStore {
        let store = MemoryStore::new();
        for difficulty in 1..=4 {
            for words in 1..=20 {
                store
                    .create(NewPhrase::new(&phrase_of(words), difficulty, None).unwrap())
                    .unwrap();
            }
        }
        store
    }

    #[test]
    fn band_grows_with_difficulty_and_level() {
        assert_eq!(WordBand::for_player(1, 0), WordBand { min: 3, max: 5 });
        assert_eq!(WordBand::for_player(2, 0), WordBand { min: 5, max: 7 });
        assert_eq!(WordBand::for_player(1, 5), WordBand { min: 4, max: 6 });
        assert_eq!(WordBand::for_player(1, 10), WordBand { min: 5, max: 8 });
        assert_eq!(WordBand::for_player(4, 20), WordBand { min: 13, max: 17 });
    }

    #[test]
    fn band_treats_out_of_range_inputs_as_the_floor() {
        assert_eq!(WordBand::for_player(0, -7), WordBand::for_player(1, 0));
    }

    #[test]
    fn band_is_inclusive() {
        let band = WordBand { min: 3, max: 5 };
        assert!(!band.contains(2));
        assert!(band.contains(3));
        assert!(band.contains(5));
        assert!(!band.contains(6));
    }

    #[test]
    fn selected_phrases_stay_inside_the_band() {
        let store = populated();
        let mut rng = StdRng::seed_from_u64(7);

        for trial in 0..200 {
            let difficulty = trial % 4 + 1;
            let level = trial % 23;
            let band = WordBand::for_player(difficulty, level);

            let text = select_phrase(&store, difficulty, level, &mut rng).unwrap();
            assert!(
                band.contains(word_count(&text)),
                "{:?} picked {} words",
                band,
                word_count(&text)
            );
            assert!(!DEFAULT_PHRASES.contains(&text.as_str()));
        }
    }

    #[test]
    fn empty_store_falls_back_to_defaults() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..50 {
            let text = select_phrase(&store, 2, 3, &mut rng).unwrap();
            assert!(!text.is_empty());
            assert!(DEFAULT_PHRASES.contains(&text.as_str()));
        }
    }

    #[test]
    fn phrases_outside_the_band_are_ignored() {
        let store = MemoryStore::new();
        store
            .create(NewPhrase::new(&phrase_of(12), 1, None).unwrap())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let text = select_phrase(&store, 1, 0, &mut rng).unwrap();
        assert!(DEFAULT_PHRASES.contains(&text.as_str()));
    }

    #[test]
    fn random_phrase_ignores_length() {
        let store = MemoryStore::new();
        let long = store
            .create(NewPhrase::new(&phrase_of(30), 3, None).unwrap())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        assert_eq!(random_phrase(&store, 3, &mut rng).unwrap(), Some(long));
        assert_eq!(random_phrase(&store, 2, &mut rng).unwrap(), None);
    }

    #[test]
    fn draws_reach_every_candidate() {
        let store = MemoryStore::new();
        for words in 3..=5 {
            store
                .create(NewPhrase::new(&phrase_of(words), 1, None).unwrap())
                .unwrap();
        }
        let mut rng = StdRng::seed_from_u64(99);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(select_phrase(&store, 1, 0, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }
}
