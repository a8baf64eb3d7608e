use crate::account::{
    HIGHEST_FACE,
    LOWEST_FACE,
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};

/// Source of six-sided die rolls. Every face must be equally likely.
pub trait Die: Send {
    fn roll(&mut self) -> u8;
}

/// Rolls with the OS-seeded thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDie;

impl Die for ThreadDie {
    fn roll(&mut self) -> u8 {
        rand::rng().random_range(LOWEST_FACE..=HIGHEST_FACE)
    }
}

/// Deterministic rolls from a known seed, so a sequence of outcomes can be replayed
/// and audited by anyone holding the seed.
#[derive(Debug, Clone)]
pub struct SeededDie {
    rng: StdRng,
}

impl SeededDie {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Die for SeededDie {
    fn roll(&mut self) -> u8 {
        self.rng.random_range(LOWEST_FACE..=HIGHEST_FACE)
    }
}

/// Die picked at startup from the command line.
#[derive(Debug, Clone)]
pub enum ConfiguredDie {
    Thread(ThreadDie),
    Seeded(SeededDie),
}

impl ConfiguredDie {
    pub fn thread() -> Self {
        ConfiguredDie::Thread(ThreadDie)
    }

    pub fn seeded(seed: u64) -> Self {
        ConfiguredDie::Seeded(SeededDie::new(seed))
    }
}

impl Die for ConfiguredDie {
    fn roll(&mut self) -> u8 {
        match self {
            ConfiguredDie::Thread(die) => die.roll(),
            ConfiguredDie::Seeded(die) => die.roll(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const ROLLS: usize = 60_000;

    fn face_counts(die: &mut impl Die) -> [usize; 6] {
        let mut counts = [0usize; 6];
        for _ in 0..ROLLS {
            let face = die.roll();
            assert!((LOWEST_FACE..=HIGHEST_FACE).contains(&face), "rolled {face}");
            counts[usize::from(face - 1)] += 1;
        }
        counts
    }

    #[test]
    fn thread_die__rolls_every_face_about_equally_often() {
        // given
        let mut die = ThreadDie;

        // when
        let counts = face_counts(&mut die);

        // then
        let expected = ROLLS / 6;
        for (face, count) in counts.iter().enumerate() {
            let deviation = count.abs_diff(expected);
            assert!(
                deviation < expected / 10,
                "face {} rolled {count} times, expected about {expected}",
                face + 1
            );
        }
    }

    #[test]
    fn seeded_die__rolls_every_face_about_equally_often() {
        let mut die = SeededDie::new(7);

        let counts = face_counts(&mut die);

        let expected = ROLLS / 6;
        for count in counts {
            assert!(count.abs_diff(expected) < expected / 10);
        }
    }

    #[test]
    fn seeded_die__same_seed_replays_same_rolls() {
        // given
        let mut first = ConfiguredDie::seeded(42);
        let mut second = ConfiguredDie::seeded(42);

        // when
        let first_rolls: Vec<u8> = (0..32).map(|_| first.roll()).collect();
        let second_rolls: Vec<u8> = (0..32).map(|_| second.roll()).collect();

        // then
        assert_eq!(first_rolls, second_rolls);
    }
}
