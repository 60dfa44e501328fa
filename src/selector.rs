use crate::comment::Comment;
use rand::Rng;
use rand::seq::IndexedRandom;

/// Picks the most-liked comment. Ties are broken uniformly at random with no
/// secondary key, so identical input may yield a different winner per run.
///
/// The caller handles the empty case (sentinel path) before calling this.
pub fn select<'a, R: Rng + ?Sized>(candidates: &'a [Comment], rng: &mut R) -> anyhow::Result<&'a Comment> {
    let Some(max_likes) = candidates.iter().map(|c| c.likes).max() else {
        anyhow::bail!("selection invoked with no candidates");
    };

    let top: Vec<&Comment> = candidates.iter().filter(|c| c.likes == max_likes).collect();
    top.choose(rng)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no candidate carries the maximum like count"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::sample;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn single_max_always_wins() {
        let comments = vec![sample("a", 3, 1), sample("b", 11, 2), sample("c", 7, 3)];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(select(&comments, &mut rng).unwrap().author, "b");
        }
    }

    #[test]
    fn winner_always_has_max_likes() {
        let comments = vec![sample("a", 5, 1), sample("b", 9, 2), sample("c", 9, 3)];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(select(&comments, &mut rng).unwrap().likes, 9);
        }
    }

    #[test]
    fn ties_cover_every_tied_candidate() {
        let comments = vec![
            sample("a", 2, 1),
            sample("b", 4, 2),
            sample("c", 4, 3),
            sample("d", 4, 4),
            sample("e", 0, 5),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<String, usize> = HashMap::new();
        let trials = 3_000;
        for _ in 0..trials {
            let pick = select(&comments, &mut rng).unwrap();
            *counts.entry(pick.author.clone()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for author in ["b", "c", "d"] {
            let n = counts[author];
            // Expected ~1000 each; a wide band still catches a biased pick.
            assert!((700..1300).contains(&n), "{author} picked {n} times");
        }
    }

    #[test]
    fn all_zero_likes_is_a_full_tie() {
        let comments = vec![sample("a", 0, 1), sample("b", 0, 2)];
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 2];
        for _ in 0..100 {
            match select(&comments, &mut rng).unwrap().author.as_str() {
                "a" => seen[0] = true,
                _ => seen[1] = true,
            }
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(select(&[], &mut rng).is_err());
    }
}
