//! Shuffle sequences while keeping their k-mer counts.
//!
//! The shuffle walks a random Eulerian path through the graph whose nodes
//! are the (k-1)-mers of the input and whose edges are its k-mers, as
//! ushuffle does. The first and last (k-1)-mers of the input are kept.
//!
//! The free functions draw from one process-wide random state, so every call
//! holds [`SHUFFLE_LOCK`] for the duration of the shuffle. Callers that want
//! their own reproducible stream use the `*_with_rng` variants instead.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ShuffleError {
    #[error("k-mer size must be at least 1")]
    ZeroKmerSize,

    #[error("Cannot shuffle a one-hot encoded sequence with an alphabet of {0} letters (max 8)")]
    AlphabetTooWide(usize),
}

/// Process-wide random state shared by every shuffle.
pub static SHUFFLE_LOCK: LazyLock<Mutex<StdRng>> =
    LazyLock::new(|| Mutex::new(StdRng::from_os_rng()));

fn shuffle_state() -> MutexGuard<'static, StdRng> {
    // a panic mid-shuffle leaves the rng usable
    SHUFFLE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reseed the process-wide random state.
pub fn seed(seed: u64) {
    *shuffle_state() = StdRng::seed_from_u64(seed);
}

///
/// `num_shuffles` independent shuffles of `sequence`, each with the same
/// k-mer counts as the input.
///
pub fn shuffle_string(
    sequence: &[u8],
    kmer_size: usize,
    num_shuffles: usize,
) -> Result<Vec<Vec<u8>>, ShuffleError> {
    let mut rng = shuffle_state();
    shuffle_string_with_rng(sequence, kmer_size, num_shuffles, &mut *rng)
}

pub fn shuffle_string_with_rng<R: Rng + ?Sized>(
    sequence: &[u8],
    kmer_size: usize,
    num_shuffles: usize,
    rng: &mut R,
) -> Result<Vec<Vec<u8>>, ShuffleError> {
    if kmer_size == 0 {
        return Err(ShuffleError::ZeroKmerSize);
    }
    Ok((0..num_shuffles)
        .map(|_| kmer_shuffle(sequence, kmer_size, rng))
        .collect())
}

///
/// Shuffle a one-hot encoded sequence of `L x A` rows. Each row is packed
/// into one byte (bit `i` set when column `i` is hot), so rows with several
/// or no hot columns are shuffled as letters of their own.
///
pub fn shuffle_one_hot<const A: usize>(
    one_hot: &[[f32; A]],
    kmer_size: usize,
    num_shuffles: usize,
) -> Result<Vec<Vec<[f32; A]>>, ShuffleError> {
    let mut rng = shuffle_state();
    shuffle_one_hot_with_rng(one_hot, kmer_size, num_shuffles, &mut *rng)
}

pub fn shuffle_one_hot_with_rng<const A: usize, R: Rng + ?Sized>(
    one_hot: &[[f32; A]],
    kmer_size: usize,
    num_shuffles: usize,
    rng: &mut R,
) -> Result<Vec<Vec<[f32; A]>>, ShuffleError> {
    if A > 8 {
        return Err(ShuffleError::AlphabetTooWide(A));
    }
    let packed: Vec<u8> = one_hot
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(_, v)| **v > 0.5)
                .fold(0u8, |acc, (i, _)| acc | (1 << i))
        })
        .collect();

    let shuffled = shuffle_string_with_rng(&packed, kmer_size, num_shuffles, rng)?;
    Ok(shuffled
        .into_iter()
        .map(|seq| {
            seq.into_iter()
                .map(|byte| {
                    let mut row = [0.0; A];
                    for (i, v) in row.iter_mut().enumerate() {
                        if byte & (1 << i) != 0 {
                            *v = 1.0;
                        }
                    }
                    row
                })
                .collect()
        })
        .collect())
}

fn kmer_shuffle<R: Rng + ?Sized>(sequence: &[u8], kmer_size: usize, rng: &mut R) -> Vec<u8> {
    let n = sequence.len();
    if kmer_size >= n || n < 2 {
        return sequence.to_vec();
    }
    if kmer_size == 1 {
        let mut shuffled = sequence.to_vec();
        shuffled.shuffle(rng);
        return shuffled;
    }

    // vertices are the distinct (k-1)-mers, remembered by first position
    let l = kmer_size - 1;
    let mut vertex_ids: HashMap<&[u8], usize> = HashMap::new();
    let mut vertex_pos: Vec<usize> = Vec::new();
    let mut vertex_of = Vec::with_capacity(n - l + 1);
    for pos in 0..=(n - l) {
        let word = &sequence[pos..pos + l];
        let id = *vertex_ids.entry(word).or_insert_with(|| {
            vertex_pos.push(pos);
            vertex_pos.len() - 1
        });
        vertex_of.push(id);
    }

    let num_vertices = vertex_pos.len();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); num_vertices];
    for pos in 0..(n - l) {
        edges[vertex_of[pos]].push(vertex_of[pos + 1]);
    }
    let start = vertex_of[0];
    let end = vertex_of[n - l];

    // random last-exit edges forming a tree rooted at the end vertex
    let mut in_tree = vec![false; num_vertices];
    let mut next = vec![0usize; num_vertices];
    in_tree[end] = true;
    for u in 0..num_vertices {
        let mut v = u;
        while !in_tree[v] {
            next[v] = rng.random_range(0..edges[v].len());
            v = edges[v][next[v]];
        }
        let mut v = u;
        while !in_tree[v] {
            in_tree[v] = true;
            v = edges[v][next[v]];
        }
    }

    for (v, out) in edges.iter_mut().enumerate() {
        if v == end {
            out.shuffle(rng);
        } else {
            let last = out.swap_remove(next[v]);
            out.shuffle(rng);
            out.push(last);
        }
    }

    let mut shuffled = Vec::with_capacity(n);
    shuffled.extend_from_slice(&sequence[..l]);
    let mut cursor = vec![0usize; num_vertices];
    let mut v = start;
    for _ in 0..(n - l) {
        let target = edges[v][cursor[v]];
        cursor[v] += 1;
        shuffled.push(sequence[vertex_pos[target] + l - 1]);
        v = target;
    }
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn kmer_counts(seq: &[u8], k: usize) -> HashMap<Vec<u8>, usize> {
        let mut counts = HashMap::new();
        if seq.len() >= k {
            for kmer in seq.windows(k) {
                *counts.entry(kmer.to_vec()).or_insert(0) += 1;
            }
        }
        counts
    }

    fn random_dna(rng: &mut StdRng, len: usize) -> Vec<u8> {
        (0..len).map(|_| b"ACGT"[rng.random_range(0..4)]).collect()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    fn test_shuffle_keeps_kmer_counts(#[case] k: usize) {
        let mut rng = StdRng::seed_from_u64(k as u64);
        for len in [2, 7, 50, 300] {
            let seq = random_dna(&mut rng, len);
            for shuffled in shuffle_string_with_rng(&seq, k, 5, &mut rng).unwrap() {
                assert_eq!(shuffled.len(), seq.len());
                assert_eq!(kmer_counts(&shuffled, k), kmer_counts(&seq, k));
                if k > 1 && len > k {
                    assert_eq!(shuffled[..k - 1], seq[..k - 1]);
                    assert_eq!(shuffled[len - k + 1..], seq[len - k + 1..]);
                }
            }
        }
    }

    #[rstest]
    fn test_shuffle_actually_moves_bases() {
        let mut rng = StdRng::seed_from_u64(99);
        let seq = random_dna(&mut rng, 200);
        let shuffles = shuffle_string_with_rng(&seq, 2, 10, &mut rng).unwrap();
        assert!(shuffles.iter().any(|s| *s != seq));
    }

    #[rstest]
    fn test_same_seed_same_shuffle() {
        let seq = b"ACGTTGCAACGTAGCTAGCTAGGATCCA";
        let a = shuffle_string_with_rng(seq, 2, 3, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = shuffle_string_with_rng(seq, 2, 3, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    fn test_shared_state_shuffle() {
        seed(3);
        let seq = b"AACCGGTTACGTACGT";
        let shuffles = shuffle_string(seq, 3, 4).unwrap();
        assert_eq!(shuffles.len(), 4);
        for s in shuffles {
            assert_eq!(kmer_counts(&s, 3), kmer_counts(seq, 3));
        }
        assert_eq!(shuffle_string(seq, 0, 1), Err(ShuffleError::ZeroKmerSize));
    }

    #[rstest]
    fn test_shuffle_one_hot_keeps_rows() {
        let ohe: Vec<[f32; 4]> = vec![
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 0.0],
        ];
        let shuffled = shuffle_one_hot(&ohe, 1, 2).unwrap();
        for s in shuffled {
            let mut got: Vec<String> = s.iter().map(|r| format!("{:?}", r)).collect();
            let mut want: Vec<String> = ohe.iter().map(|r| format!("{:?}", r)).collect();
            got.sort();
            want.sort();
            assert_eq!(got, want);
        }
    }

    #[rstest]
    fn test_shuffle_one_hot_wide_alphabet() {
        let ohe = vec![[0.0f32; 9]; 4];
        assert_eq!(
            shuffle_one_hot(&ohe, 1, 1),
            Err(ShuffleError::AlphabetTooWide(9))
        );
    }
}
