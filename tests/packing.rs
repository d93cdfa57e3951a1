//! Batch partitioning behavior of the context packer

use cluster_digest::context::{ContextPacker, Delimiter, FnEstimator, TokenEstimator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn word_estimator() -> Arc<dyn TokenEstimator> {
    Arc::new(FnEstimator(|t: &str| t.split_whitespace().count()))
}

/// A text of `words` distinct-looking words, tagged so items stay tellable apart
fn text(id: usize, words: usize) -> String {
    (0..words)
        .map(|w| format!("m{}w{}", id, w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}

#[test]
fn test_batches_partition_the_input() {
    let texts: Vec<String> = (0..37).map(|i| text(i, 1 + (i * 7) % 23)).collect();
    let packer = ContextPacker::new(word_estimator(), 50).unwrap();

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let packed = packer.pack(&texts, &mut rng);

        assert!(packed.batches.iter().all(|b| !b.is_empty()));
        let all: Vec<String> = packed
            .batches
            .iter()
            .flat_map(|b| b.items.iter().cloned())
            .collect();
        assert_eq!(sorted(all), sorted(texts.clone()));
    }
}

#[test]
fn test_duplicate_texts_are_kept() {
    let texts = vec!["same words".to_string(); 5];
    let packer = ContextPacker::new(word_estimator(), 4).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let packed = packer.pack(&texts, &mut rng);

    let count: usize = packed.batches.iter().map(|b| b.len()).sum();
    assert_eq!(count, 5);
    assert_eq!(packed.len(), 3); // ceil(10 / 4)
}

#[test]
fn test_batch_count_matches_ceiling() {
    let packer = ContextPacker::new(word_estimator(), 350).unwrap();
    let texts: Vec<String> = (0..10).map(|i| text(i, 100)).collect();
    let mut rng = StdRng::seed_from_u64(5);

    let packed = packer.pack(&texts, &mut rng);
    assert_eq!(packed.len(), 3);

    let stats = packed.stats();
    let items: usize = stats.values().map(|s| s.items).sum();
    let tokens: usize = stats.values().map(|s| s.tokens).sum();
    assert_eq!(items, 10);
    assert_eq!(tokens, 1000);

    let mut sizes: Vec<usize> = stats.values().map(|s| s.items).collect();
    sizes.sort();
    assert_eq!(sizes, vec![3, 3, 4]);
}

#[test]
fn test_oversize_item_is_not_split() {
    let big = text(999, 500);
    let mut texts: Vec<String> = (0..10).map(|i| text(i, 5)).collect();
    texts.push(big.clone());

    let packer = ContextPacker::new(word_estimator(), 100).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let packed = packer.pack(&texts, &mut rng);

    // ceil(550 / 100)
    assert_eq!(packed.len(), 6);
    let holders: Vec<_> = packed
        .batches
        .iter()
        .filter(|b| b.items.contains(&big))
        .collect();
    assert_eq!(holders.len(), 1);
    assert!(holders[0].tokens >= 500);
    assert!(packed.overflowing() >= 1);
}

#[test]
fn test_same_seed_same_batches() {
    let texts: Vec<String> = (0..25).map(|i| text(i, 3 + i % 9)).collect();
    let packer = ContextPacker::new(word_estimator(), 30).unwrap();

    let first = packer.pack(&texts, &mut StdRng::seed_from_u64(99));
    let second = packer.pack(&texts, &mut StdRng::seed_from_u64(99));

    assert_eq!(first.batches, second.batches);
    assert_eq!(first.render(), second.render());
}

#[test]
fn test_empty_input_yields_no_batches() {
    let packer = ContextPacker::new(word_estimator(), 10).unwrap();
    let packed = packer.pack(&[], &mut StdRng::seed_from_u64(0));
    assert!(packed.is_empty());
    assert!(packed.render().is_empty());
}

#[test]
fn test_rendered_batches_wrap_every_item() {
    let texts: Vec<String> = (0..6).map(|i| text(i, 2)).collect();
    let packer = ContextPacker::new(word_estimator(), 5)
        .unwrap()
        .with_delimiter(Delimiter::new("msg"));
    let packed = packer.pack(&texts, &mut StdRng::seed_from_u64(3));

    for (batch, rendered) in packed.batches.iter().zip(packed.render()) {
        assert_eq!(rendered.matches("<msg>").count(), batch.len());
        assert_eq!(rendered.matches("</msg>\n").count(), batch.len());
        for item in &batch.items {
            assert!(rendered.contains(&format!("<msg>{}</msg>", item)));
        }
    }
}

#[test]
fn test_items_are_shuffled_within_a_batch() {
    let texts: Vec<String> = (1..=8).map(|words| text(words, words)).collect();
    let largest_first: Vec<String> = texts.iter().rev().cloned().collect();
    let packer = ContextPacker::new(word_estimator(), 1_000).unwrap();

    let reordered = (0..20)
        .filter(|&seed| {
            let packed = packer.pack(&texts, &mut StdRng::seed_from_u64(seed));
            assert_eq!(packed.len(), 1);
            packed.batches[0].items != largest_first
        })
        .count();

    assert!(reordered > 0, "every seed kept largest-first order");
}
