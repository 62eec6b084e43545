use std::collections::{BTreeMap, BTreeSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use trieseek::index::trie::Trie;
use trieseek::{Config, DocId, Document, SearchEngine, SearchOptions};

const VOCABULARY: &[&str] = &[
    "alpha", "alps", "altitude", "beta", "bet", "better", "gamma", "game", "gate",
    "delta", "deli", "omega", "omen", "sigma", "sign", "signal", "tau", "taut",
];

fn random_text(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..6);
    (0..len)
        .map(|_| *VOCABULARY.choose(rng).unwrap())
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn trie_tracks_a_reference_model() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut trie = Trie::new();
    let mut model: BTreeMap<&str, BTreeSet<DocId>> = BTreeMap::new();

    for _ in 0..2_000 {
        let word = *VOCABULARY.choose(&mut rng).unwrap();
        let doc = DocId::new(format!("doc-{}", rng.gen_range(0..12)));

        if rng.gen_bool(0.6) {
            let inserted = trie.insert(word, &doc);
            assert_eq!(inserted, model.entry(word).or_default().insert(doc.clone()));
            assert!(trie.exact_search(word).contains(&doc));
        } else {
            let removed = trie.remove(word, &doc);
            let expected = model.get_mut(word).is_some_and(|docs| docs.remove(&doc));
            assert_eq!(removed, expected);
        }
    }

    trie.validate().unwrap();
    for word in VOCABULARY {
        let expected = model.get(word).cloned().unwrap_or_default();
        assert_eq!(trie.exact_search(word), expected, "word {word}");
        let fuzzy: BTreeSet<DocId> = trie
            .fuzzy_search(word, 0)
            .into_iter()
            .flat_map(|m| m.document_refs)
            .collect();
        assert_eq!(fuzzy, expected, "fuzzy word {word}");
    }

    let live_words = model.values().filter(|docs| !docs.is_empty()).count();
    assert_eq!(trie.stats().word_count, live_words);
}

#[test]
fn removed_documents_leave_no_trace() {
    let mut rng = StdRng::seed_from_u64(11);
    let engine = SearchEngine::new(Config::default()).unwrap();
    let mut live: Vec<DocId> = Vec::new();

    for step in 0..300 {
        match rng.gen_range(0..3) {
            0 | 1 => {
                let id = DocId::new(format!("doc-{step}"));
                engine.add_document(Document::new(id.clone()).with_field("content", &random_text(&mut rng))).unwrap();
                live.push(id);
            }
            _ if !live.is_empty() => {
                let index = rng.gen_range(0..live.len());
                let id = live.swap_remove(index);
                if rng.gen_bool(0.5) {
                    assert!(engine.remove_document(&id));
                } else {
                    engine.update_document(Document::new(id.clone()).with_field("content", &random_text(&mut rng))).unwrap();
                    live.push(id);
                }
            }
            _ => {}
        }
    }

    let snapshot = engine.export_snapshot();
    snapshot.trie.validate().unwrap();

    let live_set: BTreeSet<DocId> = live.iter().cloned().collect();
    let referenced: BTreeSet<DocId> = snapshot.terms.values().flatten().cloned().collect();
    assert!(referenced.is_subset(&live_set));
    assert!(snapshot.trie.document_ids().is_subset(&live_set));
    assert_eq!(engine.len(), live.len());

    // Every remaining document is still findable by one of its own words
    for id in &live {
        let document = engine.get_document(id).unwrap();
        let first_word = document.fields["content"].split(' ').next().unwrap().to_string();
        let hits = engine
            .search(&first_word, &SearchOptions::exact().with_limit(1_000))
            .unwrap();
        assert!(hits.doc_ids().contains(id), "{id} not found by {first_word}");
    }
}
