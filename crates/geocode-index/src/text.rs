//! Inverted text index over tokenized attribute values.
//!
//! The matching strategy (exact, prefix, edit-distance tiers) is a private
//! concern of this module; callers see only `search`.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use geocode_core::models::{AttrValue, FeatureId, FeatureRecord};

const PREFIX_BASE: f64 = 0.75;
const FUZZY_BASE: f64 = 0.5;

/// Inverted index: normalized token -> posting list of feature ids.
pub struct TextIndex {
    postings: BTreeMap<String, Vec<FeatureId>>,
}

impl TextIndex {
    /// Build from normalized records.
    ///
    /// `fields` restricts indexing to the given attribute keys; None
    /// indexes every text attribute.
    pub fn build(records: &[FeatureRecord], fields: Option<&[String]>) -> Self {
        let mut postings: BTreeMap<String, Vec<FeatureId>> = BTreeMap::new();

        for record in records {
            for (key, value) in &record.attributes {
                if let Some(fields) = fields {
                    if !fields.iter().any(|f| f == key) {
                        continue;
                    }
                }
                let AttrValue::Text(text) = value else { continue };
                for token in tokenize(text) {
                    postings.entry(token).or_default().push(record.id);
                }
            }
        }

        for ids in postings.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        Self { postings }
    }

    /// Search the index, scoring each matched record in [0, 1].
    ///
    /// Exact token matches outrank prefix matches, which outrank fuzzy
    /// matches; within a tier the score decreases with length mismatch and
    /// (for fuzzy) edit distance. A record's score is the mean of its best
    /// per-query-token scores; records matching no token are absent.
    pub fn search(&self, text: &str, max_edits: u32) -> Vec<(FeatureId, f64)> {
        let query_tokens = tokenize(text);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut totals: HashMap<FeatureId, f64> = HashMap::new();

        for token in &query_tokens {
            let mut best: HashMap<FeatureId, f64> = HashMap::new();
            let token_len = token.chars().count();

            // Exact tier
            if let Some(ids) = self.postings.get(token) {
                for &id in ids {
                    best.insert(id, 1.0);
                }
            }

            // Prefix tier: a range scan over the sorted vocabulary
            for (candidate, ids) in self
                .postings
                .range::<str, _>((Bound::Excluded(token.as_str()), Bound::Unbounded))
                .take_while(|(candidate, _)| candidate.starts_with(token.as_str()))
            {
                let candidate_len = candidate.chars().count();
                let score = PREFIX_BASE * token_len as f64 / candidate_len as f64;
                for &id in ids {
                    merge_best(&mut best, id, score);
                }
            }

            // Fuzzy tier: vocabulary scan with a length window
            if max_edits > 0 {
                for (candidate, ids) in &self.postings {
                    let candidate_len = candidate.chars().count();
                    if candidate_len.abs_diff(token_len) > max_edits as usize {
                        continue;
                    }
                    let d = strsim::levenshtein(token, candidate) as u32;
                    if d == 0 || d > max_edits {
                        continue;
                    }
                    let len_ratio = token_len.min(candidate_len) as f64
                        / token_len.max(candidate_len) as f64;
                    let score =
                        FUZZY_BASE * (1.0 - d as f64 / (max_edits + 1) as f64) * len_ratio;
                    for &id in ids {
                        merge_best(&mut best, id, score);
                    }
                }
            }

            for (id, score) in best {
                *totals.entry(id).or_insert(0.0) += score;
            }
        }

        let divisor = query_tokens.len() as f64;
        let mut results: Vec<(FeatureId, f64)> =
            totals.into_iter().map(|(id, sum)| (id, sum / divisor)).collect();
        results.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Number of distinct tokens
    pub fn vocabulary_len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

fn merge_best(best: &mut HashMap<FeatureId, f64>, id: FeatureId, score: f64) {
    let entry = best.entry(id).or_insert(0.0);
    if score > *entry {
        *entry = score;
    }
}

/// Split into lower-cased alphanumeric runs.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
