use std::collections::BTreeMap;

use crate::schema::ImportSchema;

/// Resolved assignment of schema field keys to source CSV headers.
pub type ColumnMap = BTreeMap<String, String>;

/// Lowercase, alphanumeric-only form used for all header/keyword comparisons.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Classic two-row Levenshtein over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Score a CSV header against a field's keyword list. Exact normalized
/// matches score 100, substrings 70-90 by keyword coverage, and anything
/// else falls back to edit-distance similarity scaled to at most 70.
pub fn keyword_score(header: &str, keywords: &[&str]) -> f64 {
    let h = normalize(header);
    if h.is_empty() {
        return 0.0;
    }
    let h_len = h.chars().count();

    let mut best = 0.0f64;
    for keyword in keywords {
        let k = normalize(keyword);
        if k.is_empty() {
            continue;
        }
        let k_len = k.chars().count();

        let score = if h == k {
            100.0
        } else if h.contains(&k) {
            70.0 + 20.0 * (k_len as f64 / h_len as f64)
        } else {
            let dist = levenshtein(&h, &k) as f64;
            let similarity = 1.0 - dist / h_len.max(k_len) as f64;
            if similarity > 0.6 {
                similarity * 70.0
            } else {
                0.0
            }
        };
        if score > best {
            best = score;
        }
    }
    best
}

const MATCH_THRESHOLD: f64 = 40.0;

/// Greedily assign headers to schema fields, required fields first.
///
/// Each field takes the highest-scoring header still in the pool; a claimed
/// header is never reused. Intentionally order-dependent: a later field
/// cannot steal a header from an earlier one, even if it scores higher.
pub fn match_columns(schema: &ImportSchema, headers: &[String]) -> ColumnMap {
    let mut available: Vec<&String> = headers.iter().collect();
    let mut map = ColumnMap::new();

    let ordered = schema
        .fields
        .iter()
        .filter(|f| f.required)
        .chain(schema.fields.iter().filter(|f| !f.required));

    for field in ordered {
        let mut best: Option<(usize, f64)> = None;
        for (i, header) in available.iter().enumerate() {
            let score = keyword_score(header, field.keywords);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((i, score));
            }
        }
        if let Some((i, score)) = best {
            if score > MATCH_THRESHOLD {
                let header = available.remove(i);
                map.insert(field.key.to_string(), header.clone());
            }
        }
    }
    map
}
