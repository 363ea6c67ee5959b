use crate::models::{MetadataQuery, SourceCandidate};

const TITLE_MATCH_SCORE: u32 = 3;
const AUTHOR_MATCH_SCORE: u32 = 2;

fn overlaps(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

/// +3 for overlapping titles, +2 when any author overlaps
pub fn relevance(candidate: &SourceCandidate, query: &MetadataQuery) -> u32 {
    let mut score = 0;

    if candidate
        .title
        .as_deref()
        .is_some_and(|title| overlaps(title, &query.title))
    {
        score += TITLE_MATCH_SCORE;
    }

    if let Some(author) = query.author.as_deref() {
        if candidate.authors.iter().any(|a| overlaps(a, author)) {
            score += AUTHOR_MATCH_SCORE;
        }
    }

    score
}

/// Highest-scoring candidate, earliest on ties; the first result when nothing scores
pub fn pick_best(candidates: Vec<SourceCandidate>, query: &MetadataQuery) -> Option<SourceCandidate> {
    let mut best: Option<(u32, SourceCandidate)> = None;

    for candidate in candidates {
        let score = relevance(&candidate, query);
        match &best {
            Some((best_score, _)) if *best_score >= score => {}
            _ => best = Some((score, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate)
}
