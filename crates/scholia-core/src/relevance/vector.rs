//! Pure numeric functions for embedding similarity.

use crate::paper::Paper;

/// Character cap for text submitted to the embedding service, keeping a
/// single input under the upstream token limit.
pub const MAX_EMBED_INPUT_CHARS: usize = 2000;

/// Cosine similarity between two vectors, in [-1, 1].
///
/// A zero vector (zero denominator) or a length mismatch yields 0.0 rather
/// than a division by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Element-wise mean of a set of equal-length vectors, equal weight per
/// vector. Returns `None` for an empty input.
pub fn average_embedding(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut sum = vec![0.0f32; first.len()];
    let mut counted = 0usize;
    for vector in vectors {
        if vector.len() != sum.len() {
            continue;
        }
        for (slot, value) in sum.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
        counted += 1;
    }
    if counted == 0 {
        return None;
    }
    let scale = 1.0 / counted as f32;
    for slot in sum.iter_mut() {
        *slot *= scale;
    }
    Some(sum)
}

/// Remaps a cosine similarity from [-1, 1] to a 0-100 integer percentage.
pub fn relevance_score(similarity: f32) -> u8 {
    let score = (((similarity + 1.0) / 2.0) * 100.0).round();
    score.clamp(0.0, 100.0) as u8
}

/// Normalizes text for consistent embedding input: lowercase, trimmed,
/// internal whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prepares the embedding input for a paper: normalized title plus
/// truncated abstract, capped at [`MAX_EMBED_INPUT_CHARS`].
pub fn embedding_input(paper: &Paper) -> String {
    let mut text = normalize_text(&paper.title);
    if let Some(abstract_text) = &paper.abstract_text {
        text.push(' ');
        text.push_str(&normalize_text(abstract_text));
    }
    if text.len() > MAX_EMBED_INPUT_CHARS {
        // Truncate on a char boundary to stay valid UTF-8.
        let mut end = MAX_EMBED_INPUT_CHARS;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_of_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn average_of_two_vectors() {
        let avg = average_embedding(&[vec![2.0, 0.0], vec![0.0, 2.0]]).unwrap();
        assert_eq!(avg, vec![1.0, 1.0]);
    }

    #[test]
    fn average_of_empty_set_is_none() {
        assert!(average_embedding(&[]).is_none());
    }

    #[test]
    fn score_remap_endpoints_and_midpoint() {
        assert_eq!(relevance_score(1.0), 100);
        assert_eq!(relevance_score(-1.0), 0);
        assert_eq!(relevance_score(0.0), 50);
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_text("UPPERCASE"), "uppercase");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn embedding_input_concatenates_title_and_abstract() {
        let paper = Paper {
            paper_id: "p1".to_string(),
            title: "Attention Is All You Need".to_string(),
            abstract_text: Some("The dominant sequence models...".to_string()),
            year: Some(2017),
            authors: Vec::new(),
            citation_count: 0,
            url: String::new(),
            pdf_url: None,
            slug: None,
            snapshots: Vec::new(),
        };
        let input = embedding_input(&paper);
        assert!(input.starts_with("attention is all you need"));
        assert!(input.contains("dominant sequence models"));
    }

    #[test]
    fn embedding_input_is_truncated_to_the_cap() {
        let paper = Paper {
            paper_id: "p1".to_string(),
            title: "T".to_string(),
            abstract_text: Some("x".repeat(5000)),
            year: None,
            authors: Vec::new(),
            citation_count: 0,
            url: String::new(),
            pdf_url: None,
            slug: None,
            snapshots: Vec::new(),
        };
        assert!(embedding_input(&paper).len() <= MAX_EMBED_INPUT_CHARS);
    }
}
