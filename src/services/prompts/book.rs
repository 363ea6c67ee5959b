use std::fmt::Write;

use super::format_one_decimal;
use crate::models::{RatedBook, UserTasteContext};

/// Book variant of the response envelope
pub const BOOK_RESPONSE_SCHEMA: &str = r#"{
  "recommendations": [
    {
      "title": "string", "author": "string", "genre": "string",
      "publication_year": int, "pages": int, "description": "string",
      "reasoning": "string", "confidence_score": float
    }
  ]
}"#;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPreferences {
    pub include_genres: Vec<String>,
    pub exclude_genres: Vec<String>,
}

fn write_list(prompt: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "{}:", heading);
    for item in items {
        let _ = writeln!(prompt, "- {}", item);
    }
    prompt.push('\n');
}

fn rated_lines(books: &[RatedBook]) -> Vec<String> {
    books
        .iter()
        .map(|b| format!("{} ({}/5)", b.display_name(), b.rating))
        .collect()
}

/// Renders the feedback-aware book prompt from a precomputed taste context
pub fn build_book_prompt(
    context: &UserTasteContext,
    preferences: &BookPreferences,
    count: usize,
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are an expert librarian and book recommender. Suggest {} books this reader has not read yet.",
        count
    );
    prompt.push('\n');

    prompt.push_str("Reader profile:\n");
    let _ = writeln!(prompt, "- Books in collection: {}", context.total_books);
    let _ = writeln!(prompt, "- Books read: {}", context.read_count);
    let _ = writeln!(prompt, "- Want to read: {}", context.want_to_read_count);
    let _ = writeln!(
        prompt,
        "- Average rating: {}",
        format_one_decimal(context.average_rating)
    );
    let _ = writeln!(prompt, "- Reading level: {}", context.reading_level);
    prompt.push('\n');

    let genres: Vec<String> = context
        .preferred_genres
        .iter()
        .enumerate()
        .map(|(i, g)| {
            format!(
                "{}. {} ({}%, {} books)",
                i + 1,
                g.genre,
                format_one_decimal(g.percentage),
                g.count
            )
        })
        .collect();
    if !genres.is_empty() {
        prompt.push_str("Preferred genres:\n");
        for line in &genres {
            let _ = writeln!(prompt, "{}", line);
        }
        prompt.push('\n');
    }

    write_list(
        &mut prompt,
        "Highly rated books (recommend more like these)",
        &rated_lines(&context.highly_rated),
    );
    write_list(
        &mut prompt,
        "Poorly rated books (avoid books like these)",
        &rated_lines(&context.poorly_rated),
    );
    write_list(&mut prompt, "Recently read", &context.recently_read);
    write_list(&mut prompt, "Currently reading", &context.currently_reading);
    write_list(&mut prompt, "Favorites", &context.favorites);
    write_list(
        &mut prompt,
        "Recently marked as interesting",
        &context.recent_positive,
    );
    write_list(
        &mut prompt,
        "Recently marked as not interested (avoid similar books)",
        &context.recent_negative,
    );
    write_list(
        &mut prompt,
        "Books already in the collection (do NOT recommend any of these)",
        &context.existing_books,
    );

    if !preferences.include_genres.is_empty() {
        let _ = writeln!(
            prompt,
            "Focus on these genres: {}",
            preferences.include_genres.join(", ")
        );
    }
    if !preferences.exclude_genres.is_empty() {
        let _ = writeln!(
            prompt,
            "Do not recommend these genres: {}",
            preferences.exclude_genres.join(", ")
        );
    }
    if !preferences.include_genres.is_empty() || !preferences.exclude_genres.is_empty() {
        prompt.push('\n');
    }

    prompt.push_str("Instructions:\n");
    prompt.push_str("- Match the reader's preferred genres and the style of their highly rated books.\n");
    prompt.push_str("- Avoid books similar to poorly rated or not interested titles.\n");
    prompt.push_str("- Never recommend a book already in the collection.\n");
    prompt.push_str("- Explain each pick in `reasoning` and give a confidence_score between 0 and 1.\n");
    prompt.push('\n');

    prompt.push_str("Return ONLY valid JSON in exactly this format, with no other text:\n");
    prompt.push_str(BOOK_RESPONSE_SCHEMA);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenreShare, ReadingLevel};

    fn context() -> UserTasteContext {
        UserTasteContext {
            total_books: 7,
            read_count: 5,
            want_to_read_count: 2,
            preferred_genres: vec![
                GenreShare {
                    genre: "Fantasy".to_string(),
                    count: 3,
                    percentage: 42.857,
                },
                GenreShare {
                    genre: "Mystery".to_string(),
                    count: 2,
                    percentage: 28.571,
                },
            ],
            highly_rated: vec![RatedBook {
                title: "The Hobbit".to_string(),
                author: "J.R.R. Tolkien".to_string(),
                rating: 5,
            }],
            poorly_rated: vec![RatedBook {
                title: "Twilight".to_string(),
                author: "Stephenie Meyer".to_string(),
                rating: 1,
            }],
            recently_read: vec!["Gone Girl by Gillian Flynn".to_string()],
            currently_reading: vec![],
            favorites: vec![],
            recent_positive: vec!["Mistborn by Brandon Sanderson".to_string()],
            recent_negative: vec!["Fifty Shades of Grey by E.L. James".to_string()],
            existing_books: vec![
                "The Hobbit by J.R.R. Tolkien".to_string(),
                "Twilight by Stephenie Meyer".to_string(),
            ],
            average_rating: 3.666,
            reading_level: ReadingLevel::Beginner,
        }
    }

    #[test]
    fn test_renders_taste_signals() {
        let prompt = build_book_prompt(&context(), &BookPreferences::default(), 5);

        assert!(prompt.contains("Suggest 5 books"));
        assert!(prompt.contains("1. Fantasy (42.9%, 3 books)"));
        assert!(prompt.contains("2. Mystery (28.6%, 2 books)"));
        assert!(prompt.contains("- The Hobbit by J.R.R. Tolkien (5/5)"));
        assert!(prompt.contains("- Twilight by Stephenie Meyer (1/5)"));
        assert!(prompt.contains("- Gone Girl by Gillian Flynn"));
        assert!(prompt.contains("- Mistborn by Brandon Sanderson"));
        assert!(prompt.contains("- Fifty Shades of Grey by E.L. James"));
        assert!(prompt.contains("Average rating: 3.7"));
        assert!(prompt.contains("Reading level: beginner"));
        assert!(prompt.ends_with(&format!("{}\n", BOOK_RESPONSE_SCHEMA)));
    }

    #[test]
    fn test_exclusion_list_precedes_closing_instruction() {
        let prompt = build_book_prompt(&context(), &BookPreferences::default(), 3);
        let exclusions = prompt.find("do NOT recommend any of these").unwrap();
        let closing = prompt.find("Return ONLY valid JSON").unwrap();
        assert!(exclusions < closing);
    }

    #[test]
    fn test_empty_lists_are_omitted() {
        let prompt = build_book_prompt(&context(), &BookPreferences::default(), 3);
        assert!(!prompt.contains("Currently reading:"));
        assert!(!prompt.contains("Favorites:"));
        assert!(!prompt.contains("Focus on these genres"));
    }

    #[test]
    fn test_genre_preferences_rendered() {
        let preferences = BookPreferences {
            include_genres: vec!["Fantasy".to_string(), "Horror".to_string()],
            exclude_genres: vec!["Romance".to_string()],
        };
        let prompt = build_book_prompt(&context(), &preferences, 3);
        assert!(prompt.contains("Focus on these genres: Fantasy, Horror"));
        assert!(prompt.contains("Do not recommend these genres: Romance"));
    }
}
