use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Google TTS rejects requests of 5000 bytes or more.
pub const MAX_TTS_CHUNK_BYTES: usize = 4900;

/// Body text shorter than this is not worth reading out; the title is used
/// instead.
const MIN_BODY_CHARS: usize = 50;

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Speaks `text` into an audio file at `out_path`.
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()>;
}

pub fn narration_text(intro: &str, title: &str, body: &str) -> String {
    let spoken = if body.trim().chars().count() > MIN_BODY_CHARS {
        body.trim()
    } else {
        title.trim()
    };
    if intro.trim().is_empty() {
        spoken.to_string()
    } else {
        format!("{} {}", intro.trim(), spoken)
    }
}

/// Packs newline-separated paragraphs into chunks below `max_bytes` of
/// UTF-8. Oversized paragraphs are split on whitespace, and words that are
/// still too long on char boundaries.
pub fn chunk_for_tts(text: &str, max_bytes: usize) -> Vec<String> {
    let max_bytes = max_bytes.max(8);
    let mut chunks = Vec::new();
    let mut current = String::new();

    let push_piece = |piece: &str, sep: char, current: &mut String, chunks: &mut Vec<String>| {
        if piece.is_empty() {
            return;
        }
        let extra = if current.is_empty() { 0 } else { sep.len_utf8() };
        if current.len() + extra + piece.len() < max_bytes {
            if !current.is_empty() {
                current.push(sep);
            }
            current.push_str(piece);
        } else {
            flush(current, chunks);
            current.push_str(piece);
        }
    };

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim();
        if paragraph.len() < max_bytes {
            push_piece(paragraph, '\n', &mut current, &mut chunks);
            continue;
        }
        for word in paragraph.split_whitespace() {
            if word.len() < max_bytes {
                push_piece(word, ' ', &mut current, &mut chunks);
            } else {
                for part in split_at_char_boundaries(word, max_bytes - 1) {
                    push_piece(part, ' ', &mut current, &mut chunks);
                }
            }
        }
    }
    flush(&mut current, &mut chunks);
    chunks
}

fn flush(current: &mut String, chunks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

fn split_at_char_boundaries(s: &str, max_bytes: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let mut cut = max_bytes.min(rest.len());
        while cut > 0 && !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        out.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_body_when_long_enough() {
        let body = "Markets rallied on Tuesday after the central bank held rates steady.";
        assert_eq!(
            narration_text("Today's news:", "Markets rally", body),
            format!("Today's news: {body}")
        );
        assert_eq!(
            narration_text("Today's news:", "Markets rally", "  too short  "),
            "Today's news: Markets rally"
        );
        assert_eq!(narration_text("", "Title", ""), "Title");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_for_tts("first\nsecond\n\nthird", 4900), ["first\nsecond\nthird"]);
        assert!(chunk_for_tts(" \n \n", 4900).is_empty());
    }

    #[test]
    fn paragraphs_pack_under_the_limit() {
        let para = "x".repeat(30);
        let text = vec![para.clone(); 10].join("\n");
        let chunks = chunk_for_tts(&text, 100);

        assert!(chunks.iter().all(|c| c.len() < 100));
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.concat().matches('x').count(), 300);
    }

    #[test]
    fn oversized_paragraph_splits_on_words() {
        let text = "word ".repeat(50);
        let chunks = chunk_for_tts(&text, 40);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() < 40));
        assert_eq!(chunks.join(" ").split_whitespace().count(), 50);
    }

    #[test]
    fn giant_word_splits_on_char_boundaries() {
        let word = "é".repeat(30);
        let chunks = chunk_for_tts(&word, 16);
        assert!(chunks.iter().all(|c| c.len() < 16));
        assert_eq!(chunks.concat(), word);
    }
}
