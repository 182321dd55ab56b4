/// Buffers streamed text and releases it one complete sentence at a time.
///
/// A sentence ends at `.`, `?` or `!` immediately followed by whitespace.
/// Whatever is left when the stream ends is released by [`flush`].
///
/// [`flush`]: SentenceBuffer::flush
#[derive(Debug, Default)]
pub struct SentenceBuffer {
    pending: String,
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return every sentence it completed, in order.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.pending.push_str(delta);

        let mut sentences = Vec::new();
        while let Some(end) = sentence_end(&self.pending) {
            let sentence = self.pending[..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            self.pending = self.pending[end..].trim_start().to_string();
        }
        sentences
    }

    /// Release the trailing partial sentence, if any.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

/// Byte offset just past the first terminator that is followed by whitespace.
fn sentence_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if matches!(ch, '.' | '?' | '!') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    return Some(idx + ch.len_utf8());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_released_only_when_complete() {
        let mut buffer = SentenceBuffer::new();
        assert!(buffer.push("Hello wor").is_empty());
        assert_eq!(buffer.push("ld. How are"), vec!["Hello world.".to_string()]);
        assert!(buffer.push(" you?").is_empty());
        assert_eq!(buffer.flush(), Some("How are you?".to_string()));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn test_multiple_sentences_in_one_delta() {
        let mut buffer = SentenceBuffer::new();
        let out = buffer.push("Article 5 applies. Is consent needed? Yes! Then");
        assert_eq!(out, vec!["Article 5 applies.", "Is consent needed?", "Yes!"]);
        assert_eq!(buffer.flush().as_deref(), Some("Then"));
    }

    #[test]
    fn test_terminator_without_whitespace_is_not_a_boundary() {
        let mut buffer = SentenceBuffer::new();
        assert!(buffer.push("Version 2.1 of the GDPR").is_empty());
        assert!(buffer.push("...").is_empty());
        assert_eq!(buffer.push("\nNext").len(), 1);
    }

    #[test]
    fn test_flush_ignores_whitespace_only_tail() {
        let mut buffer = SentenceBuffer::new();
        assert_eq!(buffer.push("Done. "), vec!["Done.".to_string()]);
        assert_eq!(buffer.flush(), None);
    }
}
