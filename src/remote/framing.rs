//! Reply framing for the control channel. The player sends no length
//! prefix, so a reply is judged complete by its shape:
//!
//! - a bare token such as `R-200`, a number or `PLAYING`
//! - the closing tag of a known document (`</Soundlist>`, `</Categories>`)
//! - a self-closing root element such as `<Soundlist/>`
//! - a NUL terminator
//!
//! When none of these ever shows up, end-of-stream flushes what was buffered.

use crate::spl::scanner::read_tag;

const CLOSING_TAGS: [&str; 2] = ["</Soundlist>", "</Categories>"];
const LONGEST_CLOSE: usize = "</Categories>".len();

/// What the reply looks like so far, judged byte by byte as it arrives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Shape {
    #[default]
    Blank,
    Token { trailing_space: bool },
    /// Several words: only a NUL or end-of-stream ends it
    Prose,
    Document,
}

/// Accumulates a reply chunk by chunk. Each push only inspects the bytes it
/// adds, plus enough of the tail to catch a closing tag split across chunks.
#[derive(Debug, Default)]
pub struct ReplyDecoder {
    buf: Vec<u8>,
    complete: bool,
    shape: Shape,
    /// `<` seen so far, not counting `<?` declarations
    tag_starts: usize,
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns whether the reply now looks complete.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        let start = self.buf.len();
        self.buf.extend_from_slice(chunk);
        if self.complete {
            return true;
        }

        self.track_shape(start);
        self.complete = chunk.contains(&0)
            || match self.shape {
                Shape::Blank | Shape::Prose => false,
                Shape::Token { .. } => true,
                Shape::Document => self.document_complete(start),
            };
        self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_empty(&self) -> bool {
        self.shape == Shape::Blank
    }

    pub fn into_text(self) -> String {
        String::from_utf8_lossy(&self.buf)
            .replace('\0', "")
            .trim()
            .to_string()
    }

    fn track_shape(&mut self, start: usize) {
        for &byte in &self.buf[start..] {
            if matches!(self.shape, Shape::Document | Shape::Prose) {
                return;
            }
            if byte == 0 {
                continue;
            }
            let space = byte.is_ascii_whitespace();
            self.shape = match self.shape {
                Shape::Blank if space => Shape::Blank,
                Shape::Blank if byte == b'<' => Shape::Document,
                Shape::Blank => Shape::Token {
                    trailing_space: false,
                },
                Shape::Token { .. } if space => Shape::Token {
                    trailing_space: true,
                },
                Shape::Token {
                    trailing_space: true,
                } => Shape::Prose,
                other => other,
            };
        }
    }

    fn document_complete(&mut self, start: usize) -> bool {
        let tail = &self.buf[start.saturating_sub(LONGEST_CLOSE - 1)..];
        if CLOSING_TAGS
            .iter()
            .any(|close| contains(tail, close.as_bytes()))
        {
            return true;
        }

        let opened = self.buf[start..].iter().filter(|&&b| b == b'<').count();
        let declarations = self.buf[start.saturating_sub(1)..]
            .windows(2)
            .filter(|pair| pair[0] == b'<' && pair[1] == b'?')
            .count();
        self.tag_starts = (self.tag_starts + opened).saturating_sub(declarations);

        // Past the first element the root can no longer be self-closing
        self.tag_starts <= 1 && self_closing_root(String::from_utf8_lossy(&self.buf).trim())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// `<Root .../>` with nothing after it, skipping an XML declaration.
fn self_closing_root(text: &str) -> bool {
    let mut start = 0;
    if text.starts_with("<?") {
        match text.find("?>") {
            Some(end) => start = end + 2,
            None => return false,
        }
        match text[start..].find('<') {
            Some(offset) => start += offset,
            None => return false,
        }
    }
    match read_tag(text, start, text.len()) {
        Some(tag) => tag.self_closing && tag.span.end == text.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(chunks: &[&str]) -> (bool, String) {
        let mut decoder = ReplyDecoder::new();
        let mut done = false;
        for chunk in chunks {
            done = decoder.push(chunk.as_bytes());
        }
        (done, decoder.into_text())
    }

    #[test]
    fn status_tokens_complete_immediately() {
        assert_eq!(decode(&["R-200"]), (true, "R-200".to_string()));
        assert_eq!(decode(&["42\r\n"]), (true, "42".to_string()));
        assert!(decode(&["PLAYING"]).0);
    }

    #[test]
    fn documents_wait_for_their_closing_tag() {
        let (done, _) = decode(&["<Soundlist>\n<Sound index=\"1\"/>"]);
        assert!(!done);
        let (done, text) = decode(&["<Soundlist>\n<Sound index=\"1\"/>", "\n</Soundlist>"]);
        assert!(done);
        assert!(text.ends_with("</Soundlist>"));
        assert!(decode(&["<?xml version=\"1.0\"?><Categories>", "</Categories>"]).0);
    }

    #[test]
    fn empty_root_is_complete() {
        assert!(decode(&["<Soundlist/>"]).0);
        assert!(decode(&["<?xml version=\"1.0\"?>\n<Categories />"]).0);
        assert!(!decode(&["<Soundlist><Sound url=\"a\"/>"]).0);
    }

    #[test]
    fn nul_terminates_and_is_stripped() {
        let (done, text) = decode(&["<Soundlist><Sound", "/>\0"]);
        assert!(done);
        assert_eq!(text, "<Soundlist><Sound/>");
    }

    #[test]
    fn words_separated_by_spaces_wait_for_the_end() {
        let (done, text) = decode(&["hello world\n"]);
        assert!(!done);
        assert_eq!(text, "hello world");
        assert!(decode(&["  R-200 \r\n"]).0);
    }

    #[test]
    fn markers_split_across_chunks_are_found() {
        assert!(decode(&["<Soundlist><Sound/></Sound", "list>"]).0);
        assert!(decode(&["<Categories>", "<", "/Categ", "ories>"]).0);
        assert!(decode(&["<", "?xml version=\"1.0\"?><Categories />"]).0);
    }

    #[test]
    fn multi_megabyte_document_decodes_in_linear_time() {
        let image = "A".repeat(4096);
        let mut body = String::from("<Soundlist>\n");
        let mut n = 0;
        while body.len() < 4_000_000 {
            body.push_str(&format!(
                "<Sound index=\"{}\" url=\"C:\\s\\{}.mp3\" image=\"{}\"/>\n",
                n, n, image
            ));
            n += 1;
        }
        body.push_str("</Soundlist>");

        let started = std::time::Instant::now();
        let mut decoder = ReplyDecoder::new();
        let chunks: Vec<&[u8]> = body.as_bytes().chunks(8192).collect();
        let (last, rest) = chunks.split_last().unwrap();
        for chunk in rest {
            assert!(!decoder.push(chunk));
        }
        assert!(decoder.push(last));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(decoder.into_text().len(), body.len());
    }
}
