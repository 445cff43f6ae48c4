//! Text normalization and tokenization.
//!
//! Normalization strips what carries no conversational meaning (fenced and
//! inline code, URLs, markdown markers, lines that are mostly symbols).
//! Tokenization lowercases Unicode letter/number runs and drops a bilingual
//! (English/French) stopword set. Both are total functions: empty in,
//! empty out.

use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?(?:```|\z)|~~~.*?(?:~~~|\z)").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]\n]*)\]\([^)\n]*\)").unwrap());
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").unwrap());
static MD_LINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:#{1,6}|[-*+]|\d{1,3}[.)]|>+)[ \t]+").unwrap());
static MD_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*|__|~~|\*").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

const STOPWORDS: &[&str] = &[
    // English
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren", "around", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "cannot", "could", "couldn", "did", "didn", "does",
    "doesn", "doing", "done", "down", "during", "each", "either", "else", "even", "every", "few",
    "for", "from", "further", "get", "gets", "getting", "going", "gonna", "good", "great", "had",
    "hadn", "has", "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "however", "i", "if", "in", "into", "is", "isn", "it", "its", "itself",
    "just", "know", "let", "like", "look", "made", "make", "many", "may", "maybe", "me", "might",
    "more", "most", "much", "must", "my", "myself", "need", "needs", "no", "nor", "not", "now",
    "of", "off", "ok", "okay", "on", "once", "one", "only", "or", "other", "our", "ours",
    "ourselves", "out", "over", "own", "please", "quite", "rather", "really", "right", "same",
    "see", "shall", "she", "should", "shouldn", "since", "so", "some", "still", "such", "sure",
    "take", "than", "thank", "thanks", "that", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "thing", "things", "think", "this", "those", "though",
    "through", "to", "too", "under", "until", "up", "upon", "us", "use", "used", "using", "very",
    "want", "was", "wasn", "way", "we", "well", "were", "weren", "what", "when", "where",
    "whether", "which", "while", "who", "whom", "why", "will", "with", "within", "without",
    "won", "would", "wouldn", "yes", "yet", "you", "your", "yours", "yourself", "yourselves",
    // French
    "alors", "au", "aucun", "aussi", "autre", "aux", "avec", "avoir", "bon", "car", "ce", "cela",
    "celle", "celles", "celui", "ces", "cet", "cette", "ceux", "chaque", "ci", "comme", "comment",
    "dans", "de", "des", "donc", "dont", "du", "elle", "elles", "en", "encore", "est", "et",
    "été", "être", "eu", "faire", "fait", "faut", "ici", "il", "ils", "je", "juste", "la", "le",
    "les", "leur", "leurs", "lui", "ma", "mais", "me", "même", "mes", "moi", "mon", "ne", "ni",
    "nos", "notre", "nous", "on", "ont", "ou", "où", "par", "parce", "pas", "peu", "peut",
    "peux", "plus", "pour", "pourquoi", "quand", "que", "quel", "quelle", "quelles", "quels",
    "qui", "sa", "sans", "se", "ses", "seulement", "si", "sien", "son", "sont", "sous", "sur",
    "ta", "tes", "toi", "ton", "tous", "tout", "toute", "toutes", "très", "tu", "un", "une",
    "vers", "voici", "voilà", "vos", "votre", "vous", "vraiment",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

/// Conversational filler that survives the stopword filter but signals a
/// weak topic label when it shows up in one.
const FILLER_WORDS: &[&str] = &[
    "actually", "anything", "basically", "something", "everything", "nothing", "stuff",
    "probably", "definitely", "currently", "example", "question", "answer", "chose", "truc",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}

pub fn is_filler(word: &str) -> bool {
    FILLER_WORDS.contains(&word)
}

/// Strip code, URLs and markdown noise; drop lines that are mostly symbols.
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = FENCED_CODE.replace_all(text, "\n");
    let text = INLINE_CODE.replace_all(&text, " ");
    let text = MD_LINK.replace_all(&text, "$1");
    let text = URL.replace_all(&text, " ");
    let text = MD_LINE_MARKER.replace_all(&text, "");
    let text = MD_EMPHASIS.replace_all(&text, "");

    let mut kept: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.replace('|', " ").replace('\u{2019}', "'");
        let line = SPACES.replace_all(line.trim(), " ");
        if line.is_empty() || is_mostly_symbols(&line) {
            continue;
        }
        kept.push(line.into_owned());
    }
    kept.join("\n")
}

fn is_mostly_symbols(line: &str) -> bool {
    let mut non_ws = 0usize;
    let mut letters = 0usize;
    for c in line.chars().filter(|c| !c.is_whitespace()) {
        non_ws += 1;
        if c.is_alphabetic() {
            letters += 1;
        }
    }
    non_ws > 0 && letters * 2 < non_ws
}

/// Lowercase letter/number runs of at least `min_len` characters, minus
/// stopwords and pure numbers.
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| {
            w.chars().count() >= min_len
                && !is_stopword(w)
                && !w.chars().all(|c| c.is_numeric())
        })
        .collect()
}

/// Split into sentences at `.`/`!`/`?` followed by whitespace, and at
/// newlines. Terminal punctuation stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_spans(text).into_iter().map(|r| &text[r]).collect()
}

/// Byte ranges of the trimmed sentences of `text`.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' | '。' => match chars.peek() {
                None => Some(i + c.len_utf8()),
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            push_trimmed(text, start..end, &mut spans);
            start = end;
        }
    }
    push_trimmed(text, start..text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead + trail < slice.len() {
        spans.push(range.start + lead..range.end - trail);
    }
}

/// The sentence containing byte `offset`, or the whole text when none does.
pub fn sentence_at(text: &str, offset: usize) -> &str {
    sentence_spans(text)
        .into_iter()
        .find(|r| r.start <= offset && offset < r.end)
        .map_or(text.trim(), |r| &text[r])
}

/// Group sentences into chunks of at most `max_chars` characters so long
/// messages are scanned piecewise instead of skipped. A single sentence
/// longer than `max_chars` is split at whitespace.
pub fn chunk_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![text.trim().to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();
        if len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            chunks.extend(hard_split(sentence, max_chars));
            continue;
        }
        let extra = if current.is_empty() { len } else { len + 1 };
        if current_len + extra > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in sentence.split_whitespace() {
        let len = word.chars().count();
        if current_len > 0 && current_len + 1 + len > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        // A single oversized word is kept whole rather than cut mid-grapheme.
        current.push_str(word);
        current_len += len;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

const CODE_PREFIXES: &[&str] = &[
    "fn ", "pub fn", "const ", "var ", "def ", "class ", "import ", "function ", "#include",
    "impl ", "struct ", "if (", "for (", "while (", "SELECT ", "INSERT ", "$ ", "npm ", "cargo ",
    "pip ",
];

/// Heuristic: lots of brackets/operators, or most lines look like source.
pub fn is_code_like(chunk: &str) -> bool {
    let non_ws = chunk.chars().filter(|c| !c.is_whitespace()).count();
    if non_ws == 0 {
        return false;
    }
    let symbols = chunk
        .chars()
        .filter(|c| matches!(c, '{' | '}' | '[' | ']' | '(' | ')' | ';' | '=' | '<' | '>' | '|' | '\\' | '$'))
        .count();
    if symbols * 10 > non_ws {
        return true;
    }

    let lines: Vec<&str> = chunk.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let code_lines = lines
        .iter()
        .filter(|l| CODE_PREFIXES.iter().any(|p| l.starts_with(p)))
        .count();
    !lines.is_empty() && code_lines * 2 > lines.len()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out = out.trim_end().to_string();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n  "), "");
        assert!(tokenize("", 4).is_empty());
        assert!(split_sentences("").is_empty());
        assert!(chunk_sentences("", 100).is_empty());
    }

    #[test]
    fn strips_code_and_urls() {
        let text = "Look at this:\n```rust\nfn main() {}\n```\nSee https://example.com/x and `cargo run` now";
        let out = normalize(text);
        assert!(!out.contains("fn main"));
        assert!(!out.contains("example.com"));
        assert!(!out.contains("cargo run"));
        assert!(out.contains("Look at this:"));
        assert!(out.contains("See"));
    }

    #[test]
    fn strips_markdown_markers() {
        let out = normalize("## Heading\n- **Decision:** Use Redis\n> quoted [link](http://x.y)");
        assert_eq!(out, "Heading\nDecision: Use Redis\nquoted link");
    }

    #[test]
    fn drops_symbol_lines() {
        let out = normalize("real sentence here\n----====----\n| 1 | 2 | 3 |");
        assert_eq!(out, "real sentence here");
    }

    #[test]
    fn unterminated_fence_strips_to_end() {
        let out = normalize("before\n```\nlet x = 1;\nstill code");
        assert_eq!(out, "before");
    }

    #[test]
    fn tokenize_filters_short_stop_and_numeric() {
        let tokens = tokenize("The Database MIGRATION runs 2024 with über-fast réseau", 4);
        assert_eq!(tokens, vec!["database", "migration", "runs", "über", "fast", "réseau"]);
    }

    #[test]
    fn tokenize_drops_french_stopwords() {
        let tokens = tokenize("Nous avons vraiment besoin de cette base", 4);
        assert_eq!(tokens, vec!["avons", "besoin", "base"]);
    }

    #[test]
    fn sentences_split_on_terminators() {
        let s = split_sentences("First one. Second one! Third? v1.2 stays\nFourth");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?", "v1.2 stays", "Fourth"]);
    }

    #[test]
    fn sentence_lookup_by_offset() {
        let text = "Intro here. We decided to use Redis. Done.";
        let offset = text.find("decided").unwrap();
        assert_eq!(sentence_at(text, offset), "We decided to use Redis.");
    }

    #[test]
    fn chunks_respect_limit() {
        let text = "Alpha beta gamma. ".repeat(50);
        let chunks = chunk_sentences(&text, 100);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn oversized_sentence_is_hard_split() {
        let text = "word ".repeat(100);
        let chunks = chunk_sentences(&text, 50);
        assert!(chunks.len() >= 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn code_detection() {
        assert!(is_code_like("let x = vec![1, 2, 3]; if (a > b) { c(); }"));
        assert!(is_code_like("import os\nimport sys\nreturn value"));
        assert!(!is_code_like("We decided to use PostgreSQL for storage."));
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 20), "héllo wörld");
        let t = truncate_chars("héllo wörld and more", 10);
        assert!(t.chars().count() <= 10);
        assert!(t.ends_with("..."));
    }
}
