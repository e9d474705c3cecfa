//! Position-annotated tokenizer for shell command lines.
//!
//! The tokenizer is deliberately shallow: it recognises quoted runs, escaped
//! operators, the fixed operator lexemes and plain words. Whitespace is never
//! emitted; byte offsets into the original string keep every untouched span
//! recoverable.

/// Fixed operator lexemes, longest first so a prefix scan finds the longest match.
pub const OPERATORS: &[&str] = &[
    "&&", "||", "|&", "<<", ">>", "|", ";", "<", ">", "(", ")", "{", "}",
];

/// How a token was quoted in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteKind {
    None,
    Single,
    Double,
}

/// A token with byte offsets into the original command string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub value: String,
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
    pub quote: QuoteKind,
}

impl Token {
    fn new(source: &str, start: usize, end: usize, quote: QuoteKind) -> Self {
        Self {
            value: source[start..end].to_string(),
            start,
            end,
            quote,
        }
    }

    /// Whether this token is one of the fixed operator lexemes
    #[must_use]
    pub fn is_operator(&self) -> bool {
        self.quote == QuoteKind::None && OPERATORS.contains(&self.value.as_str())
    }
}

#[inline]
fn is_operator_start(b: u8) -> bool {
    matches!(b, b'&' | b'|' | b';' | b'<' | b'>' | b'(' | b')' | b'{' | b'}')
}

#[inline]
fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Split a command line into tokens.
///
/// Never fails: unrecognised bytes become one-character tokens and the cursor
/// advances at least one byte per iteration. Token boundaries always fall on
/// ASCII bytes or the ends of the input, so every span is a valid `&str` slice.
#[must_use]
pub fn tokenize(command: &str) -> Vec<Token> {
    let src = command.as_bytes();
    let len = src.len();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < len {
        let b = src[pos];

        if is_blank(b) {
            pos += 1;
            continue;
        }

        // Quoted run, verbatim up to the matching close quote
        if b == b'\'' || b == b'"' {
            let start = pos;
            pos += 1;
            while pos < len && src[pos] != b {
                if b == b'"' && src[pos] == b'\\' && pos + 1 < len {
                    pos += 1;
                }
                pos += 1;
            }
            // Unterminated quotes run to the end of input
            pos = (pos + 1).min(len);
            let quote = if b == b'\'' {
                QuoteKind::Single
            } else {
                QuoteKind::Double
            };
            tokens.push(Token::new(command, start, pos, quote));
            continue;
        }

        // Escaped operator: \; \| \( ...
        if b == b'\\' && pos + 1 < len && is_operator_start(src[pos + 1]) {
            tokens.push(Token::new(command, pos, pos + 2, QuoteKind::None));
            pos += 2;
            continue;
        }

        // Backtick-escaped operator idiom: `&`& collapses into one token
        if b == b'`' && pos + 1 < len && is_operator_start(src[pos + 1]) {
            let start = pos;
            while pos + 1 < len && src[pos] == b'`' && is_operator_start(src[pos + 1]) {
                pos += 2;
            }
            tokens.push(Token::new(command, start, pos, QuoteKind::None));
            continue;
        }

        if is_operator_start(b) {
            let rest = &command[pos..];
            if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                tokens.push(Token::new(command, pos, pos + op.len(), QuoteKind::None));
                pos += op.len();
            } else {
                // Lone '&' and friends
                tokens.push(Token::new(command, pos, pos + 1, QuoteKind::None));
                pos += 1;
            }
            continue;
        }

        // Plain word; a backslash carries the next byte along with it
        let start = pos;
        while pos < len {
            let c = src[pos];
            if is_blank(c) || is_operator_start(c) || c == b'\'' || c == b'"' {
                break;
            }
            if c == b'\\' && pos + 1 < len && src[pos + 1].is_ascii() {
                pos += 2;
                continue;
            }
            pos += 1;
        }
        if pos == start {
            pos += 1;
        }
        tokens.push(Token::new(command, start, pos, QuoteKind::None));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(command: &str) -> Vec<String> {
        tokenize(command).into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_plain_words_and_offsets() {
        let tokens = tokenize("rm  -rf dist");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].value, "-rf");
        assert_eq!(tokens[1].start, 4);
        assert_eq!(tokens[1].end, 7);
        assert_eq!(tokens[2].start, 8);
    }

    #[test]
    fn test_quoted_runs_are_single_tokens() {
        let tokens = tokenize(r#"grep "a b" 'c | d'"#);
        assert_eq!(tokens[1].value, "\"a b\"");
        assert_eq!(tokens[1].quote, QuoteKind::Double);
        assert_eq!(tokens[2].value, "'c | d'");
        assert_eq!(tokens[2].quote, QuoteKind::Single);
    }

    #[test]
    fn test_escaped_quote_inside_double_quotes() {
        assert_eq!(values(r#"echo "say \"hi\"" x"#), vec!["echo", r#""say \"hi\"""#, "x"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let tokens = tokenize("echo 'oops");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].value, "'oops");
        assert_eq!(tokens[1].end, 10);
    }

    #[test]
    fn test_longest_operator_match() {
        assert_eq!(
            values("a&&b||c|&d<<e>>f|g;h"),
            vec!["a", "&&", "b", "||", "c", "|&", "d", "<<", "e", ">>", "f", "|", "g", ";", "h"]
        );
    }

    #[test]
    fn test_escaped_operator() {
        assert_eq!(values(r"find . -exec echo {} \;"), vec!["find", ".", "-exec", "echo", "{", "}", r"\;"]);
    }

    #[test]
    fn test_backtick_operator_idiom() {
        let tokens = tokenize("echo `&`& done");
        assert_eq!(tokens[1].value, "`&`&");
        assert_eq!(tokens[1].end - tokens[1].start, 4);
    }

    #[test]
    fn test_redirection_pieces() {
        assert_eq!(values("cmd 2>&1"), vec!["cmd", "2", ">", "&", "1"]);
    }

    #[test]
    fn test_lone_ampersand() {
        assert_eq!(values("sleep 5 &"), vec!["sleep", "5", "&"]);
    }

    #[test]
    fn test_non_ascii_words() {
        let tokens = tokenize("cat résumé.txt | wc");
        assert_eq!(tokens[1].value, "résumé.txt");
        assert_eq!(tokens[2].value, "|");
    }

    #[test]
    fn test_trailing_backslash() {
        assert_eq!(values("echo \\"), vec!["echo", "\\"]);
    }

    #[test]
    fn test_deterministic() {
        let input = "ls -la | grep '.ts' && echo $(date) >> log 2>&1";
        assert_eq!(tokenize(input), tokenize(input));
    }

    #[test]
    fn test_spans_reconstruct_input() {
        let input = "ls  -la |grep \"x y\"";
        let tokens = tokenize(input);
        let mut rebuilt = String::new();
        let mut last = 0;
        for token in &tokens {
            rebuilt.push_str(&input[last..token.start]);
            rebuilt.push_str(&token.value);
            last = token.end;
        }
        rebuilt.push_str(&input[last..]);
        assert_eq!(rebuilt, input);
    }
}
