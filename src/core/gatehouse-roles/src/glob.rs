//! Shell-style glob matching.
//!
//! Supported syntax:
//! - `*` matches any sequence of characters, including `.`
//! - `?` matches exactly one character
//! - `[seq]` matches one character in `seq`, `[!seq]` one character not in
//!   `seq`; `seq` may contain ranges such as `a-z`
//!
//! Matching is case-sensitive and anchored at both ends. A `[` without a
//! closing `]` is a literal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnySeq,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn matches_one(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnySeq => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Char(x) => *x == c,
                    ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                });
                hit != *negated
            }
        }
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    tokens: Vec<Token>,
}

impl GlobPattern {
    /// Compiles `pattern`. Every string is a valid pattern.
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Consecutive stars are equivalent to one.
                    if tokens.last() != Some(&Token::AnySeq) {
                        tokens.push(Token::AnySeq);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '[' => match parse_class(&chars, i + 1) {
                    Some((token, next)) => {
                        tokens.push(token);
                        i = next;
                    }
                    None => {
                        tokens.push(Token::Literal('['));
                        i += 1;
                    }
                },
                c => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
            }
        }

        Self {
            source: pattern.to_string(),
            tokens,
        }
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `text` matches the whole pattern.
    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let tokens = &self.tokens;

        let (mut t, mut p) = (0, 0);
        // Position of the last `*` and the text index it currently covers up to.
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            if p < tokens.len() {
                if tokens[p] == Token::AnySeq {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                if tokens[p].matches_one(text[t]) {
                    p += 1;
                    t += 1;
                    continue;
                }
            }
            match backtrack {
                Some((star, covered)) => {
                    p = star + 1;
                    t = covered + 1;
                    backtrack = Some((star, covered + 1));
                }
                None => return false,
            }
        }

        tokens[p..].iter().all(|token| *token == Token::AnySeq)
    }
}

/// Parses a character class starting right after `[`.
///
/// Returns the token and the index after the closing `]`, or `None` when
/// the class is not terminated.
fn parse_class(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start;
    let negated = chars.get(i) == Some(&'!');
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    let mut first = true;
    loop {
        let c = *chars.get(i)?;
        // A `]` right after the opening bracket is a literal member.
        if c == ']' && !first {
            return Some((Token::Class { negated, items }, i + 1));
        }
        first = false;

        match (chars.get(i + 1), chars.get(i + 2)) {
            (Some('-'), Some(&hi)) if hi != ']' => {
                if c <= hi {
                    items.push(ClassItem::Range(c, hi));
                }
                i += 3;
            }
            _ => {
                items.push(ClassItem::Char(c));
                i += 1;
            }
        }
    }
}

impl From<&str> for GlobPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for GlobPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for GlobPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Ok(Self::new(&source))
    }
}

/// Matches `name` against a single glob `pattern`.
pub fn fnmatch(name: &str, pattern: &str) -> bool {
    GlobPattern::new(pattern).matches(name)
}
