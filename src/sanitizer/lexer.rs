use std::{borrow::Cow, collections::HashSet};

/// Attribute parsed from a start tag. `value` is entity-decoded; `None` means the attribute
/// was written without `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    /// Lower-cased tag name.
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// The exact source text of the tag, `<` through `>`.
    pub raw: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    StartTag(StartTag<'a>),
    EndTag { name: String, raw: &'a str },
    /// Body of an HTML comment, without the `<!--` / `-->` delimiters.
    Comment(&'a str),
    /// Doctype, processing instruction, CDATA or any other bogus markup.
    Declaration(&'a str),
}

/// Splits markup into a flat token stream.
///
/// Every element is lexed the same way: there are no raw-text states, so the children of a
/// `<script>` or `<style>` element come out as ordinary tokens. A `<` that does not open
/// well-formed markup is returned as text, and the lexer never fails.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn text_until_next_tag(&mut self, from: usize) -> Token<'a> {
        let rest = &self.input[self.pos..];
        let end = rest[from..].find('<').map_or(rest.len(), |i| i + from);
        self.pos += end;
        Token::Text(&rest[..end])
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.input[self.pos..];
        if rest.is_empty() {
            return None;
        }
        if !rest.starts_with('<') {
            return Some(self.text_until_next_tag(0));
        }
        match lex_markup(rest) {
            Some((token, consumed)) => {
                self.pos += consumed;
                Some(token)
            }
            None if opens_tag(rest) => {
                self.pos = self.input.len();
                Some(Token::Text(rest))
            }
            // The `<` is literal text; continue the text run up to the next `<`.
            None => Some(self.text_until_next_tag(1)),
        }
    }
}

/// Whether `rest` starts like a start or end tag. When such a tag fails to lex, the scan has
/// already reached the end of the input without finding its `>`.
fn opens_tag(rest: &str) -> bool {
    match rest.as_bytes().get(1) {
        Some(b'/') => true,
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    }
}

fn lex_markup(rest: &str) -> Option<(Token<'_>, usize)> {
    let bytes = rest.as_bytes();
    if rest.starts_with("<!--") {
        return Some(lex_comment(rest));
    }
    match bytes.get(1)? {
        b'!' | b'?' => Some(lex_declaration(rest, 2)),
        b'/' => match bytes.get(2)? {
            c if c.is_ascii_alphabetic() => {
                let (name, name_end) = tag_name(rest, 2);
                let (_, consumed) = attributes(rest, name_end)?;
                Some((
                    Token::EndTag {
                        name,
                        raw: &rest[..consumed],
                    },
                    consumed,
                ))
            }
            _ => Some(lex_declaration(rest, 2)),
        },
        c if c.is_ascii_alphabetic() => {
            let (name, name_end) = tag_name(rest, 1);
            let (attributes, consumed) = attributes(rest, name_end)?;
            Some((
                Token::StartTag(StartTag {
                    name,
                    attributes,
                    raw: &rest[..consumed],
                }),
                consumed,
            ))
        }
        _ => None,
    }
}

fn lex_comment(rest: &str) -> (Token<'_>, usize) {
    let body = &rest[4..];
    // `<!-->` and `<!--->` close immediately.
    if body.starts_with('>') {
        return (Token::Comment(""), 5);
    }
    if body.starts_with("->") {
        return (Token::Comment(""), 6);
    }
    // `--!>` only wins if it starts before the first `-->`, so it is looked for in that prefix.
    let dash = body.find("-->");
    let bang_window = dash.map_or(body.len(), |at| at + 3);
    let bang = body[..bang_window].find("--!>");
    let close = match (dash, bang) {
        (Some(d), Some(b)) if b < d => Some((b, 4)),
        (Some(d), _) => Some((d, 3)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    };
    match close {
        Some((at, len)) => (Token::Comment(&body[..at]), 4 + at + len),
        None => (Token::Comment(body), rest.len()),
    }
}

fn lex_declaration(rest: &str, from: usize) -> (Token<'_>, usize) {
    let consumed = rest[from..].find('>').map_or(rest.len(), |i| from + i + 1);
    (Token::Declaration(&rest[..consumed]), consumed)
}

fn is_tag_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn tag_name(rest: &str, start: usize) -> (String, usize) {
    let end = rest.as_bytes()[start..]
        .iter()
        .position(|&b| is_tag_delimiter(b))
        .map_or(rest.len(), |i| start + i);
    (rest[start..end].to_ascii_lowercase(), end)
}

/// Parses attributes from `pos` up to the closing `>`.
///
/// Returns the attributes and the number of bytes consumed including the `>`, or `None` when
/// the tag is never closed (including an unterminated quoted value).
fn attributes(rest: &str, mut pos: usize) -> Option<(Vec<Attribute>, usize)> {
    let bytes = rest.as_bytes();
    let mut attrs: Vec<Attribute> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            pos += 1;
        }
        if *bytes.get(pos)? == b'>' {
            return Some((attrs, pos + 1));
        }

        // A leading `=` belongs to the name.
        let name_start = pos;
        pos += 1;
        while pos < bytes.len() && !is_tag_delimiter(bytes[pos]) && bytes[pos] != b'=' {
            pos += 1;
        }
        let name = rest[name_start..pos].to_ascii_lowercase();

        let mut after_name = pos;
        while after_name < bytes.len() && bytes[after_name].is_ascii_whitespace() {
            after_name += 1;
        }

        let value = if bytes.get(after_name) == Some(&b'=') {
            pos = after_name + 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let raw_value = match bytes.get(pos)? {
                quote @ (b'"' | b'\'') => {
                    let quote = *quote as char;
                    let close = rest[pos + 1..].find(quote)?;
                    let value = &rest[pos + 1..pos + 1 + close];
                    pos += close + 2;
                    value
                }
                _ => {
                    let start = pos;
                    while pos < bytes.len()
                        && !bytes[pos].is_ascii_whitespace()
                        && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    &rest[start..pos]
                }
            };
            Some(decode(raw_value).into_owned())
        } else {
            None
        };

        if seen.insert(name.clone()) {
            attrs.push(Attribute { name, value });
        }
    }
}

fn decode(value: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(value)
}
