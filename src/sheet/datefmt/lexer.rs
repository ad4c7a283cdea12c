//! Tokenizer for date format codes.
//!
//! Runs of one field letter (`y`, `m`, `d`, `h`, `s`, any case) become
//! [`Token::Field`]s carrying their run length. Quoted text and backslash
//! escapes become literals. Bracketed sections such as `[Red]` or `[$-409]`,
//! fill characters (`*x`) and everything after the first `;` are dropped.

/// Calendar field named by a format letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLetter {
    Year,
    /// Month or minute; the compiler decides
    M,
    Day,
    Hour,
    Second,
}

impl FieldLetter {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'y' => Some(FieldLetter::Year),
            'm' => Some(FieldLetter::M),
            'd' => Some(FieldLetter::Day),
            'h' => Some(FieldLetter::Hour),
            's' => Some(FieldLetter::Second),
            _ => None,
        }
    }

    /// Lowercase letter as written in format codes.
    pub fn as_char(self) -> char {
        match self {
            FieldLetter::Year => 'y',
            FieldLetter::M => 'm',
            FieldLetter::Day => 'd',
            FieldLetter::Hour => 'h',
            FieldLetter::Second => 's',
        }
    }
}

/// How an AM/PM marker was spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeridiemStyle {
    /// `AM/PM`
    Full { lowercase: bool },
    /// `A/P`
    Short { lowercase: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Field { letter: FieldLetter, width: usize },
    Literal(String),
    Meridiem(MeridiemStyle),
    End,
}

/// Split a format code into tokens, always ending with [`Token::End`].
pub fn tokenize(format: &str) -> Vec<Token> {
    let chars: Vec<char> = format.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(letter) = FieldLetter::from_char(c) {
            let mut width = 1;
            while chars
                .get(i + width)
                .is_some_and(|next| next.eq_ignore_ascii_case(&c))
            {
                width += 1;
            }
            flush_literal(&mut literal, &mut tokens);
            tokens.push(Token::Field { letter, width });
            i += width;
            continue;
        }

        if let Some((style, len)) = meridiem_at(&chars[i..]) {
            flush_literal(&mut literal, &mut tokens);
            tokens.push(Token::Meridiem(style));
            i += len;
            continue;
        }

        match c {
            ';' => break,
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                literal.extend(&chars[i + 1..end]);
                i = end + 1;
            },
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    literal.push(next);
                }
                i += 2;
            },
            // padding to the width of the next character
            '_' => {
                if chars.get(i + 1).is_some() {
                    literal.push(' ');
                }
                i += 2;
            },
            '*' => i += 2,
            '[' => {
                i = chars[i..]
                    .iter()
                    .position(|&b| b == ']')
                    .map_or(chars.len(), |p| i + p + 1);
            },
            _ => {
                literal.push(c);
                i += 1;
            },
        }
    }

    flush_literal(&mut literal, &mut tokens);
    tokens.push(Token::End);
    tokens
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn meridiem_at(rest: &[char]) -> Option<(MeridiemStyle, usize)> {
    let starts_with = |pat: &str| {
        pat.len() <= rest.len()
            && pat
                .chars()
                .zip(rest)
                .all(|(p, c)| p.eq_ignore_ascii_case(c))
    };
    let lowercase = rest.first().is_some_and(|c| c.is_ascii_lowercase());
    if starts_with("am/pm") {
        Some((MeridiemStyle::Full { lowercase }, 5))
    } else if starts_with("a/p") {
        Some((MeridiemStyle::Short { lowercase }, 3))
    } else {
        None
    }
}
