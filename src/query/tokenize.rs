use super::Op;

const OPERATORS: [(&str, Op); 7] = [
    (">=", Op::Ge),
    ("<=", Op::Le),
    ("!=", Op::Ne),
    (">", Op::Gt),
    ("<", Op::Lt),
    ("=", Op::Eq),
    (":", Op::Has),
];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Connective {
    And,
    Or,
}

/// Splits on whitespace outside double or single quotes. Quotes are kept.
pub fn raw_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(open) if ch == open => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Shell-style words: quoted runs stay together and the quotes are dropped.
pub fn words(input: &str) -> Vec<String> {
    raw_words(input).iter().map(|word| strip_quotes(word)).collect()
}

fn strip_quotes(word: &str) -> String {
    word.chars().filter(|ch| *ch != '"' && *ch != '\'').collect()
}

/// Removes one pair of surrounding quotes, if present.
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Splits a comparison filter into segments joined by `AND` / `OR`.
///
/// The first segment has no connective.
pub fn split_connectives(input: &str) -> Vec<(Option<Connective>, String)> {
    let mut segments = Vec::new();
    let mut pending: Option<Connective> = None;
    let mut current: Vec<String> = Vec::new();

    for word in raw_words(input) {
        let connective = match word.as_str() {
            "AND" => Some(Connective::And),
            "OR" => Some(Connective::Or),
            _ => None,
        };

        match connective {
            Some(next) => {
                if !current.is_empty() {
                    segments.push((pending, current.join(" ")));
                    current.clear();
                }
                pending = Some(next);
            }
            None => current.push(word),
        }
    }

    if !current.is_empty() {
        segments.push((pending, current.join(" ")));
    }
    segments
}

/// Finds the leftmost operator outside quotes, preferring the longest at a position.
pub fn split_operator(segment: &str) -> Option<(String, Op, String)> {
    let mut quote: Option<char> = None;

    for (index, ch) in segment.char_indices() {
        match quote {
            Some(open) if ch == open => {
                quote = None;
                continue;
            }
            Some(_) => continue,
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                continue;
            }
            None => {}
        }

        let rest = &segment[index..];
        for (symbol, op) in OPERATORS {
            if rest.starts_with(symbol) {
                let field = segment[..index].trim();
                if field.is_empty() {
                    return None;
                }
                let value = unquote(&rest[symbol.len()..]);
                return Some((field.to_string(), op, value.to_string()));
            }
        }
    }

    None
}
