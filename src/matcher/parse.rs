use once_cell::sync::Lazy;
use regex::Regex;

static STREET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s+([A-Za-z][A-Za-z .'-]*)").expect("street pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedStreet {
    pub number: Option<String>,
    pub name: String,
}

/// First and last whitespace-separated tokens; middle tokens are ignored.
pub fn parse_name(raw: &str) -> Option<ParsedName> {
    let mut tokens = raw.split_whitespace();
    let first = tokens.next()?;
    let last = tokens.last().unwrap_or(first);
    Some(ParsedName {
        first: first.to_string(),
        last: last.to_string(),
    })
}

/// Leading house number and street words of the first comma segment.
pub fn parse_street(raw: &str) -> ParsedStreet {
    let segment = raw.split(',').next().unwrap_or_default();
    match STREET_PATTERN.captures(segment) {
        Some(captures) => ParsedStreet {
            number: captures.get(1).map(|m| m.as_str().to_string()),
            name: captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        },
        None => ParsedStreet::default(),
    }
}
