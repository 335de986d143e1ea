use crate::types::Link;
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// One compiled link-filter rule.
///
/// Rules are scoped either to a link's URL or to its anchor text, and match
/// either with a regular expression or by case-insensitive literal equality.
#[derive(Debug, Clone)]
pub enum Rule {
    UrlRegex(Regex),
    UrlLiteral(String),
    TextRegex(Regex),
    TextLiteral(String),
}

impl Rule {
    fn matches(&self, link: &Link) -> bool {
        match self {
            Rule::UrlRegex(re) => re.is_match(&link.url),
            Rule::UrlLiteral(lit) => link.url.to_lowercase() == *lit,
            Rule::TextRegex(re) => re.is_match(&link.text),
            Rule::TextLiteral(lit) => link.text.to_lowercase() == *lit,
        }
    }
}

/// An ordered set of rules compiled from user-authored rule text, one rule
/// per non-blank line. An empty set places no restriction at all: it matches
/// every link.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compiles rule text. Lines that parse to nothing usable are dropped;
    /// if no line survives, the resulting set is empty (match-everything).
    pub fn compile(text: &str) -> Self {
        let rules: Vec<Rule> = text.trim().lines().filter_map(compile_line).collect();
        debug!("Compiled {} rules from rule text", rules.len());
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if any rule matches the link, or if the set is empty.
    pub fn matches(&self, link: &Link) -> bool {
        if self.rules.is_empty() {
            return true;
        }

        self.rules.iter().any(|rule| rule.matches(link))
    }
}

/// Compiles a single rule line.
///
/// A `$text:` prefix scopes the rule to anchor text instead of the URL.
/// URL-scoped patterns keep only their first whitespace-delimited token, so
/// trailing comments on a line don't end up inside the pattern. A pattern in
/// `/pattern/flags` form becomes a regex rule; anything else, including a
/// slash form that fails to compile, becomes a literal rule.
fn compile_line(line: &str) -> Option<Rule> {
    let mut line = line.trim();
    if line.is_empty() {
        return None;
    }

    let text_scope = match line.strip_prefix("$text:") {
        Some(rest) => {
            line = rest;
            true
        }
        None => false,
    };

    let pattern = if text_scope {
        // Anchor text may legitimately contain spaces.
        line.to_string()
    } else {
        line.split_whitespace().next()?.to_string()
    };

    if pattern.starts_with('/')
        && let Some(re) = parse_slash_regex(&pattern)
    {
        return Some(if text_scope {
            Rule::TextRegex(re)
        } else {
            Rule::UrlRegex(re)
        });
    }

    let literal = pattern.to_lowercase();
    Some(if text_scope {
        Rule::TextLiteral(literal)
    } else {
        Rule::UrlLiteral(literal)
    })
}

/// Parses a `/pattern/flags` literal into a compiled regex, or None if the
/// form or the pattern itself doesn't parse.
fn parse_slash_regex(pattern: &str) -> Option<Regex> {
    let unescaped = pattern.replace("\\/", "/");
    let body = unescaped.strip_prefix('/')?;
    let (body, flags) = body.rsplit_once('/')?;

    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            // Flags that exist in the authoring syntax but have no bearing
            // on a single is_match call.
            'g' | 'u' | 'y' | 'd' | 'v' => {}
            _ => return None,
        }
    }

    builder.build().ok()
}
