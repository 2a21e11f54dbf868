//! Selector predicates over entities.
//!
//! A selector is a comma-separated list of compounds; an entity matches when
//! any compound matches. A compound is an optional kind (`*`, `entity`,
//! `player`) followed by any number of `#name`, `.tag`, `[prop]` and
//! `[prop=value]` tests, all of which must hold.
//!
//! ```rust
//! use bloxim_core::{EntityConfig, EntityStore, Selector};
//!
//! let mut store = EntityStore::new(8);
//! let id = store.create(EntityConfig::default().named("door").with_tag("red")).unwrap();
//! let selector = Selector::parse("#door.red, .blue").unwrap();
//! assert!(selector.matches(store.get(id).unwrap(), store.interner()));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::entity::{EntityRecord, TagInterner};
use crate::error::SelectorError;

/// Which entities a compound considers before its tests run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorKind {
    /// Every entity.
    Any,
    /// Only entities linked to a player.
    Player,
}

/// One `[name]` or `[name=value]` test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeTest {
    /// Property name.
    pub name: String,
    /// Required value; `None` only tests presence (or truth, for flags).
    pub value: Option<String>,
}

/// A conjunction of tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compound {
    /// Kind filter.
    pub kind: SelectorKind,
    /// `#name` test.
    pub name: Option<String>,
    /// `.tag` tests.
    pub tags: Vec<String>,
    /// `[attr]` tests.
    pub attributes: Vec<AttributeTest>,
}

/// A parsed selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Parses a selector string.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] pointing at the offending byte offset.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser { src: source, pos: 0 };
        let mut alternatives = vec![parser.compound()?];
        loop {
            parser.skip_ws();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.pos += 1;
                    alternatives.push(parser.compound()?);
                }
                Some(ch) => {
                    return Err(SelectorError::UnexpectedChar {
                        ch,
                        offset: parser.pos,
                    })
                }
            }
        }
        Ok(Self {
            source: source.to_owned(),
            alternatives,
        })
    }

    /// The string this selector was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The alternatives of the union.
    #[must_use]
    pub fn alternatives(&self) -> &[Compound] {
        &self.alternatives
    }

    /// Evaluates the selector against an entity. Destroyed entities never match.
    #[must_use]
    pub fn matches(&self, record: &EntityRecord, interner: &TagInterner) -> bool {
        !record.destroyed
            && self
                .alternatives
                .iter()
                .any(|c| compound_matches(c, record, interner))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn compound_matches(compound: &Compound, record: &EntityRecord, interner: &TagInterner) -> bool {
    if compound.kind == SelectorKind::Player && !record.is_player() {
        return false;
    }
    if let Some(name) = &compound.name {
        if record.name.as_deref() != Some(name.as_str()) {
            return false;
        }
    }
    let tags_ok = compound.tags.iter().all(|tag| {
        interner
            .lookup(tag)
            .is_some_and(|tag_id| record.tags.contains(tag_id))
    });
    tags_ok
        && compound
            .attributes
            .iter()
            .all(|attr| attribute_matches(attr, record))
}

fn attribute_matches(attr: &AttributeTest, record: &EntityRecord) -> bool {
    let flag = match attr.name.as_str() {
        "fixed" => Some(record.fixed),
        "collides" => Some(record.collides),
        "gravity" => Some(record.gravity),
        "player" => Some(record.is_player()),
        "enable_damage" => Some(record.health.enable_damage),
        _ => None,
    };
    match (flag, &attr.value) {
        (Some(flag), None) => flag,
        (Some(flag), Some(value)) => value.parse::<bool>().is_ok_and(|v| v == flag),
        (None, None) => record.props.contains_key(&attr.name),
        (None, Some(value)) => record.props.get(&attr.name) == Some(value),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn name_after_sigil(&mut self) -> Result<String, SelectorError> {
        let at = self.pos;
        let name = self.ident();
        if name.is_empty() {
            return Err(SelectorError::MissingName(at));
        }
        Ok(name.to_owned())
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        self.skip_ws();
        let start = self.pos;
        let mut compound = Compound {
            kind: SelectorKind::Any,
            name: None,
            tags: Vec::new(),
            attributes: Vec::new(),
        };
        let mut parts = 0usize;

        match self.peek() {
            Some('*') => {
                self.bump();
                parts += 1;
            }
            Some(c) if c.is_alphabetic() => {
                let word = self.ident();
                compound.kind = match word {
                    "entity" => SelectorKind::Any,
                    "player" => SelectorKind::Player,
                    other => {
                        return Err(SelectorError::UnknownKind {
                            name: other.to_owned(),
                            offset: start,
                        })
                    }
                };
                parts += 1;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.name = Some(self.name_after_sigil()?);
                }
                Some('.') => {
                    self.bump();
                    let tag = self.name_after_sigil()?;
                    compound.tags.push(tag);
                }
                Some('[') => {
                    let open = self.pos;
                    self.bump();
                    compound.attributes.push(self.attribute(open)?);
                }
                _ => break,
            }
            parts += 1;
        }

        if parts == 0 {
            return match self.peek() {
                None | Some(',') => Err(SelectorError::Empty(start)),
                Some(ch) => Err(SelectorError::UnexpectedChar {
                    ch,
                    offset: self.pos,
                }),
            };
        }
        Ok(compound)
    }

    fn attribute(&mut self, open: usize) -> Result<AttributeTest, SelectorError> {
        self.skip_ws();
        let name = self.name_after_sigil()?;
        self.skip_ws();
        let value = match self.bump() {
            Some(']') => return Ok(AttributeTest { name, value: None }),
            Some('=') => {
                self.skip_ws();
                self.value()?
            }
            Some(ch) => {
                return Err(SelectorError::UnexpectedChar {
                    ch,
                    offset: self.pos - ch.len_utf8(),
                })
            }
            None => return Err(SelectorError::UnterminatedAttribute(open)),
        };
        self.skip_ws();
        match self.bump() {
            Some(']') => Ok(AttributeTest {
                name,
                value: Some(value),
            }),
            Some(ch) => Err(SelectorError::UnexpectedChar {
                ch,
                offset: self.pos - ch.len_utf8(),
            }),
            None => Err(SelectorError::UnterminatedAttribute(open)),
        }
    }

    fn value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let open = self.pos;
                self.bump();
                let start = self.pos;
                loop {
                    match self.bump() {
                        Some(c) if c == quote => {
                            return Ok(self.src[start..self.pos - 1].to_owned());
                        }
                        Some(_) => {}
                        None => return Err(SelectorError::UnterminatedQuote(open)),
                    }
                }
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c != ']') {
                    self.bump();
                }
                Ok(self.src[start..self.pos].trim_end().to_owned())
            }
        }
    }
}

/// Parsed selectors keyed by source string.
///
/// Scripts pass the same handful of selector strings every tick; parsing each
/// one once keeps queries allocation-free after the first call.
#[derive(Debug, Default)]
pub struct SelectorCache {
    parsed: HashMap<String, Arc<Selector>>,
}

impl SelectorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached selector for `source`, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Parse failures are returned and not cached.
    pub fn get_or_parse(&mut self, source: &str) -> Result<Arc<Selector>, SelectorError> {
        if let Some(selector) = self.parsed.get(source) {
            return Ok(Arc::clone(selector));
        }
        let selector = Arc::new(Selector::parse(source)?);
        self.parsed.insert(source.to_owned(), Arc::clone(&selector));
        Ok(selector)
    }

    /// Number of cached selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    /// True if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityConfig, EntityStore, PlayerId};

    fn store_with(configs: Vec<EntityConfig>) -> (EntityStore, Vec<crate::EntityId>) {
        let mut store = EntityStore::new(64);
        let ids = configs
            .into_iter()
            .map(|c| store.create(c).unwrap())
            .collect();
        (store, ids)
    }

    fn matching(store: &EntityStore, source: &str) -> Vec<crate::EntityId> {
        let selector = Selector::parse(source).unwrap();
        store
            .iter()
            .filter(|r| selector.matches(r, store.interner()))
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn test_parse_compound() {
        let selector = Selector::parse("player#bob.red.fast[team=\"blue\"][fixed]").unwrap();
        let compound = &selector.alternatives()[0];
        assert_eq!(compound.kind, SelectorKind::Player);
        assert_eq!(compound.name.as_deref(), Some("bob"));
        assert_eq!(compound.tags, vec!["red", "fast"]);
        assert_eq!(compound.attributes.len(), 2);
        assert_eq!(compound.attributes[0].value.as_deref(), Some("blue"));
        assert_eq!(compound.attributes[1].value, None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty(0)));
        assert_eq!(Selector::parse(".a,"), Err(SelectorError::Empty(3)));
        assert_eq!(Selector::parse("#"), Err(SelectorError::MissingName(1)));
        assert_eq!(
            Selector::parse("[team=red"),
            Err(SelectorError::UnterminatedAttribute(0))
        );
        assert_eq!(
            Selector::parse("[team='red]"),
            Err(SelectorError::UnterminatedQuote(6))
        );
        assert!(matches!(
            Selector::parse("monster"),
            Err(SelectorError::UnknownKind { .. })
        ));
        assert!(matches!(
            Selector::parse(".a !"),
            Err(SelectorError::UnexpectedChar { ch: '!', .. })
        ));
    }

    #[test]
    fn test_tag_and_union_matching() {
        let (store, ids) = store_with(vec![
            EntityConfig::default().with_tag("red"),
            EntityConfig::default().with_tag("blue"),
            EntityConfig::default().with_tag("red").with_tag("blue"),
        ]);

        assert_eq!(matching(&store, ".red"), vec![ids[0], ids[2]]);
        assert_eq!(matching(&store, ".red.blue"), vec![ids[2]]);
        assert_eq!(matching(&store, ".red, .blue"), ids);
        assert_eq!(matching(&store, "*"), ids);
        assert!(matching(&store, ".green").is_empty());
    }

    #[test]
    fn test_attribute_matching() {
        let mut door = EntityConfig::default().named("door").fixed();
        door.props.insert("team".into(), "blue".into());
        let (mut store, ids) = store_with(vec![door, EntityConfig::default()]);
        store.set_player(ids[1], Some(PlayerId(7)));

        assert_eq!(matching(&store, "[fixed]"), vec![ids[0]]);
        assert_eq!(matching(&store, "[fixed=false]"), vec![ids[1]]);
        assert_eq!(matching(&store, "[team]"), vec![ids[0]]);
        assert_eq!(matching(&store, "[team=blue]"), vec![ids[0]]);
        assert!(matching(&store, "[team=red]").is_empty());
        assert_eq!(matching(&store, "#door"), vec![ids[0]]);
        assert_eq!(matching(&store, "player"), vec![ids[1]]);
        assert_eq!(matching(&store, "[player]"), vec![ids[1]]);
    }

    #[test]
    fn test_cache_reuses_parse() {
        let mut cache = SelectorCache::new();
        let a = cache.get_or_parse(".red").unwrap();
        let b = cache.get_or_parse(".red").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.get_or_parse("[").is_err());
        assert_eq!(cache.len(), 1);
    }
}
