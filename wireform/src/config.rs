//! Runtime configuration: aliases, the decode allow-list, default concrete
//! collection kinds, type proxies, the field-name collision policy, and the
//! wire-name conventions of the self-describing formats.
//!
//! A config is mutable while a core is being set up and is only ever queried
//! during encode/decode. Mutation requires `&mut` access to the core, so the
//! borrow checker enforces the read-only-after-first-use rule.

use std::collections::{HashMap, HashSet};

use crate::name;

/// Which concrete sequence container owns an abstract `List<E>` identifier on
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {
    /// `Vec<E>`.
    Growable,
    /// `VecDeque<E>`.
    Deque,
}

/// Which concrete set container owns an abstract `Set<E>` identifier on
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    /// `HashSet<E>`.
    Hashed,
    /// `BTreeSet<E>`.
    Sorted,
}

/// Which concrete map container owns an abstract `Map<K,V>` identifier on
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// `HashMap<K,V>`.
    Hashed,
    /// `BTreeMap<K,V>`.
    Sorted,
}

/// The configurable names used by the self-describing wire forms.
#[derive(Debug, Clone)]
pub struct WireNames {
    /// JSON key carrying the type tag of a polymorphic value.
    pub tag_key: String,
    /// JSON key carrying the payload of a polymorphic value.
    pub payload_key: String,
    /// Key field name of a general map entry record.
    pub entry_key: String,
    /// Value field name of a general map entry record.
    pub entry_value: String,
    /// XML attribute carrying a type tag.
    pub xml_type_attr: String,
    /// XML attribute marking a null element.
    pub xml_null_attr: String,
    /// XML element name of a general map entry.
    pub xml_entry: String,
    /// XML child element holding a general map entry's key.
    pub xml_key: String,
    /// XML child element holding a general map entry's value.
    pub xml_value: String,
    /// Name of the XML root element. Configurable independently of
    /// [`WireNames::xml_entry`].
    pub xml_root: String,
}

impl Default for WireNames {
    fn default() -> Self {
        Self {
            tag_key: "@type".to_string(),
            payload_key: "@value".to_string(),
            entry_key: "@key".to_string(),
            entry_value: "@value".to_string(),
            xml_type_attr: "type".to_string(),
            xml_null_attr: "null".to_string(),
            xml_entry: "_".to_string(),
            xml_key: "key".to_string(),
            xml_value: "value".to_string(),
            xml_root: "value".to_string(),
        }
    }
}

/// Configuration queried by the codec core during encode/decode.
#[derive(Debug)]
pub struct Config {
    aliases: HashMap<String, String>,
    allowed_namespaces: HashSet<String>,
    allowed_types: HashSet<String>,
    proxies: HashMap<String, String>,
    default_seq: SeqKind,
    default_set: SetKind,
    default_map: MapKind,
    rename_prefix: String,
    names: WireNames,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            allowed_namespaces: HashSet::new(),
            allowed_types: HashSet::new(),
            proxies: HashMap::new(),
            default_seq: SeqKind::Growable,
            default_set: SetKind::Hashed,
            default_map: MapKind::Hashed,
            rename_prefix: "_".to_string(),
            names: WireNames::default(),
        }
    }
}

impl Config {
    /// Registers an alternate spelling for a canonical identifier. Encoding
    /// always writes the canonical form; decoding accepts either.
    pub fn add_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Resolves an identifier through the alias table. Unknown identifiers
    /// pass through unchanged.
    pub fn resolve_alias<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map_or(id, String::as_str)
    }

    /// Permits every identifier in a dotted namespace as a decode target.
    pub fn allow_namespace(&mut self, namespace: impl Into<String>) {
        self.allowed_namespaces.insert(namespace.into());
    }

    /// Permits a single identifier as a decode target.
    pub fn allow_type(&mut self, id: impl Into<String>) {
        self.allowed_types.insert(id.into());
    }

    /// Whether an identifier may be used as a polymorphic decode target. The
    /// base identifier and every type argument must be allowed; malformed
    /// identifiers are rejected outright.
    pub fn is_allowed(&self, id: &str) -> bool {
        name::parse(id).is_some_and(|parsed| self.parsed_allowed(&parsed))
    }

    fn parsed_allowed(&self, parsed: &name::Parsed<'_>) -> bool {
        let base_ok = self.allowed_types.contains(parsed.base)
            || name::namespace(parsed.base)
                .is_some_and(|ns| self.allowed_namespaces.contains(ns));
        base_ok && parsed.args.iter().all(|arg| self.parsed_allowed(arg))
    }

    /// Redirects a concrete identifier to a surrogate identifier. The
    /// surrogate is written as the type tag on encode, and incoming tags
    /// naming the concrete identifier resolve to the surrogate on decode.
    pub fn add_proxy(&mut self, concrete: impl Into<String>, surrogate: impl Into<String>) {
        self.proxies.insert(concrete.into(), surrogate.into());
    }

    /// Applies the proxy table, then the structural container rewrite
    /// (`Deque` to `List` and friends).
    pub fn proxied<'a>(&'a self, id: &'a str) -> std::borrow::Cow<'a, str> {
        if let Some(target) = self.proxies.get(id) {
            return std::borrow::Cow::Borrowed(target);
        }
        match name::surrogate(id) {
            Some(public) => std::borrow::Cow::Owned(public),
            None => std::borrow::Cow::Borrowed(id),
        }
    }

    pub fn default_seq(&self) -> SeqKind {
        self.default_seq
    }

    pub fn set_default_seq(&mut self, kind: SeqKind) {
        self.default_seq = kind;
    }

    pub fn default_set(&self) -> SetKind {
        self.default_set
    }

    pub fn set_default_set(&mut self, kind: SetKind) {
        self.default_set = kind;
    }

    pub fn default_map(&self) -> MapKind {
        self.default_map
    }

    pub fn set_default_map(&mut self, kind: MapKind) {
        self.default_map = kind;
    }

    /// The prefix prepended to a field name until it no longer collides with
    /// an earlier field of the same record.
    pub fn rename_prefix(&self) -> &str {
        &self.rename_prefix
    }

    pub fn set_rename_prefix(&mut self, prefix: impl Into<String>) {
        self.rename_prefix = prefix.into();
    }

    pub fn names(&self) -> &WireNames {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut WireNames {
        &mut self.names
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allow_list_covers_type_arguments() {
        let mut config = Config::default();
        config.allow_type("List");
        config.allow_type("i32");
        assert!(config.is_allowed("List<i32>"));
        assert!(!config.is_allowed("List<demo.Widget>"));
        config.allow_namespace("demo");
        assert!(config.is_allowed("List<demo.Widget>"));
    }

    #[test]
    fn malformed_identifiers_are_disallowed() {
        let mut config = Config::default();
        config.allow_type("List");
        assert!(!config.is_allowed("List<"));
        assert!(!config.is_allowed(""));
    }

    #[test]
    fn proxies_apply_before_the_structural_rewrite() {
        let mut config = Config::default();
        config.add_proxy("demo.Hidden", "demo.Public");
        assert_eq!(config.proxied("demo.Hidden"), "demo.Public");
        assert_eq!(config.proxied("Deque<i32>"), "List<i32>");
        assert_eq!(config.proxied("demo.Other"), "demo.Other");
    }
}
