//! Canonical type identifiers.
//!
//! Primitives use their short Rust names (`bool`, `i32`, `String`); user
//! types use dotted names chosen at registration (`demo.Person`); collection
//! identifiers are structural (`List<i32>`, `Map<String,i32>`). The functions
//! here build and take apart those identifiers.

/// Identifier of a dynamic slot. Never written to the wire; dynamic slots
/// always carry the identifier of their runtime value instead.
pub const DYNAMIC: &str = "dyn";

pub fn seq(elem: &str) -> String {
    format!("List<{elem}>")
}

pub fn deque(elem: &str) -> String {
    format!("Deque<{elem}>")
}

pub fn set(elem: &str) -> String {
    format!("Set<{elem}>")
}

pub fn sorted_set(elem: &str) -> String {
    format!("SortedSet<{elem}>")
}

pub fn map(key: &str, value: &str) -> String {
    format!("Map<{key},{value}>")
}

pub fn sorted_map(key: &str, value: &str) -> String {
    format!("SortedMap<{key},{value}>")
}

pub fn array(elem: &str) -> String {
    format!("Array<{elem}>")
}

pub fn optional(inner: &str) -> String {
    format!("Option<{inner}>")
}

/// The namespace of a base identifier: everything before the last dot.
/// Bare identifiers (`i32`, `List`) have no namespace.
pub fn namespace(base: &str) -> Option<&str> {
    base.rsplit_once('.').map(|(ns, _)| ns)
}

/// Rewrites the identifier of an alternate concrete container to its public
/// abstract identifier. Everything else passes through unchanged.
///
/// `Deque<E>` goes out as `List<E>`, `SortedSet<E>` as `Set<E>`, and
/// `SortedMap<K,V>` as `Map<K,V>`, so the encoding of a value never depends
/// on which concrete container happened to hold it in memory.
pub fn surrogate(id: &str) -> Option<String> {
    let (base, rest) = split_generic(id)?;
    let public = match base {
        "Deque" => "List",
        "SortedSet" => "Set",
        "SortedMap" => "Map",
        _ => return None,
    };
    Some(format!("{public}<{rest}>"))
}

fn split_generic(id: &str) -> Option<(&str, &str)> {
    let open = id.find('<')?;
    let rest = id[open + 1..].strip_suffix('>')?;
    Some((&id[..open], rest))
}

/// A structurally parsed identifier: a base name plus zero or more type
/// arguments.
#[derive(Debug, PartialEq, Eq)]
pub struct Parsed<'a> {
    pub base: &'a str,
    pub args: Vec<Parsed<'a>>,
}

/// Parses an identifier into its base and type arguments. Returns `None` for
/// malformed input (unbalanced brackets, empty segments).
pub fn parse(id: &str) -> Option<Parsed<'_>> {
    let (parsed, rest) = parse_inner(id)?;
    if rest.is_empty() { Some(parsed) } else { None }
}

fn parse_inner(input: &str) -> Option<(Parsed<'_>, &str)> {
    let base_end = input
        .find(['<', ',', '>'])
        .unwrap_or(input.len());
    let base = &input[..base_end];
    if base.is_empty() {
        return None;
    }
    let mut rest = &input[base_end..];
    let mut args = Vec::new();
    if rest.starts_with('<') {
        loop {
            let (arg, after) = parse_inner(&rest[1..])?;
            args.push(arg);
            rest = after;
            match rest.as_bytes().first() {
                Some(b',') => {}
                Some(b'>') => {
                    rest = &rest[1..];
                    break;
                }
                _ => return None,
            }
        }
    }
    Some((Parsed { base, args }, rest))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_names() {
        let parsed = parse("demo.Person").unwrap();
        assert_eq!(parsed.base, "demo.Person");
        assert!(parsed.args.is_empty());
        assert_eq!(namespace("demo.Person"), Some("demo"));
        assert_eq!(namespace("i32"), None);
    }

    #[test]
    fn nested_generics() {
        let parsed = parse("Map<String,List<i32>>").unwrap();
        assert_eq!(parsed.base, "Map");
        assert_eq!(parsed.args[0].base, "String");
        assert_eq!(parsed.args[1].base, "List");
        assert_eq!(parsed.args[1].args[0].base, "i32");
    }

    #[test]
    fn malformed_names() {
        assert!(parse("List<i32").is_none());
        assert!(parse("List<>").is_none());
        assert!(parse("<i32>").is_none());
        assert!(parse("List<i32>>").is_none());
    }

    #[test]
    fn container_surrogates() {
        assert_eq!(surrogate("Deque<i32>").as_deref(), Some("List<i32>"));
        assert_eq!(
            surrogate("SortedMap<String,i32>").as_deref(),
            Some("Map<String,i32>")
        );
        assert_eq!(surrogate("List<i32>"), None);
        assert_eq!(surrogate("demo.Person"), None);
    }
}
