//! Namespacing of per-component parameter maps.
//!
//! Composite wavefunctions expose the parameters of component `i` as
//! `wf{i}.{name}`. Nested composites simply stack prefixes, e.g.
//! `wf1.wf0.bcoeff2`.

use std::collections::BTreeMap;

use crate::error::QmcError;

/// Prefix every key of each map with its component index and merge them.
pub fn namespaced<V>(parts: impl IntoIterator<Item = BTreeMap<String, V>>) -> BTreeMap<String, V> {
    parts
        .into_iter()
        .enumerate()
        .flat_map(|(i, part)| {
            part.into_iter()
                .map(move |(name, v)| (format!("wf{}.{}", i, name), v))
        })
        .collect()
}

/// Split `wf{i}.{rest}` into `(i, rest)`.
pub fn split_namespace(name: &str) -> Result<(usize, &str), QmcError> {
    let bad = || QmcError::BadNamespace(name.to_string());
    let tail = name.strip_prefix("wf").ok_or_else(bad)?;
    let (index, rest) = tail.split_once('.').ok_or_else(bad)?;
    let index = index.parse::<usize>().map_err(|_| bad())?;
    if rest.is_empty() {
        return Err(bad());
    }
    Ok((index, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_prefixes_component_index() {
        let a = BTreeMap::from([("alpha".to_string(), 1.0)]);
        let b = BTreeMap::from([("alpha".to_string(), 2.0), ("bcoeff0".to_string(), 3.0)]);
        let merged = namespaced([a, b]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["wf0.alpha"], 1.0);
        assert_eq!(merged["wf1.alpha"], 2.0);
        assert_eq!(merged["wf1.bcoeff0"], 3.0);
    }

    #[test]
    fn test_split_namespace() {
        assert_eq!(split_namespace("wf3.acoeff1").unwrap(), (3, "acoeff1"));
        assert_eq!(split_namespace("wf1.wf0.alpha").unwrap(), (1, "wf0.alpha"));
        assert!(split_namespace("alpha").is_err());
        assert!(split_namespace("wfx.alpha").is_err());
        assert!(split_namespace("wf2.").is_err());
    }
}
