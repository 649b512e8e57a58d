//! Case-insensitive trie dictionary used for every name lookup in the
//! assembler (mnemonics, directives, SPR aliases).
//!
//! Each dictionary allows `[a-z]` and `[0-9]` plus a small fixed set of
//! extra, non-alphanumeric characters — mnemonics allow `. _`, extended
//! mnemonics additionally allow `+ -`, directives and SPR aliases allow
//! `_`. That set is part of the dictionary's type, via [`ExtraChars`], so a
//! dictionary can never accidentally be built with the wrong character
//! class for its domain.

use std::collections::HashMap;
use std::marker::PhantomData;

/// The set of additional characters one particular dictionary allows
/// besides `[a-z0-9]`.
pub trait ExtraChars {
    const CHARS: &'static [char];
}

pub struct Underscore;
impl ExtraChars for Underscore {
    const CHARS: &'static [char] = &['_'];
}

pub struct MnemonicChars;
impl ExtraChars for MnemonicChars {
    const CHARS: &'static [char] = &['.', '_'];
}

pub struct ExtendedMnemonicChars;
impl ExtraChars for ExtendedMnemonicChars {
    const CHARS: &'static [char] = &['.', '_', '+', '-'];
}

struct TrieNode<V> {
    children: HashMap<char, usize>,
    value: Option<V>,
}

impl<V> TrieNode<V> {
    fn new() -> Self {
        TrieNode {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// A trie mapping case-insensitive keys to values `V`. Built once, offline,
/// from a static list (see e.g. `tables::mnemonic_tokens`); immutable and
/// lock-free to query afterwards. Lookups never allocate.
pub struct CaseInsensitiveDict<V, E: ExtraChars> {
    nodes: Vec<TrieNode<V>>,
    _extra: PhantomData<E>,
}

impl<V, E: ExtraChars> CaseInsensitiveDict<V, E> {
    pub fn new() -> Self {
        CaseInsensitiveDict {
            nodes: vec![TrieNode::new()],
            _extra: PhantomData,
        }
    }

    fn is_allowed(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || E::CHARS.contains(&c)
    }

    /// Insert `key` with value `val`. Panics if `key` contains a character
    /// outside this dictionary's allowed set, or if `key` is already
    /// present — both indicate a bug in the static table, not user input.
    pub fn add(&mut self, key: &str, val: V) {
        let mut cur = 0usize;
        for ch in key.chars() {
            let c = ch.to_ascii_lowercase();
            assert!(
                Self::is_allowed(c),
                "character '{}' not permitted in this dictionary (key {:?})",
                c,
                key
            );
            cur = match self.nodes[cur].children.get(&c) {
                Some(&next) => next,
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(TrieNode::new());
                    self.nodes[cur].children.insert(c, idx);
                    idx
                }
            };
        }
        assert!(
            self.nodes[cur].value.is_none(),
            "duplicate dictionary entry {:?}",
            key
        );
        self.nodes[cur].value = Some(val);
    }

    /// Look up `key`, case-insensitively. Returns `None` if any character
    /// isn't in this dictionary's trie, or if `key` doesn't name a
    /// terminal node.
    pub fn find(&self, key: &str) -> Option<&V> {
        let mut cur = 0usize;
        for ch in key.chars() {
            let c = ch.to_ascii_lowercase();
            cur = *self.nodes[cur].children.get(&c)?;
        }
        self.nodes[cur].value.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut dict: CaseInsensitiveDict<u32, MnemonicChars> = CaseInsensitiveDict::new();
        dict.add("add", 1);
        dict.add("add.", 2);
        dict.add("addi", 3);

        assert_eq!(dict.find("ADD"), Some(&1));
        assert_eq!(dict.find("Add."), Some(&2));
        assert_eq!(dict.find("ADDI"), Some(&3));
        assert_eq!(dict.find("addis"), None);
        assert_eq!(dict.find("ad"), None);
    }

    #[test]
    #[should_panic]
    fn disallowed_char_panics() {
        let mut dict: CaseInsensitiveDict<u32, Underscore> = CaseInsensitiveDict::new();
        dict.add("mt+spr", 1);
    }
}
