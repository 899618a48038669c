use std::{collections::BTreeMap, fmt, io::Read, sync::Arc};

use log::warn;

use crate::{
    dictionary::{Dictionary, Pattern},
    ngram::bigrams,
};

#[derive(Clone, Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    terminal: bool,
    score: Option<u32>,
}

impl TrieNode {
    fn add_sequence(&mut self, word: &str, score: Option<u32>) -> bool {
        let mut node = self;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
        }
        let added = !node.terminal;
        node.terminal = true;
        if score.is_some() {
            node.score = score;
        }
        added
    }

    fn find(&self, word: &str) -> Option<&TrieNode> {
        let mut node = self;
        for c in word.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    fn count(&self, pattern: &[Option<char>]) -> usize {
        match pattern.split_first() {
            None => usize::from(self.terminal),
            Some((Some(c), rest)) => self.children.get(c).map_or(0, |child| child.count(rest)),
            Some((None, rest)) => self.children.values().map(|child| child.count(rest)).sum(),
        }
    }

    fn display_helper(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for (c, child) in &self.children {
            for _ in 0..depth {
                write!(f, "\t")?;
            }
            write!(f, "{}", c)?;
            if child.terminal {
                write!(f, "'")?;
            }
            writeln!(f)?;
            child.display_helper(f, depth + 1)?;
        }
        Ok(())
    }
}

/// In-memory word source backed by a trie. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct WordList {
    root: Arc<TrieNode>,
    len: usize,
}

impl fmt::Display for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.display_helper(f, 0)
    }
}

impl WordList {
    pub fn build(words: Vec<String>) -> WordList {
        WordList::from_entries(words.into_iter().map(|word| (word, None)))
    }

    /// Words with an explicit preference weight, higher preferred.
    pub fn with_scores(words: Vec<(String, u32)>) -> WordList {
        WordList::from_entries(words.into_iter().map(|(word, score)| (word, Some(score))))
    }

    /// Weights each word by its rarest bigram, so words made of common letter pairs are tried
    /// first.
    pub fn scored_by_bigrams(words: Vec<String>) -> WordList {
        let bigrams = bigrams(&words);
        let scored = words
            .into_iter()
            .map(|word| {
                let score = word
                    .chars()
                    .zip(word.chars().skip(1))
                    .map(|pair| *bigrams.get(&pair).unwrap_or(&0))
                    .min()
                    .unwrap_or(0);
                let score = u32::try_from(score).unwrap_or(u32::MAX);
                (word, score)
            })
            .collect();
        WordList::with_scores(scored)
    }

    fn from_entries<I: Iterator<Item = (String, Option<u32>)>>(entries: I) -> WordList {
        let mut root = TrieNode::default();
        let mut len = 0;
        for (word, score) in entries {
            if word.is_empty() {
                continue;
            }
            if root.add_sequence(&word, score) {
                len += 1;
            }
        }
        WordList {
            root: Arc::new(root),
            len,
        }
    }

    /// One word per line, optionally followed by `;score`. Blank lines and lines starting
    /// with `#` are skipped; words are uppercased.
    pub fn parse(text: &str) -> WordList {
        let entries = text.lines().filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match line.split_once(';') {
                Some((word, score)) => {
                    let score = match score.trim().parse::<u32>() {
                        Ok(score) => Some(score),
                        Err(e) => {
                            warn!("ignoring score {:?} of {:?}: {}", score, word, e);
                            None
                        }
                    };
                    Some((word.trim().to_uppercase(), score))
                }
                None => Some((line.to_uppercase(), None)),
            }
        });
        WordList::from_entries(entries)
    }

    /// A JSON array of words, the format of the `wordlist.json` files.
    pub fn from_json<R: Read>(reader: R) -> Result<WordList, serde_json::Error> {
        let words: Vec<String> = serde_json::from_reader(reader)?;
        Ok(WordList::build(
            words.into_iter().map(|w| w.to_uppercase()).collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self, pattern: &Pattern) -> Vec<String> {
        self.iter(pattern).collect()
    }

    pub fn is_viable(&self, pattern: &Pattern) -> bool {
        self.iter(pattern).next().is_some()
    }

    fn iter(&self, pattern: &Pattern) -> Matches<'_> {
        Matches {
            pattern: pattern.letters().to_vec(),
            stack: vec![(&*self.root, String::new(), 0)],
        }
    }
}

/// Depth-first walk in lexicographic order, expanding only branches the pattern allows.
struct Matches<'a> {
    pattern: Vec<Option<char>>,
    stack: Vec<(&'a TrieNode, String, usize)>,
}

impl<'a> Iterator for Matches<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some((node, prefix, depth)) = self.stack.pop() {
            if depth == self.pattern.len() {
                if node.terminal {
                    return Some(prefix);
                }
                continue;
            }
            match self.pattern[depth] {
                Some(c) => {
                    if let Some(child) = node.children.get(&c) {
                        let mut next = prefix;
                        next.push(c);
                        self.stack.push((child, next, depth + 1));
                    }
                }
                None => {
                    for (c, child) in node.children.iter().rev() {
                        let mut next = prefix.clone();
                        next.push(*c);
                        self.stack.push((child, next, depth + 1));
                    }
                }
            }
        }
        None
    }
}

impl Dictionary for WordList {
    fn contains(&self, word: &str) -> bool {
        self.root.find(word).map_or(false, |node| node.terminal)
    }

    fn matching<'a>(&'a self, pattern: &Pattern) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(self.iter(pattern))
    }

    fn count_matching(&self, pattern: &Pattern) -> Option<usize> {
        Some(self.root.count(pattern.letters()))
    }

    fn frequency(&self, word: &str) -> Option<u32> {
        self.root
            .find(word)
            .filter(|node| node.terminal)
            .and_then(|node| node.score)
    }
}

#[cfg(test)]
mod tests {
    use super::WordList;
    use crate::dictionary::{Dictionary, Pattern};

    fn basses() -> WordList {
        WordList::build(vec![
            String::from("BASS"),
            String::from("BATS"),
            String::from("BESS"),
            String::from("BE"),
        ])
    }

    #[test]
    fn build_works() {
        let list = WordList::build(vec![
            String::from("ASDF"),
            String::from("ASSET"),
            String::from("BASS"),
            String::from("BASEBALL"),
            String::from("BASSOOON"),
            String::from("BASSET"),
            String::from("BASS"),
        ]);
        assert_eq!(6, list.len());
        println!("{}", list);
    }

    #[test]
    fn words_works() {
        let list = basses();

        assert_eq!(
            vec![String::from("BASS"), String::from("BESS")],
            list.words(&Pattern::from("B SS")),
        );
        assert_eq!(
            vec![String::from("BASS"), String::from("BATS"), String::from("BESS")],
            list.words(&Pattern::unknown(4)),
        );
        assert!(list.words(&Pattern::unknown(3)).is_empty());
        assert_eq!(Some(3), list.count_matching(&Pattern::unknown(4)));
        assert_eq!(Some(1), list.count_matching(&Pattern::from("BE")));
    }

    #[test]
    fn contains_works() {
        let list = basses();

        assert!(list.contains("BASS"));
        assert!(list.contains("BATS"));
        assert!(list.contains("BE"));
        assert!(!list.contains("BAT"));
        assert!(!list.contains("BASSO"));
    }

    #[test]
    fn is_viable_works() {
        let list = basses();

        assert!(list.is_viable(&Pattern::from("BA S")));
        assert!(!list.is_viable(&Pattern::from("BA Q")));
        assert!(!list.is_viable(&Pattern::from("B   S")));
    }

    #[test]
    fn parse_works() {
        let list = WordList::parse(
            "
# scored list
bass;50
BATS ; 10
bess;lots
be
",
        );

        assert_eq!(4, list.len());
        assert!(list.contains("BASS"));
        assert_eq!(Some(50), list.frequency("BASS"));
        assert_eq!(Some(10), list.frequency("BATS"));
        assert_eq!(None, list.frequency("BESS"));
        assert_eq!(None, list.frequency("BE"));
        assert_eq!(None, list.frequency("B"));
    }

    #[test]
    fn from_json_works() {
        let list = WordList::from_json(r#"["cat", "ARE", "ten"]"#.as_bytes()).unwrap();
        assert_eq!(3, list.len());
        assert!(list.contains("TEN"));
        assert!(WordList::from_json("{}".as_bytes()).is_err());
    }

    #[test]
    fn bigram_scores_prefer_common_pairs() {
        let list = WordList::scored_by_bigrams(vec![
            String::from("ABC"),
            String::from("ABRACADABRA"),
            String::from("XQZ"),
        ]);

        // AB appears three times, BC once
        assert_eq!(Some(1), list.frequency("ABC"));
        assert_eq!(Some(1), list.frequency("XQZ"));
        assert_eq!(Some(1), list.frequency("ABRACADABRA"));

        let list = WordList::scored_by_bigrams(vec![String::from("AB"), String::from("AB")]);
        assert_eq!(Some(2), list.frequency("AB"));
    }
}
