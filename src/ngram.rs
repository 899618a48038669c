use rustc_hash::FxHashMap;

pub type Bigrams = FxHashMap<(char, char), usize>;

pub fn bigrams<S: AsRef<str>>(words: &[S]) -> Bigrams {
    let mut result = FxHashMap::default();

    for word in words {
        let word = word.as_ref();
        for bigram in word.chars().zip(word.chars().skip(1)) {
            let count = result.entry(bigram).or_insert(0);
            *count += 1;
        }
    }

    result
}
