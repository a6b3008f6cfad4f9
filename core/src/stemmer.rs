//! Porter-style affix stripping for English words.
//!
//! The word is cleaned (letters and digits only, lowercased), a single known
//! prefix is removed, then five suffix steps run in order. Each step sees the
//! output of the previous one.

const PREFIXES: [&str; 9] = ["kilo", "micro", "milli", "intra", "ultra", "mega", "nano", "pico", "pseudo"];

const STEP2_RULES: [(&str, &str); 22] = [
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("iser", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("isation", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
];

const STEP3_RULES: [(&str, &str); 8] = [
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("alise", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4_SUFFIXES: [&str; 21] = [
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "sion", "tion", "ou", "ism",
    "ate", "iti", "ous", "ive", "ize", "ise",
];

/// Stateless stemmer. Cheap to construct and `Copy`, so it can be owned by
/// every component that needs one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stemmer;

impl Stemmer {
    pub fn new() -> Self {
        Stemmer
    }

    pub fn stem(&self, word: &str) -> String {
        stem(word)
    }
}

pub fn stem(word: &str) -> String {
    let cleaned: Vec<char> = word.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
    if cleaned.len() <= 2 {
        return cleaned.into_iter().collect();
    }
    let mut w = strip_prefix(cleaned);
    if !w.is_empty() {
        w = step1(w);
        let steps: [fn(Vec<char>) -> Vec<char>; 4] = [step2, step3, step4, step5];
        for step in steps {
            if w.is_empty() {
                break;
            }
            w = step(w);
        }
    }
    w.into_iter().collect()
}

fn is_vowel(ch: char, prev: char) -> bool {
    match ch {
        'a' | 'e' | 'i' | 'o' | 'u' => true,
        'y' => !matches!(prev, 'a' | 'e' | 'i' | 'o' | 'u'),
        _ => false,
    }
}

fn vowel_at(w: &[char], i: usize) -> bool {
    let prev = if i > 0 { w[i - 1] } else { 'a' };
    is_vowel(w[i], prev)
}

/// Number of consonant-run to vowel-run transitions.
fn measure(w: &[char]) -> usize {
    let len = w.len();
    let mut i = 0;
    let mut count = 0;
    while i < len {
        while i < len && !vowel_at(w, i) {
            i += 1;
        }
        i += 1;
        while i < len && vowel_at(w, i) {
            i += 1;
        }
        if i < len {
            count += 1;
            i += 1;
        }
    }
    count
}

fn contains_vowel(w: &[char]) -> bool {
    (0..w.len()).any(|i| vowel_at(w, i))
}

/// Ends consonant-vowel-consonant, the last consonant not w, x or y.
fn cvc(w: &[char]) -> bool {
    let len = w.len();
    if len < 3 {
        return false;
    }
    let last = w[len - 1];
    if is_vowel(last, w[len - 2]) || matches!(last, 'w' | 'x' | 'y') || !is_vowel(w[len - 2], w[len - 3]) {
        return false;
    }
    if len == 3 {
        !is_vowel(w[0], '?')
    } else {
        !is_vowel(w[len - 3], w[len - 4])
    }
}

/// The stem left after removing `suffix`, if `w` ends with it and is strictly longer.
fn suffix_stem<'a>(w: &'a [char], suffix: &str) -> Option<&'a [char]> {
    let n = suffix.chars().count();
    if w.len() <= n {
        return None;
    }
    let (stem, tail) = w.split_at(w.len() - n);
    tail.iter().copied().eq(suffix.chars()).then_some(stem)
}

fn with_suffix(stem: &[char], replacement: &str) -> Vec<char> {
    stem.iter().copied().chain(replacement.chars()).collect()
}

fn strip_prefix(w: Vec<char>) -> Vec<char> {
    for prefix in PREFIXES {
        let n = prefix.chars().count();
        if w.len() >= n && w[..n].iter().copied().eq(prefix.chars()) {
            return w[n..].to_vec();
        }
    }
    w
}

fn step1(mut w: Vec<char>) -> Vec<char> {
    if w.last() == Some(&'s') {
        if suffix_stem(&w, "sses").is_some() || suffix_stem(&w, "ies").is_some() {
            w.truncate(w.len() - 2);
        } else if w.len() == 1 {
            return Vec::new();
        } else if w[w.len() - 2] != 's' {
            w.pop();
        }
    }

    if let Some(stem) = suffix_stem(&w, "eed") {
        if measure(stem) > 0 {
            w.pop();
        }
    } else if let Some(stem_len) = suffix_stem(&w, "ed").or_else(|| suffix_stem(&w, "ing")).map(<[char]>::len) {
        if contains_vowel(&w[..stem_len]) {
            w.truncate(stem_len);
            if w.len() == 1 {
                return w;
            }
            if ["at", "bl", "iz"].iter().any(|s| suffix_stem(&w, s).is_some()) {
                w.push('e');
            } else {
                let len = w.len();
                let last = w[len - 1];
                if last == w[len - 2] && !matches!(last, 'l' | 's' | 'z') {
                    w.pop();
                } else if measure(&w) == 1 && cvc(&w) {
                    w.push('e');
                }
            }
        }
    }

    if let Some(stem) = suffix_stem(&w, "y") {
        if contains_vowel(stem) {
            let len = w.len();
            w[len - 1] = 'i';
        }
    }
    w
}

fn apply_rules(w: Vec<char>, rules: &[(&str, &str)]) -> Vec<char> {
    for (suffix, replacement) in rules {
        if let Some(stem) = suffix_stem(&w, suffix) {
            if measure(stem) > 0 {
                return with_suffix(stem, replacement);
            }
        }
    }
    w
}

fn step2(w: Vec<char>) -> Vec<char> {
    apply_rules(w, &STEP2_RULES)
}

fn step3(w: Vec<char>) -> Vec<char> {
    apply_rules(w, &STEP3_RULES)
}

fn step4(w: Vec<char>) -> Vec<char> {
    for suffix in STEP4_SUFFIXES {
        if let Some(stem) = suffix_stem(&w, suffix) {
            if measure(stem) > 1 {
                return stem.to_vec();
            }
        }
    }
    w
}

fn step5(mut w: Vec<char>) -> Vec<char> {
    if w.last() == Some(&'e') {
        let m = measure(&w);
        if m > 1 || (m == 1 && !cvc(&w[..w.len() - 1])) {
            w.pop();
        }
    }
    if w.len() == 1 {
        return w;
    }
    let len = w.len();
    if len >= 2 && w[len - 1] == 'l' && w[len - 2] == 'l' && measure(&w) > 1 {
        w.pop();
    }
    w
}
