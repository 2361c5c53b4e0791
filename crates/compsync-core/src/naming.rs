// ── Component name helpers ──
//
// Natural ordering ("eth2" before "eth10") and the normalizations used to
// pair names across device and template.

use std::cmp::Ordering;

/// One run of a name split for natural comparison.
#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(name: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;
    for (i, ch) in name.char_indices() {
        let digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                out.push(chunk(&name[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(digit) = in_digits {
        out.push(chunk(&name[start..], digit));
    }
    out
}

fn chunk(s: &str, digit: bool) -> Chunk<'_> {
    if digit { Chunk::Digits(s) } else { Chunk::Text(s) }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Compare two names so embedded numbers sort by value.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(&cb) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => compare_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len()).then_with(|| a.cmp(b))
}

/// Pairing key under the configured case sensitivity.
pub fn match_key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_owned()
    } else {
        name.to_lowercase()
    }
}

/// Loose form used to detect names that differ only by case or
/// surrounding whitespace.
pub fn loose_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_sort_by_value() {
        let mut names = vec!["eth10", "eth2", "eth1", "Eth3", "mgmt0"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["eth1", "eth2", "Eth3", "eth10", "mgmt0"]);
    }

    #[test]
    fn slash_separated_port_names() {
        let mut names = vec!["Gi1/0/10", "Gi1/0/9", "Gi1/1/1", "Gi1/0/1"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["Gi1/0/1", "Gi1/0/9", "Gi1/0/10", "Gi1/1/1"]);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("eth", "eth0"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
        assert_eq!(natural_cmp("a01", "a1"), Ordering::Greater);
    }

    #[test]
    fn loose_key_trims_and_folds() {
        assert_eq!(loose_key(" ETH0 "), "eth0");
        assert_eq!(match_key("Eth0", false), "eth0");
        assert_eq!(match_key("Eth0", true), "Eth0");
    }
}
