//! Title collation: case-insensitive, diacritic-folding, numeric-aware.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares two titles the way a reader expects a catalog to be ordered.
///
/// Letters compare case-insensitively with common Latin diacritics folded to
/// their base letter; runs of ASCII digits compare by numeric value, so
/// "Part 2" sorts before "Part 10".
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let folded_a = fold(a);
    let folded_b = fold(b);
    natural_cmp(&folded_a, &folded_b).then_with(|| a.cmp(b))
}

fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        match ch {
            'ä' | 'Ä' | 'à' | 'À' | 'á' | 'Á' | 'â' | 'Â' | 'ã' | 'Ã' | 'å' | 'Å' => folded.push('a'),
            'æ' | 'Æ' => folded.push_str("ae"),
            'ç' | 'Ç' => folded.push('c'),
            'è' | 'È' | 'é' | 'É' | 'ê' | 'Ê' | 'ë' | 'Ë' => folded.push('e'),
            'ì' | 'Ì' | 'í' | 'Í' | 'î' | 'Î' | 'ï' | 'Ï' => folded.push('i'),
            'ñ' | 'Ñ' => folded.push('n'),
            'ö' | 'Ö' | 'ò' | 'Ò' | 'ó' | 'Ó' | 'ô' | 'Ô' | 'õ' | 'Õ' | 'ø' | 'Ø' => folded.push('o'),
            'œ' | 'Œ' => folded.push_str("oe"),
            'ß' => folded.push_str("ss"),
            'ù' | 'Ù' | 'ú' | 'Ú' | 'û' | 'Û' | 'ü' | 'Ü' => folded.push('u'),
            'ý' | 'Ý' | 'ÿ' => folded.push('y'),
            other => folded.extend(other.to_lowercase()),
        }
    }
    folded
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ord = compare_digit_runs(&take_digits(&mut left), &take_digits(&mut right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.cmp(&r);
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(ch) = chars.next_if(char::is_ascii_digit) {
        digits.push(ch);
    }
    digits
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::compare_titles;
    use std::cmp::Ordering;

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(compare_titles("Part 2", "Part 10"), Ordering::Less);
        assert_eq!(compare_titles("Saw 3D", "Saw 10"), Ordering::Less);
    }

    #[test]
    fn case_and_umlauts_fold() {
        assert_eq!(compare_titles("äpfel", "Birnen"), Ordering::Less);
        assert_eq!(compare_titles("Über", "Zorro"), Ordering::Less);
        assert_eq!(compare_titles("alien", "Avatar"), Ordering::Less);
    }

    #[test]
    fn distinct_spellings_never_tie() {
        assert_ne!(compare_titles("Heat", "heat"), Ordering::Equal);
    }
}
