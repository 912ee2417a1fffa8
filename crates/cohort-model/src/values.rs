//! Enumerated value handling and natural ordering.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Separator between enumerated values in a `values` field.
pub const VALUE_DELIMITER: char = ',';

/// Splits an enumerated `values` string and sorts it naturally.
///
/// Items are trimmed and empty items dropped.
#[must_use]
pub fn sorted_values(values: &str) -> Vec<&str> {
    let mut items: Vec<&str> = values
        .split(VALUE_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    items.sort_by(|a, b| natural_cmp(a, b));
    items
}

/// Compares two strings treating embedded digit runs as numbers.
///
/// Letters compare case-insensitively, so `"V2" < "v10"` and `"a" == "A"`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ordering = compare_digit_runs(&l_run, &r_run);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                let ordering = fold_case(l).cmp(&fold_case(r));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
