//! Candidate generation for the digit-correction search
//!
//! Both generators take the digits of one field exactly as extracted and
//! return alternative values in a fixed order, without duplicates and
//! without the original value.

use crate::value::parse_decimal;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Digits that recognition commonly confuses with each other
fn confusable(digit: char) -> &'static [char] {
    match digit {
        '0' => &['8', '6'],
        '1' => &['7'],
        '3' => &['8', '7'],
        '6' => &['8', '0'],
        '7' => &['1', '3'],
        '8' => &['0', '3', '6'],
        _ => &[],
    }
}

/// Whether a field's text can take part in the digit search
pub fn is_integer_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// Ordered, deduplicated candidate values
struct Candidates {
    original: Option<Decimal>,
    seen: HashSet<Decimal>,
    values: Vec<Decimal>,
}

impl Candidates {
    fn new(original: &str) -> Self {
        Self {
            original: parse_decimal(original),
            seen: HashSet::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        let Some(value) = parse_decimal(text) else {
            return;
        };
        let value = value.normalize();
        if Some(value) == self.original.map(|o| o.normalize()) {
            return;
        }
        if self.seen.insert(value) {
            self.values.push(value);
        }
    }

    /// Push `text`, and its reading with a lost decimal point when it ends in "00"
    fn push_with_decimal_loss(&mut self, text: &str) {
        self.push(text);
        if text.len() > 2 && text.ends_with("00") {
            self.push(&text[..text.len() - 2]);
        }
    }
}

/// Phase one: confusable-digit substitutions and structural artifacts
pub fn common_mistakes(digits: &str) -> Vec<Decimal> {
    let mut candidates = Candidates::new(digits);
    let len = digits.len();

    if len > 3 && digits.ends_with("000") {
        candidates.push(&digits[..len - 3]);
    }
    if len > 2 && digits.ends_with("00") {
        candidates.push(&digits[..len - 2]);
    }

    for (position, digit) in digits.char_indices() {
        for replacement in confusable(digit) {
            let mut text = String::with_capacity(len);
            text.push_str(&digits[..position]);
            text.push(*replacement);
            text.push_str(&digits[position + 1..]);
            candidates.push_with_decimal_loss(&text);
        }
    }

    if len > 1 && digits.ends_with('1') {
        candidates.push(&digits[..len - 1]);
    }
    candidates.push(&format!("{}00", digits));
    if len > 1 {
        candidates.push(&format!("{}.{}", &digits[..len - 1], &digits[len - 1..]));
    }

    candidates.values
}

/// Phase two: every single-digit deletion, substitution and insertion
pub fn single_digit_variations(digits: &str) -> Vec<Decimal> {
    let mut candidates = Candidates::new(digits);
    let len = digits.len();

    if len > 1 {
        for position in 0..len {
            let text = format!("{}{}", &digits[..position], &digits[position + 1..]);
            candidates.push(&text);
        }
    }

    for position in 0..len {
        for digit in '0'..='9' {
            let text = format!("{}{}{}", &digits[..position], digit, &digits[position + 1..]);
            candidates.push(&text);
        }
    }

    for position in 0..=len {
        for digit in '0'..='9' {
            let text = format!("{}{}{}", &digits[..position], digit, &digits[position..]);
            candidates.push(&text);
        }
    }

    candidates.values
}
