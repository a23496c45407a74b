// src/core/rounding.rs

/// Most fraction digits `$round()` keeps or pads to.
pub const MAX_FRACTION_DIGITS: usize = 340;

/// How `$round()` treats the digits it drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMode {
    /// Nearest neighbour, ties away from zero.
    #[default]
    HalfUp,
    /// Nearest neighbour, ties towards zero.
    HalfDown,
    /// Nearest neighbour, ties to the even neighbour.
    HalfEven,
    /// Away from zero.
    Up,
    /// Towards zero.
    Down,
    /// Towards positive infinity.
    Ceil,
    /// Towards negative infinity.
    Floor,
}

impl RoundingMode {
    /// Parses a mode name; unknown names fall back to half-up.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "half-down" | "halfdown" => RoundingMode::HalfDown,
            "half-even" | "halfeven" => RoundingMode::HalfEven,
            "up" => RoundingMode::Up,
            "down" => RoundingMode::Down,
            "ceil" | "ceiling" => RoundingMode::Ceil,
            "floor" => RoundingMode::Floor,
            _ => RoundingMode::HalfUp,
        }
    }
}

/// Rounds the decimal form of `input` to at most `decimals` fraction digits and
/// prints at least `min_decimals` of them. `None` if `input` is not a number.
/// Both counts are capped at [`MAX_FRACTION_DIGITS`].
///
/// Works on the shortest decimal representation of the parsed value, so
/// `2.345` rounds half-up to `2.35` rather than suffering binary error.
pub fn round_number(
    input: &str,
    decimals: usize,
    mode: RoundingMode,
    min_decimals: usize,
) -> Option<String> {
    let number = input.trim().parse::<f64>().ok().filter(|n| n.is_finite())?;
    let decimals = decimals.min(MAX_FRACTION_DIGITS);
    let min_decimals = min_decimals.min(MAX_FRACTION_DIGITS);
    let negative = number.is_sign_negative();
    let digits = number.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((&digits, ""));

    let (kept_frac, dropped) = if frac_part.len() > decimals {
        (frac_part.get(..decimals)?, frac_part.get(decimals..)?)
    } else {
        (frac_part, "")
    };

    let mut magnitude: Vec<u8> = int_part
        .bytes()
        .chain(kept_frac.bytes())
        .map(|b| b - b'0')
        .collect();

    if round_away(mode, negative, magnitude.last().copied(), dropped) {
        increment(&mut magnitude);
    }

    let frac_len = kept_frac.len();
    let split = magnitude.len() - frac_len;
    let render = |slice: &[u8]| slice.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let int_text = render(magnitude.get(..split)?);
    let mut frac_text = render(magnitude.get(split..)?);

    while frac_text.ends_with('0') && frac_text.len() > min_decimals {
        frac_text.pop();
    }
    while frac_text.len() < min_decimals {
        frac_text.push('0');
    }

    let is_zero = magnitude.iter().all(|d| *d == 0);
    let mut output = String::new();
    if negative && !is_zero {
        output.push('-');
    }
    output.push_str(&int_text);
    if !frac_text.is_empty() {
        output.push('.');
        output.push_str(&frac_text);
    }
    Some(output)
}

fn round_away(mode: RoundingMode, negative: bool, last_kept: Option<u8>, dropped: &str) -> bool {
    let mut dropped_digits = dropped.bytes().map(|b| b - b'0');
    let Some(first) = dropped_digits.next() else {
        return false;
    };
    let rest_nonzero = dropped_digits.any(|d| d != 0);
    let any_nonzero = first != 0 || rest_nonzero;
    match mode {
        RoundingMode::Up => any_nonzero,
        RoundingMode::Down => false,
        RoundingMode::Ceil => any_nonzero && !negative,
        RoundingMode::Floor => any_nonzero && negative,
        RoundingMode::HalfUp => first >= 5,
        RoundingMode::HalfDown => first > 5 || (first == 5 && rest_nonzero),
        RoundingMode::HalfEven => {
            first > 5
                || (first == 5 && (rest_nonzero || last_kept.is_some_and(|d| d % 2 == 1)))
        }
    }
}

/// Adds one unit in the last place, growing the number on overflow.
fn increment(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == 9 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(input: &str, decimals: usize, mode: &str, min: usize) -> Option<String> {
        round_number(input, decimals, RoundingMode::from_name(mode), min)
    }

    #[test]
    fn test_half_up_uses_decimal_digits() {
        assert_eq!(round("2.345", 2, "half-up", 0).as_deref(), Some("2.35"));
        assert_eq!(round("2.5", 0, "", 0).as_deref(), Some("3"));
        assert_eq!(round("-2.5", 0, "", 0).as_deref(), Some("-3"));
        assert_eq!(round("9.99", 1, "", 0).as_deref(), Some("10"));
    }

    #[test]
    fn test_min_decimals_are_padded() {
        assert_eq!(round("2", 0, "half-up", 2).as_deref(), Some("2.00"));
        assert_eq!(round("2.5", 3, "", 0).as_deref(), Some("2.5"));
        assert_eq!(round("2.10", 2, "", 1).as_deref(), Some("2.1"));
    }

    #[test]
    fn test_fraction_digits_are_capped() {
        let padded = round("1", 0, "half-up", 50_000_000).unwrap();
        assert_eq!(padded.len(), 2 + MAX_FRACTION_DIGITS);
        assert!(padded.starts_with("1.000"));
        assert_eq!(round("0.5", usize::MAX, "", 0).as_deref(), Some("0.5"));
    }

    #[test]
    fn test_modes() {
        assert_eq!(round("2.25", 1, "half-down", 0).as_deref(), Some("2.2"));
        assert_eq!(round("2.25", 1, "half-even", 0).as_deref(), Some("2.2"));
        assert_eq!(round("2.35", 1, "half-even", 0).as_deref(), Some("2.4"));
        assert_eq!(round("2.01", 0, "up", 0).as_deref(), Some("3"));
        assert_eq!(round("2.99", 0, "down", 0).as_deref(), Some("2"));
        assert_eq!(round("-2.1", 0, "ceil", 0).as_deref(), Some("-2"));
        assert_eq!(round("-2.1", 0, "floor", 0).as_deref(), Some("-3"));
        assert_eq!(round("-0.1", 0, "ceil", 0).as_deref(), Some("0"));
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(round("abc", 2, "", 0), None);
        assert_eq!(round("inf", 2, "", 0), None);
    }
}
