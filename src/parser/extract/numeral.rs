fn symbol_value(c: char) -> i64 {
    match c {
        'I' => 1,
        'V' => 5,
        'X' => 10,
        'L' => 50,
        'C' => 100,
        'D' => 500,
        'M' => 1000,
        _ => 0,
    }
}

/// Convert a Roman numeral to its integer value.
///
/// Scans right to left, adding a symbol when it is at least as large as the
/// previous one and subtracting it otherwise. Malformed input still yields a
/// number; unknown characters count as zero.
pub fn roman_to_int(numeral: &str) -> i64 {
    let mut total = 0;
    let mut prev = 0;
    for c in numeral.chars().rev() {
        let value = symbol_value(c);
        if value >= prev {
            total += value;
        } else {
            total -= value;
        }
        prev = value;
    }
    total
}
