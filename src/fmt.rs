fn group_thousands(digits: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as a currency amount with thousands separators: ₹ 1,234.56
pub fn money(val: f64, symbol: &str) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let with_commas = group_thousands(int_part);

    if negative {
        format!("-{symbol} {with_commas}.{dec_part}")
    } else {
        format!("{symbol} {with_commas}.{dec_part}")
    }
}

/// Format an integer with thousands separators: 12,345
pub fn number(val: i64) -> String {
    let grouped = group_thousands(&val.unsigned_abs().to_string());
    if val < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Two significant digits with a k/M suffix, for bar labels: 1.2k, 35k, 4.5M
pub fn compact(val: f64) -> String {
    let abs = val.abs();
    let (scaled, suffix) = if abs >= 1_000_000.0 {
        (val / 1_000_000.0, "M")
    } else if abs >= 1000.0 {
        (val / 1000.0, "k")
    } else {
        (val, "")
    };
    if scaled.abs() >= 10.0 {
        format!("{:.0}{suffix}", scaled)
    } else {
        format!("{:.1}{suffix}", scaled)
    }
}
