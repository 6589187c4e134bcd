/// Format a float as a peso amount with thousands separators: ₱1,234.56
pub fn money(val: f64) -> String {
    format!("{}{}", if val < 0.0 { "-₱" } else { "₱" }, grouped(val.abs()))
}

/// ASCII variant for the PDF builtin fonts, which have no peso sign: PHP 1,234.56
pub fn money_ascii(val: f64) -> String {
    format!("{}PHP {}", if val < 0.0 { "-" } else { "" }, grouped(val.abs()))
}

pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn grouped(abs: f64) -> String {
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    format!("{with_commas}.{dec_part}")
}
