/// 2^53, the largest magnitude below which f64 has sub-integer resolution.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use defi_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by half an ULP at the target precision so exact midpoints such
    // as 1.005 round away from zero.
    // Past 2^53 every f64 is already an integer at this precision.
    let factor = 10_f64.powi(decimals as i32);
    let scaled = abs_value * factor;
    let rounded = if scaled < MAX_EXACT_INTEGER {
        let epsilon = f64::EPSILON * scaled;
        (scaled + epsilon).round() / factor
    } else {
        abs_value
    };

    // `{:.0}` is exact at any magnitude; `as u64` saturates.
    let grouped = group_thousands(&format!("{:.0}", rounded.trunc()));

    let body = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Format a USD amount with two decimals and thousands separators.
///
/// ```
/// use defi_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "$1,234.56");
/// assert_eq!(format_currency(0.0), "$0.00");
/// ```
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${}", format_number(amount.abs(), 2))
    } else {
        format!("${}", format_number(amount, 2))
    }
}

/// Abbreviate a USD amount to thousands (K), millions (M), billions (B) or
/// trillions (T) with one decimal. Values below 1,000 are shown whole.
///
/// ```
/// use defi_core::formatting::format_compact_currency;
///
/// assert_eq!(format_compact_currency(1_500_000_000.0), "$1.5B");
/// assert_eq!(format_compact_currency(950.0), "$950");
/// ```
pub fn format_compact_currency(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    for (scale, suffix) in UNITS {
        if value >= scale {
            return format!("${:.1}{}", value / scale, suffix);
        }
    }
    format!("${:.0}", value)
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// ```
/// use defi_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
