/// Label shown wherever a growth figure is undefined.
pub const NOT_APPLICABLE: &str = "N/A";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use regdash_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1500000.0, 0), "1,500,000");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a few ULPs so exact midpoints round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let grouped = group_thousands(&(rounded.trunc() as u64).to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!(
            "{:.prec$}",
            rounded - rounded.trunc(),
            prec = decimals as usize
        );
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a registration count with thousands separators.
///
/// ```
/// use regdash_core::formatting::format_count;
///
/// assert_eq!(format_count(540000), "540,000");
/// assert_eq!(format_count(7), "7");
/// ```
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// Format a growth percentage with an explicit sign, or `N/A` when the growth
/// is undefined.
///
/// ```
/// use regdash_core::formatting::format_growth;
///
/// assert_eq!(format_growth(Some(50.0), 1), "+50.0%");
/// assert_eq!(format_growth(Some(-4.04), 1), "-4.0%");
/// assert_eq!(format_growth(Some(0.0), 1), "0.0%");
/// assert_eq!(format_growth(None, 1), "N/A");
/// ```
pub fn format_growth(growth_pct: Option<f64>, decimals: u32) -> String {
    match growth_pct {
        None => NOT_APPLICABLE.to_string(),
        Some(pct) => {
            let body = format_number(pct, decimals);
            if body.starts_with('-') || body.trim_start_matches(['0', '.', ',']).is_empty() {
                format!("{}%", body)
            } else {
                format!("+{}%", body)
            }
        }
    }
}

/// Format a market-share proportion (`0.0..=1.0`) as a percentage.
///
/// ```
/// use regdash_core::formatting::format_share;
///
/// assert_eq!(format_share(0.36, 1), "36.0%");
/// assert_eq!(format_share(1.0, 0), "100%");
/// ```
pub fn format_share(proportion: f64, decimals: u32) -> String {
    format!("{}%", format_number(proportion * 100.0, decimals))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
