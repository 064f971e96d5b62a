//! Human readable sizes

const STEP: f64 = 1024.0;
const UNITS: [&str; 5] = ["", "К", "М", "Г", "Т"];

/// Format a byte count with binary prefixes, e.g. `1536` -> `"2КБ"`.
///
/// The value is divided while it is strictly larger than 1024, so exactly
/// 1024 stays `"1024Б"`.
pub fn format_bytes(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = 0;

    while value > STEP && unit < UNITS.len() - 1 {
        value /= STEP;
        unit += 1;
    }

    format!("{}{}Б", value.round() as u64, UNITS[unit])
}
