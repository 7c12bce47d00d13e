//! Kubernetes resource quantity parsing.

/// Parse a CPU quantity into cores. Accepts `0.5`, `2` and `200m`.
pub fn parse_cpu(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.strip_suffix('m') {
        Some(milli) => milli.parse::<f64>().ok()? / 1000.0,
        None => raw.parse::<f64>().ok()?,
    };
    (value >= 0.0 && value.is_finite()).then_some(value)
}

const MEMORY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
];

/// Parse a memory quantity into bytes. Accepts plain bytes and binary/decimal suffixes.
pub fn parse_memory(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (number, scale) = MEMORY_SUFFIXES
        .iter()
        .find_map(|(suffix, scale)| raw.strip_suffix(suffix).map(|n| (n, *scale)))
        .unwrap_or((raw, 1.0));
    let value = number.parse::<f64>().ok()? * scale;
    (value >= 0.0 && value.is_finite()).then_some(value)
}
