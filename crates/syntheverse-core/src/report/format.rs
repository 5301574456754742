/// Fixed-point `value / 10^decimals` with trailing zeros trimmed but at least
/// one fractional digit (`1.5`, `2.0`, `0.000000001`).
pub fn format_units(value: u128, decimals: u32) -> String {
    let base = 10u128.pow(decimals);
    let whole = value / base;
    let frac = value % base;
    if decimals == 0 {
        return format!("{}.0", whole);
    }
    let mut frac = format!("{:0width$}", frac, width = decimals as usize);
    while frac.len() > 1 && frac.ends_with('0') {
        frac.pop();
    }
    format!("{}.{}", whole, frac)
}

pub fn format_ether(wei: u128) -> String {
    format_units(wei, 18)
}

pub fn format_gwei(wei: u128) -> String {
    format_units(wei, 9)
}
