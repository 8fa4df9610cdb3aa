// Gas concentration domain models and status classification
use serde::Serialize;

/// Severity tier for a gas concentration reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GasStatus {
    Normal,
    Warning,
    Danger,
}

/// Field name under which a gas is stored in a minute partition,
/// e.g. "C2H5OH_ppm".
pub fn gas_field_key(symbol: &str) -> String {
    format!("{}_ppm", symbol.to_uppercase())
}

/// Map a concentration to a severity tier using the fixed per-gas
/// thresholds. Both thresholds are strict greater-than; unknown
/// symbols are Normal.
pub fn classify_gas_status(symbol: &str, value: f64) -> GasStatus {
    let symbol = symbol.to_uppercase();
    let (warning, danger) = match symbol.as_str() {
        "C2H5OH" => (1.0, 2.0),
        "H2S" => (10.0, 20.0),
        "NO2" => (3.0, 4.0),
        _ => return GasStatus::Normal,
    };
    if value > danger {
        GasStatus::Danger
    } else if value > warning {
        GasStatus::Warning
    } else {
        GasStatus::Normal
    }
}

/// One charted concentration reading: reconstructed epoch-millis
/// timestamp, upper-cased gas symbol, ppm value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasPoint {
    pub timestamp: i64,
    pub gas: String,
    pub value: f64,
}

impl GasPoint {
    pub fn new(timestamp: i64, gas: String, value: f64) -> Self {
        Self {
            timestamp,
            gas,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(classify_gas_status("C2H5OH", 1.0), GasStatus::Normal);
        assert_eq!(classify_gas_status("C2H5OH", 1.5), GasStatus::Warning);
        assert_eq!(classify_gas_status("C2H5OH", 2.0), GasStatus::Warning);
        assert_eq!(classify_gas_status("C2H5OH", 2.1), GasStatus::Danger);

        assert_eq!(classify_gas_status("H2S", 10.0), GasStatus::Normal);
        assert_eq!(classify_gas_status("H2S", 10.5), GasStatus::Warning);
        assert_eq!(classify_gas_status("H2S", 20.0), GasStatus::Warning);
        assert_eq!(classify_gas_status("H2S", 25.0), GasStatus::Danger);

        assert_eq!(classify_gas_status("NO2", 3.0), GasStatus::Normal);
        assert_eq!(classify_gas_status("NO2", 3.5), GasStatus::Warning);
        assert_eq!(classify_gas_status("NO2", 4.0), GasStatus::Warning);
        assert_eq!(classify_gas_status("NO2", 4.5), GasStatus::Danger);
    }

    #[test]
    fn test_unknown_gas_is_normal() {
        assert_eq!(classify_gas_status("CO2", 9999.0), GasStatus::Normal);
    }

    #[test]
    fn test_symbol_case_is_ignored() {
        assert_eq!(classify_gas_status("c2h5oh", 1.5), GasStatus::Warning);
    }

    #[test]
    fn test_gas_field_key_upper_cases() {
        assert_eq!(gas_field_key("c2h5oh"), "C2H5OH_ppm");
        assert_eq!(gas_field_key("NO2"), "NO2_ppm");
    }
}
