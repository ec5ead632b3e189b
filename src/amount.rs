use serde::{Deserialize, Deserializer};

/// Number of contract units in one coin.
pub const UNITS_PER_COIN: u64 = 100_000_000;

/// Convert whole coins into contract units, or `None` if they don't fit in a `u64`.
pub fn coins_to_units(coins: u64) -> Option<u64> {
    coins.checked_mul(UNITS_PER_COIN)
}

/// Convert an amount of contract units into coins.
pub fn units_to_coins(units: f64) -> f64 {
    units / UNITS_PER_COIN as f64
}

// The node and the contract report amounts as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            RawAmount::Number(n) => Ok(n),
            RawAmount::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("not a decimal amount: {s:?}"))),
        }
    }
}

pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    RawAmount::deserialize(deserializer)?.into_f64()
}

pub(crate) fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawAmount>::deserialize(deserializer)?
        .map(RawAmount::into_f64)
        .transpose()
}

/// Read an amount out of an arbitrary JSON value, accepting numbers and numeric strings.
pub fn amount_from_json(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_between_coins_and_units() {
        assert_eq!(coins_to_units(3), Some(300_000_000));
        assert_eq!(coins_to_units(u64::MAX / 10), None);
        assert_eq!(units_to_coins(2_850_000_000.0), 28.5);
    }

    #[test]
    fn amount_from_json_accepts_strings_and_numbers() {
        assert_eq!(amount_from_json(&json!("2850000000")), Some(2_850_000_000.0));
        assert_eq!(amount_from_json(&json!(12)), Some(12.0));
        assert_eq!(amount_from_json(&json!(null)), None);
        assert_eq!(amount_from_json(&json!("twelve")), None);
    }
}
