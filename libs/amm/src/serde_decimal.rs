//! Serde adapter that writes signed 256-bit values as base-10 strings
//!
//! Use with `#[serde(with = "nabla_amm::serde_decimal")]`, or the `option`
//! submodule for `Option<I256>` where an absent value maps to `null`.

use ethers_core::types::I256;
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &I256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<I256, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    I256::from_dec_str(&raw).map_err(de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<I256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<I256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| I256::from_dec_str(&raw).map_err(de::Error::custom))
            .transpose()
    }
}
