use serde::{Deserialize, Deserializer};

/// Deserializes `null` as the type's default value.
///
/// NetBox reports unset numeric fields such as a record TTL as `null`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
