use std::fmt;

use crate::dns::Name;
use crate::libdns::proto::error::ProtoError;

/// Parses a zone name into its lower-case, fully qualified form.
pub fn normalize_zone(zone: &str) -> Result<Name, ProtoError> {
    let mut name = Name::from_ascii(zone)?.to_lowercase();
    name.set_fqdn(true);
    Ok(name)
}

/// Zones this server answers for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zones(Vec<Name>);

impl Zones {
    /// No zones means the root zone, i.e. every name.
    pub fn new(zones: Vec<Name>) -> Self {
        if zones.is_empty() {
            Self(vec![Name::root()])
        } else {
            Self(zones)
        }
    }

    /// The first configured zone containing `name`.
    pub fn matches(&self, name: &Name) -> Option<&Name> {
        self.0.iter().find(|zone| zone.zone_of(name))
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Name> {
        self.0.iter()
    }
}

impl Default for Zones {
    fn default() -> Self {
        Self::new(vec![])
    }
}

impl fmt::Display for Zones {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zones = self.0.iter().map(|z| z.to_ascii()).collect::<Vec<_>>();
        write!(f, "{}", zones.join(" "))
    }
}

/// Names whose unanswered questions go on to the next stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fallthrough(Vec<Name>);

impl Fallthrough {
    pub fn new(zones: Vec<Name>) -> Self {
        Self(zones)
    }

    pub fn all() -> Self {
        Self(vec![Name::root()])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn through(&self, name: &Name) -> bool {
        self.0.iter().any(|zone| zone.zone_of(name))
    }
}

impl fmt::Display for Fallthrough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "off");
        }
        let zones = self.0.iter().map(|z| z.to_ascii()).collect::<Vec<_>>();
        write!(f, "{}", zones.join(" "))
    }
}
