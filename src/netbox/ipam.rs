use std::net::IpAddr;

use ipnet::IpNet;
use serde::Deserialize;

use super::NetboxApi;
use crate::dns_error::LookupError;
use crate::log::warn;

const IP_ADDRESSES: &str = "/api/ipam/ip-addresses/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    #[inline]
    fn contains(&self, ip: &IpAddr) -> bool {
        match self {
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }
}

/// One entry of `/api/ipam/ip-addresses/`.
#[derive(Debug, Clone, Deserialize)]
pub struct IpAddressEntry {
    /// CIDR notation, e.g. `10.0.0.2/25`.
    pub address: String,
    #[serde(default)]
    pub dns_name: String,
}

impl IpAddressEntry {
    fn ip(&self) -> Option<IpAddr> {
        match self.address.parse::<IpNet>() {
            Ok(net) => Some(net.addr()),
            Err(_) => match self.address.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(err) => {
                    warn!("received invalid address {:?} from Netbox: {}", self.address, err);
                    None
                }
            },
        }
    }
}

/// Addresses whose `dns_name` equals `hostname` (no trailing dot).
pub async fn lookup_addresses(
    api: &NetboxApi,
    hostname: &str,
    family: Family,
) -> Result<Vec<IpAddr>, LookupError> {
    let entries: Vec<IpAddressEntry> = api.list(IP_ADDRESSES, &[("dns_name", hostname)]).await?;

    Ok(entries
        .iter()
        .filter_map(IpAddressEntry::ip)
        .filter(|ip| family.contains(ip))
        .collect())
}

/// Fully qualified `dns_name`s of the entries holding `ip`.
pub async fn lookup_hostnames(api: &NetboxApi, ip: IpAddr) -> Result<Vec<String>, LookupError> {
    let ip = ip.to_string();
    let entries: Vec<IpAddressEntry> = api.list(IP_ADDRESSES, &[("address", ip.as_str())]).await?;

    Ok(entries
        .into_iter()
        .filter(|entry| !entry.dns_name.is_empty())
        .map(|entry| {
            let mut name = entry.dns_name;
            if !name.ends_with('.') {
                name.push('.');
            }
            name
        })
        .collect())
}
