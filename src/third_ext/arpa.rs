use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const IN_ADDR_ARPA: &str = ".in-addr.arpa";
const IP6_ARPA: &str = ".ip6.arpa";

/// https://en.wikipedia.org/wiki/.arpa
pub trait IpAddrToArpa {
    fn to_arpa(&self) -> String;
}

impl IpAddrToArpa for Ipv4Addr {
    fn to_arpa(&self) -> String {
        let [a, b, c, d] = self.octets();
        format!("{}.{}.{}.{}.in-addr.arpa", d, c, b, a)
    }
}

impl IpAddrToArpa for Ipv6Addr {
    fn to_arpa(&self) -> String {
        let mut arpa = self
            .octets()
            .into_iter()
            .map(|x| format!("{:02x}", x))
            .collect::<String>()
            .chars()
            .rev()
            .fold(String::new(), |mut v, i| {
                v.push(i);
                v.push('.');
                v
            });

        arpa.push_str("ip6.arpa");

        arpa
    }
}

impl IpAddrToArpa for IpAddr {
    fn to_arpa(&self) -> String {
        match self {
            IpAddr::V4(v) => v.to_arpa(),
            IpAddr::V6(v) => v.to_arpa(),
        }
    }
}

/// Recovers the address from a complete reverse-mapping name.
///
/// Only full names are accepted: four labels under `in-addr.arpa` or
/// thirty-two nibbles under `ip6.arpa`. A trailing dot is optional.
pub fn arpa_to_ip(name: &str) -> Option<IpAddr> {
    let name = name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase();

    if let Some(labels) = name.strip_suffix(IN_ADDR_ARPA) {
        let mut octets = labels
            .split('.')
            .map(|label| label.parse::<u8>().ok())
            .collect::<Option<Vec<_>>>()?;
        if octets.len() != 4 {
            return None;
        }
        octets.reverse();
        let octets: [u8; 4] = octets.try_into().ok()?;
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }

    if let Some(labels) = name.strip_suffix(IP6_ARPA) {
        let nibbles = labels
            .split('.')
            .map(|label| match label.len() {
                1 => u8::from_str_radix(label, 16).ok(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        if nibbles.len() != 32 {
            return None;
        }
        let mut octets = [0u8; 16];
        for (i, pair) in nibbles.rchunks(2).enumerate() {
            // rchunks yields (low, high) pairs starting from the most significant end
            octets[i] = (pair[1] << 4) | pair[0];
        }
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }

    None
}
