use serde::Deserialize;

use super::NetboxApi;
use crate::dns_error::LookupError;
use crate::log::info;

const STATUS: &str = "/api/status";

#[derive(Debug, Default, Deserialize)]
struct InstalledApps {
    #[serde(default, rename = "netbox_dns")]
    dns_plugin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default, rename = "netbox-version")]
    version: Option<String>,
    #[serde(default, rename = "installed-apps")]
    apps: InstalledApps,
}

/// What a NetBox instance can serve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub netbox_version: String,
    pub dns_plugin_version: Option<String>,
}

impl Capabilities {
    /// Whether records should come from the netbox-dns plugin instead of IPAM.
    #[inline]
    pub fn use_plugin(&self) -> bool {
        self.dns_plugin_version
            .as_deref()
            .map(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NetBox {}, netbox-dns plugin {}",
            self.netbox_version,
            self.dns_plugin_version.as_deref().unwrap_or("-")
        )
    }
}

pub async fn probe(api: &NetboxApi) -> Result<Capabilities, LookupError> {
    let status: Status = api.get_json(STATUS, &[]).await?;

    let capabilities = Capabilities {
        netbox_version: status.version.unwrap_or_default(),
        dns_plugin_version: status.apps.dns_plugin,
    };

    info!("{}, use plugin: {}", capabilities, capabilities.use_plugin());

    Ok(capabilities)
}
