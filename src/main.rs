use cli::*;
use std::{net::IpAddr, path::PathBuf, process, sync::Arc, time::Duration};
use tokio::{runtime, signal};

mod cli;
mod config;
mod dns;
mod dns_conf;
mod dns_error;
mod dns_mw;
mod dns_mw_netbox;
mod infra;
mod libdns;
mod log;
mod netbox;
mod server;
mod third_ext;
mod zones;

use dns::{DnsRequest, Name, Query, RecordType, ZoneLine};
use dns_conf::RuntimeConfig;
use dns_mw::{DnsMiddlewareBuilder, DnsMiddlewareHandler};
use dns_mw_netbox::NetboxMiddleware;
use infra::middleware;
use netbox::{
    status::{self, Capabilities},
    LegacySource, NetboxApi, PluginSource, RecordSource, ReqwestTransport,
};

use crate::log::{debug, error, info, warn};
use crate::third_ext::IpAddrToArpa;

/// The app name
const NAME: &str = "netbox-dns";

/// Pause between capability probes while NetBox is not reachable yet.
const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

fn main() {
    let cli = <Cli as clap::Parser>::parse();
    if let Err(err) = cli.run() {
        error!("{:#}", err);
        eprintln!("{:#}", err);
        process::exit(1);
    }
}

impl Cli {
    #[inline]
    pub fn run(self) -> anyhow::Result<()> {
        let explicit_level = self.explicit_log_level();
        let _guard = self.log_level().map(log::default);

        match self.command {
            Commands::Run { conf } => run_server(conf, explicit_level),
            Commands::Resolve {
                conf,
                name,
                query_type,
            } => resolve(conf, &name, query_type),
            Commands::Probe { conf } => {
                let cfg = RuntimeConfig::load(conf)?;
                let capabilities = build_runtime()?.block_on(probe_once(&cfg))?;
                println!("{}", capabilities);
                println!("use plugin: {}", capabilities.use_plugin());
                Ok(())
            }
            Commands::Test { conf } => {
                let cfg = RuntimeConfig::load(conf)?;
                cfg.summary();
                println!("configuration OK");
                Ok(())
            }
        }
    }
}

/// `-v`/`-q` win over the configured level; without them the file decides.
/// `None` turns logging off.
fn effective_level(cli: Option<Option<log::Level>>, cfg: log::Level) -> Option<log::Level> {
    match cli {
        Some(explicit) => explicit,
        None => Some(cfg),
    }
}

fn build_runtime() -> anyhow::Result<runtime::Runtime> {
    Ok(runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("netbox-dns-runtime")
        .build()?)
}

fn netbox_api(cfg: &RuntimeConfig) -> anyhow::Result<NetboxApi> {
    let url = cfg
        .url()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("netbox url is not configured"))?;
    let transport = ReqwestTransport::new(cfg.timeout(), cfg.tls())?;
    Ok(NetboxApi::new(url, cfg.token(), Arc::new(transport)))
}

async fn probe_once(cfg: &RuntimeConfig) -> anyhow::Result<Capabilities> {
    let api = netbox_api(cfg)?;
    Ok(status::probe(&api).await?)
}

/// Probes until NetBox answers.
async fn wait_ready(api: &NetboxApi) -> Capabilities {
    loop {
        match status::probe(api).await {
            Ok(capabilities) => return capabilities,
            Err(err) => {
                warn!(
                    "NetBox at {} not ready: {}, retrying in {:?}",
                    api.base(),
                    err,
                    PROBE_INTERVAL
                );
                tokio::time::sleep(PROBE_INTERVAL).await;
            }
        }
    }
}

fn build_handler(
    cfg: Arc<RuntimeConfig>,
    api: NetboxApi,
    capabilities: &Capabilities,
) -> DnsMiddlewareHandler {
    let source: Arc<dyn RecordSource> = if capabilities.use_plugin() {
        Arc::new(PluginSource::new(api))
    } else {
        Arc::new(LegacySource::new(api, cfg.rr_ttl()))
    };
    info!("record source: {}", source.name());

    DnsMiddlewareBuilder::new()
        .with(NetboxMiddleware::new(cfg.zones(), cfg.fallthrough(), source))
        .build(cfg)
}

fn run_server(conf: Option<PathBuf>, explicit_level: Option<Option<log::Level>>) -> anyhow::Result<()> {
    info!("{} {} starting", NAME, version());

    let cfg = RuntimeConfig::load(conf)?;

    let _guard = effective_level(explicit_level, cfg.log_level())
        .map(|level| log::init_global_default(level, cfg.log_filter()));

    cfg.summary();

    let runtime = build_runtime()?;

    // build handle pipeline.
    let handler = {
        let api = netbox_api(&cfg)?;
        let capabilities = runtime.block_on(wait_ready(&api));
        Arc::new(build_handler(cfg.clone(), api, &capabilities))
    };
    debug!("pipeline: {:?}", handler.names());

    runtime.block_on(async {
        let server = server::serve(cfg.bind(), handler).await?;

        info!("listening for UDP on {}", server.local_addr());
        info!("awaiting connections...");

        signal::ctrl_c().await?;
        // we're exiting for some reason...
        info!("{} {} shutdown", NAME, version());

        server.shutdown().await;
        anyhow::Ok(())
    })?;

    drop(runtime);
    Ok(())
}

fn resolve(conf: Option<PathBuf>, name: &str, query_type: RecordType) -> anyhow::Result<()> {
    let cfg = RuntimeConfig::load(conf)?;
    let runtime = build_runtime()?;

    // an address asks for its reverse name, like `dig -x`
    let (name, query_type) = match name.parse::<IpAddr>() {
        Ok(ip) => (ip.to_arpa(), RecordType::PTR),
        Err(_) => (name.to_string(), query_type),
    };
    let mut name = Name::from_utf8(name)?;
    name.set_fqdn(true);

    let (res, err) = runtime.block_on(async {
        let api = netbox_api(&cfg)?;
        let capabilities = status::probe(&api).await?;
        let handler = build_handler(cfg.clone(), api, &capabilities);

        let req = DnsRequest::from_query(Query::query(name, query_type));
        anyhow::Ok(handler.serve(&req).await)
    })?;

    println!(";; status: {}", res.response_code());
    if let Some(err) = err {
        println!(";; error: {}", err);
    }
    for record in res.answers() {
        println!("{}", record.to_zone_line());
    }
    Ok(())
}
