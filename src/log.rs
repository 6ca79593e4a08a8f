use std::{env, fmt, io};

use tracing::{
    dispatcher::{set_default, set_global_default},
    subscriber::DefaultGuard,
    Dispatch, Event, Subscriber,
};
use tracing_subscriber::{
    fmt::{
        format, writer::MakeWriterExt, FmtContext, FormatEvent, FormatFields, FormattedFields,
        MakeWriter,
    },
    prelude::__tracing_subscriber_SubscriberExt,
    registry::LookupSpan,
    EnvFilter,
};

pub use tracing::*;

const DEFAULT_FILTER: &str = "netbox_dns={level},{env}";

/// Installs the process-wide subscriber once the configuration is known.
///
/// `filter` replaces the default directives; `{level}` and `{env}` in it are
/// substituted with `level` and `RUST_LOG`.
pub fn init_global_default(level: Level, filter: Option<&str>) -> DefaultGuard {
    let dispatch = make_dispatch(level, filter, io::stdout.with_max_level(level));

    let guard = set_default(&dispatch);
    if set_global_default(dispatch).is_err() {
        debug!("global subscriber already installed");
    }
    guard
}

/// Console logging for the time before the configuration is loaded.
pub fn default(console_level: Level) -> DefaultGuard {
    let console_writer = io::stdout.with_max_level(console_level);
    set_default(&make_dispatch(console_level, None, console_writer))
}

#[inline]
fn make_dispatch<W: for<'writer> MakeWriter<'writer> + 'static + Send + Sync>(
    level: Level,
    filter: Option<&str>,
    writer: W,
) -> Dispatch {
    let layer = tracing_subscriber::fmt::layer()
        .event_format(NetboxDnsFormatter)
        .with_writer(writer);

    Dispatch::from(
        tracing_subscriber::registry()
            .with(layer)
            .with(make_filter(level, filter)),
    )
}

fn make_filter(level: Level, filter: Option<&str>) -> EnvFilter {
    let directives = all_netbox_dns(level, filter);
    let builder = EnvFilter::builder().with_default_directive(Level::WARN.into());

    match builder.parse(&directives) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("invalid log filter {:?}: {}", directives, err);
            EnvFilter::builder()
                .with_default_directive(Level::WARN.into())
                .parse_lossy(all_netbox_dns(level, None))
        }
    }
}

#[inline]
fn all_netbox_dns(level: impl ToString, filter: Option<&str>) -> String {
    filter
        .unwrap_or(DEFAULT_FILTER)
        .replace("{level}", level.to_string().to_uppercase().as_str())
        .replace("{env}", get_env().as_str())
}

#[inline]
fn get_env() -> String {
    env::var("RUST_LOG").unwrap_or_default()
}

struct NetboxDnsFormatter;

impl<S, N> FormatEvent<S, N> for NetboxDnsFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now();
        let date = now.format("%Y-%m-%d %H:%M:%S%.3f");

        let metadata = event.metadata();

        if metadata.level() == &Level::INFO {
            write!(&mut writer, "{}:{}", date, metadata.level())?;
        } else {
            write!(
                &mut writer,
                "{}:{}:{}",
                date,
                metadata.level(),
                metadata.target()
            )?;
            if let Some(line) = metadata.line() {
                write!(&mut writer, ":{}", line)?;
            }
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, ":{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
            }
        }

        write!(writer, ": ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let directives = all_netbox_dns(Level::DEBUG, None);
        assert!(directives.starts_with("netbox_dns=DEBUG,"));
    }

    #[test]
    fn test_custom_filter() {
        assert_eq!(
            all_netbox_dns(Level::INFO, Some("netbox_dns={level},reqwest=debug")),
            "netbox_dns=INFO,reqwest=debug"
        );
    }

    #[test]
    fn test_logging_through_default() {
        let _guard = default(Level::TRACE);
        info!("hello");
        debug!(answers = 2, "served");
    }
}
