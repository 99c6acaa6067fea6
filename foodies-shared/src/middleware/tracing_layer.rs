use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON lines in production, human-readable everywhere else.
    pub fn for_env(env: &str) -> Self {
        if env.trim().eq_ignore_ascii_case("production") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(service_name: &str) -> String {
    let crate_name = service_name.replace('-', "_");
    format!("info,{crate_name}=debug,foodies_shared=debug,tower_http=info")
}

/// Installs the global subscriber. A second call keeps the first subscriber.
pub fn init_tracing(service_name: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(service_name)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
    };

    match installed {
        Ok(()) => tracing::info!(service = service_name, format = ?format, "tracing initialized"),
        Err(e) => tracing::debug!(error = %e, "tracing subscriber already installed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_logs_json() {
        assert_eq!(LogFormat::for_env("production"), LogFormat::Json);
        assert_eq!(LogFormat::for_env(" Production "), LogFormat::Json);
        assert_eq!(LogFormat::for_env("development"), LogFormat::Pretty);
        assert_eq!(LogFormat::for_env(""), LogFormat::Pretty);
    }

    #[test]
    fn default_directive_targets_the_crate() {
        let directive = default_directive("foodies-api");
        assert!(directive.contains("foodies_api=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing("foodies-api", LogFormat::Pretty);
        init_tracing("foodies-api", LogFormat::Json);
    }
}
