use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, with `default_directive`
/// (e.g. `"wotero_core=info"`) applied on top.
///
/// Does nothing if a global subscriber is already set, so hosts and tests can
/// call it freely.
pub fn init_tracing(default_directive: &str) {
    let mut filter = EnvFilter::from_default_env();
    match default_directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("ignoring invalid log directive {default_directive:?}: {e}"),
    }

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
