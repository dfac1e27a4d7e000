/// Release version reported by `--version` and at startup.
/// Packagers can stamp it at build time through `MARKETWATCH_VERSION`.
pub const VERSION: &str = match option_env!("MARKETWATCH_VERSION") {
    Some(val) => val,
    None => env!("CARGO_PKG_VERSION"),
};
