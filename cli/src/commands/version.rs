//! Command: print version information.

/// Version string: `HOSTSETUP_VERSION` from the build, else the crate
/// version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("HOSTSETUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the hostsetup version to stdout.
pub fn run() {
    println!("hostsetup {}", version());
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_not_empty() {
        assert!(!super::version().is_empty());
    }
}
