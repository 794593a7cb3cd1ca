//! Build metadata captured by build.rs, surfaced by the `version` shell command.

pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const GIT_DIRTY: bool = matches!(env!("GIT_DIRTY"), "1");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const TARGET: &str = env!("TARGET");
pub const PROFILE: &str = env!("PROFILE");

pub fn print_banner() {
    crate::info!(
        "coselle kernel ({}{}), target={}, profile={}, built@{}",
        GIT_COMMIT,
        if GIT_DIRTY { "-dirty" } else { "" },
        TARGET,
        PROFILE,
        BUILD_TIMESTAMP
    );
}
