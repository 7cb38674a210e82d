//! Version command implementation

use super::{Context, OutputFormat};
use crate::profile::SystemProfile;
use anyhow::Result;

pub fn execute(ctx: &Context) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");

    if ctx.format == OutputFormat::Json {
        let info = serde_json::json!({
            "name": name,
            "version": version,
            "target": std::env::consts::ARCH,
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let output = &ctx.output;
    output.header("Recast Version Information");
    output.key_value("Version:", &format!("{} v{}", name, version), true);
    output.key_value("Description:", env!("CARGO_PKG_DESCRIPTION"), false);

    output.category("Build Information");
    output.key_value("Rust edition:", "2024", false);
    output.key_value("Target:", std::env::consts::ARCH, false);
    output.key_value(
        "Profile:",
        if cfg!(debug_assertions) { "debug" } else { "release" },
        false,
    );

    output.category("System");
    output.key_value("Profile:", &SystemProfile::get().summary(), false);
    output.blank_line();

    Ok(())
}
