//! Config command - show the effective configuration.

use iamledger_config::ResolvedConfig;

use crate::theme::Theme;

/// Print the merged configuration and the files it came from.
pub(crate) fn show_config(resolved: &ResolvedConfig) -> anyhow::Result<()> {
    println!("\n{}", Theme::header("Loaded files"));
    println!("{}", Theme::separator());
    if resolved.loaded_files.is_empty() {
        println!("{}", Theme::info("none (embedded defaults only)"));
    }
    for file in &resolved.loaded_files {
        println!("  {file}");
    }

    println!("\n{}", Theme::header("Effective configuration"));
    println!("{}", Theme::separator());
    println!("{}", resolved.to_toml()?);
    Ok(())
}
