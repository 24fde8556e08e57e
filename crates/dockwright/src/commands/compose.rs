use colored::Colorize;
use dockwright_core::{BuildConfig, Composition, DescriptorComposer, FragmentResolver};

/// フラグメントから Dockerfile を合成
pub fn handle(config: &BuildConfig) -> anyhow::Result<Composition> {
    let mode = if config.is_multi_stage() {
        "マルチステージ"
    } else {
        "シングルステージ"
    };
    println!("{}", format!("Dockerfileを合成中（{}）...", mode).green());

    let resolver = FragmentResolver::from_current_dir()?;
    let composer = DescriptorComposer::new(resolver, config.bindings());
    let composition = composer.compose(config)?;

    for fragment in &composition.fragments {
        println!(
            "  • {} ({}個のアーティファクト)",
            fragment.selection.cyan(),
            fragment.artifacts.len()
        );
    }

    match &composition.path {
        Some(path) => println!(
            "  {} {}",
            "✓".green(),
            path.display().to_string().cyan()
        ),
        None => println!(
            "  {} 選択されたフラグメントがないため Dockerfile は出力しません",
            "⚠".yellow()
        ),
    }

    Ok(composition)
}
