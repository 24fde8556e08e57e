use crate::commands::compose;
use crate::docker;
use colored::Colorize;
use dockwright_build::{
    BuildError, ContextBuilder, EcrRegistry, ImageBuilder, ImagePusher, RegistryClient, Release,
    plan_release, shallow_clone,
};
use dockwright_core::BuildConfig;
use std::collections::BTreeMap;
use std::path::Path;

/// clone 先のデフォルトフォルダ名（source.folder 省略時）
const DEFAULT_SOURCE_FOLDER: &str = "code";

/// Dockerfile を合成し、次のバージョンでイメージをビルド（必要ならプッシュ）
pub async fn handle(config: &BuildConfig, push: bool, clone: bool) -> anyhow::Result<()> {
    let repository = config.repository()?;
    let total = if push { 5 } else { 4 };

    // 1. Dockerfile の合成
    println!("{}", format!("【Step 1/{}】", total).yellow());
    let composition = compose::handle(config)?;
    let context_dir = composition.output_directory.clone();
    if composition.path.is_none() {
        return Err(BuildError::DescriptorNotFound(
            context_dir.join(dockwright_core::composer::DESCRIPTOR_FILE_NAME),
        )
        .into());
    }

    if clone {
        checkout_source(config, &context_dir).await?;
    }

    // 2. リポジトリの準備とバージョン解決
    println!();
    println!(
        "{}",
        format!("【Step 2/{}】次のバージョンを解決中...", total).yellow()
    );
    let registry = EcrRegistry::from_profile(repository.profile.as_deref()).await;
    let release = plan_release(&registry, repository).await?;
    println!("  → Image: {}", release.image_reference().cyan());

    // 3. ローカルの掃除
    println!();
    println!(
        "{}",
        format!("【Step 3/{}】ローカルのコンテナ・イメージを削除中...", total).yellow()
    );
    let docker_conn = docker::connect().await?;
    let builder = ImageBuilder::new(docker_conn.clone());
    builder.prune_local().await?;

    // 4. ビルド
    println!();
    println!("{}", format!("【Step 4/{}】イメージをビルド中...", total).yellow());
    let context_data = ContextBuilder::create_context(&context_dir)?;
    let output = builder
        .build_image(
            context_data,
            &release.image_reference(),
            &build_labels(&config.docker.labels, &repository.application, &release),
            config.docker.network.as_deref(),
            config.docker.timeout(),
        )
        .await?;
    println!(
        "  {} ビルド完了 ({} 行のログ)",
        "✓".green(),
        output.log.len()
    );

    // 5. プッシュ
    if push {
        println!();
        println!("{}", format!("【Step 5/{}】イメージをプッシュ中...", total).yellow());
        let credentials = registry.credentials(&release.repository).await?;
        let pusher = ImagePusher::new(docker_conn);
        let result = pusher.push(&release.image_reference(), credentials).await?;
        println!("  {} {}", "✓".green(), result);
    }

    println!();
    println!(
        "{}",
        format!("✓ {} を作成しました", release.image_reference())
            .green()
            .bold()
    );
    Ok(())
}

/// ソースをビルドコンテキスト内に shallow clone
async fn checkout_source(config: &BuildConfig, context_dir: &Path) -> anyhow::Result<()> {
    let source = config.source()?;
    let folder = source.folder.as_deref().unwrap_or(DEFAULT_SOURCE_FOLDER);
    let target = context_dir.join(folder.trim_start_matches('/'));

    println!(
        "  → Source: {} ({})",
        source.url.cyan(),
        source.branch.cyan()
    );
    shallow_clone(&source.url, &source.branch, &target).await?;
    Ok(())
}

/// 設定のラベルに Application / ApplicationVersion を加える
fn build_labels(
    configured: &BTreeMap<String, String>,
    application: &str,
    release: &Release,
) -> BTreeMap<String, String> {
    let mut labels = configured.clone();
    labels.insert("Application".to_string(), application.to_string());
    labels.insert(
        "ApplicationVersion".to_string(),
        release.resolution.next.to_string(),
    );
    labels
}
