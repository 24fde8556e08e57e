use dockwright_build::{EcrRegistry, Release, plan_release};
use dockwright_core::BuildConfig;

/// レジストリの既存タグから次のバージョンを表示
pub async fn handle(config: &BuildConfig, json: bool) -> anyhow::Result<()> {
    let repository = config.repository()?;
    let registry = EcrRegistry::from_profile(repository.profile.as_deref()).await;
    let release = plan_release(&registry, repository).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&release_json(&release))?);
    } else {
        println!("{}", release.tag);
    }
    Ok(())
}

fn release_json(release: &Release) -> serde_json::Value {
    let resolution = &release.resolution;
    serde_json::json!({
        "repository": release.repository.uri,
        "tag": release.tag,
        "image": release.image_reference(),
        "base": resolution.base.to_string(),
        "current": resolution.current.to_string(),
        "next": resolution.next.to_string(),
        "used_existing": resolution.used_existing,
    })
}
