use dockwright_build::BuildError;

/// ローカルの Docker デーモンに接続し、疎通を確認
pub async fn connect() -> Result<bollard::Docker, BuildError> {
    let docker = bollard::Docker::connect_with_local_defaults()?;
    docker.ping().await?;
    tracing::debug!("Connected to Docker daemon");
    Ok(docker)
}
