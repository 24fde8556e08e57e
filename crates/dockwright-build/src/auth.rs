//! レジストリ認証処理
//!
//! レジストリが払い出す認証トークンを Bollard の DockerCredentials に変換します。

use crate::error::{BuildError, BuildResult};
use base64::Engine;
use bollard::auth::DockerCredentials;

/// Base64エンコードされた "username:password" トークンをデコード
///
/// # Arguments
/// * `token` - 認証トークン（ECR の authorizationToken）
/// * `server` - 認証先のレジストリ（ECR の proxyEndpoint）
pub fn decode_authorization(token: &str, server: &str) -> BuildResult<DockerCredentials> {
    let failed = |message: String| BuildError::AuthFailed {
        registry: server.to_string(),
        message,
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(token.trim())
        .map_err(|e| failed(format!("Failed to decode auth: {}", e)))?;

    let auth_str =
        String::from_utf8(decoded).map_err(|e| failed(format!("Invalid UTF-8 in auth: {}", e)))?;

    let (username, password) = auth_str
        .split_once(':')
        .ok_or_else(|| failed("Token is not in username:password form".to_string()))?;

    Ok(DockerCredentials {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        serveraddress: Some(server.to_string()),
        ..Default::default()
    })
}

/// イメージ名からレジストリを抽出
///
/// # Examples
/// - `123456.dkr.ecr.region.amazonaws.com/app` -> `123456.dkr.ecr.region.amazonaws.com`
/// - `localhost:5000/app` -> `localhost:5000`
/// - `myuser/app:tag` -> `docker.io`
pub fn extract_registry(image: &str) -> String {
    if let Some((first, _)) = image.split_once('/') {
        // `.` か `:` を含む先頭要素はレジストリ
        if first.contains('.') || first.contains(':') {
            return first.to_string();
        }
    }

    "docker.io".to_string()
}
