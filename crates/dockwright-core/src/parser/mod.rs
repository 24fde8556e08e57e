//! KDLパーサー
//!
//! Dockwrightの設定ファイル（dockwright.kdl）をパースします。

use crate::error::{ComposeError, Result};
use crate::model::{
    BuildConfig, DockerConfig, ImageSpec, RepositoryConfig, SourceConfig, TagVersion, TokenConfig,
    parse_selection,
};
use crate::version::VersionPolicy;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::{Path, PathBuf};

/// KDLファイルをパースしてBuildConfigを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<BuildConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ComposeError::file_io(path, e))?;
    parse_kdl_string(&content)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str) -> Result<BuildConfig> {
    let doc: KdlDocument = content.parse()?;

    let mut image = None;
    let mut build_image = None;
    let mut repository = None;
    let mut source = None;
    let mut tokens = TokenConfig::default();
    let mut docker = DockerConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "image" => image = Some(parse_image(node, "image", None)?),
            "build-image" => build_image = Some(node),
            "repository" => repository = Some(parse_repository(node)?),
            "source" => source = Some(parse_source(node)?),
            "tokens" => tokens = parse_tokens(node)?,
            "docker" => docker = parse_docker(node)?,
            _ => {
                // 不明なノードはスキップ
            }
        }
    }

    let image = image.ok_or_else(|| ComposeError::ConfigMissing("image".to_string()))?;
    // build-image の directory は省略時 image と同じ
    let build_image = build_image
        .map(|node| parse_image(node, "build-image", Some(image.output_directory.clone())))
        .transpose()?;
    // 両ステージは同じ出力ディレクトリに書き出される
    if let Some(build) = &build_image
        && build.output_directory != image.output_directory
    {
        return Err(ComposeError::InvalidConfig(format!(
            "build-image.directory ({}) は image.directory ({}) と同じである必要があります",
            build.output_directory.display(),
            image.output_directory.display()
        )));
    }

    Ok(BuildConfig {
        image,
        build_image,
        repository,
        source,
        tokens,
        docker,
    })
}

/// image / build-image ノードをパース
fn parse_image(
    node: &KdlNode,
    section: &str,
    default_directory: Option<PathBuf>,
) -> Result<ImageSpec> {
    let parent = required_string(node, section, "parent")?;
    let selected = required_string(node, section, "selected")?;
    let directory = match child_string(node, "directory") {
        Some(dir) => PathBuf::from(dir),
        None => default_directory
            .ok_or_else(|| ComposeError::ConfigMissing(format!("{}.directory", section)))?,
    };

    Ok(ImageSpec::new(parent, parse_selection(&selected), directory))
}

fn parse_repository(node: &KdlNode) -> Result<RepositoryConfig> {
    let base_version = child_value(node, "base-version")
        .ok_or_else(|| ComposeError::ConfigMissing("repository.base-version".to_string()))
        .and_then(parse_version_value)?;

    let policy = match child_string(node, "policy") {
        Some(policy) => policy.parse::<VersionPolicy>()?,
        None => VersionPolicy::default(),
    };

    Ok(RepositoryConfig {
        profile: child_string(node, "profile"),
        name: required_string(node, "repository", "name")?,
        application: required_string(node, "repository", "application")?,
        base_version,
        policy,
    })
}

fn parse_source(node: &KdlNode) -> Result<SourceConfig> {
    Ok(SourceConfig {
        url: required_string(node, "source", "url")?,
        branch: required_string(node, "source", "branch")?,
        folder: child_string(node, "folder"),
    })
}

fn parse_tokens(node: &KdlNode) -> Result<TokenConfig> {
    let defaults = TokenConfig::default();
    Ok(TokenConfig {
        timezone: child_string(node, "timezone"),
        exec: child_string(node, "exec"),
        opts: child_string(node, "opts"),
        build_root: child_string(node, "build-root").unwrap_or(defaults.build_root),
        launcher: child_string(node, "launcher").unwrap_or(defaults.launcher),
    })
}

fn parse_docker(node: &KdlNode) -> Result<DockerConfig> {
    let mut docker = DockerConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "network" => docker.network = first_string(child),
                "timeout" => {
                    let secs = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .and_then(|v| u64::try_from(v).ok())
                        .ok_or_else(|| {
                            ComposeError::InvalidConfig(
                                "docker.timeout には秒数（正の整数）を指定してください".to_string(),
                            )
                        })?;
                    docker.timeout_secs = Some(secs);
                }
                "label" => {
                    // label "KEY" "VALUE" 形式
                    let mut values = child.entries().iter().filter_map(|e| e.value().as_string());
                    match (values.next(), values.next()) {
                        (Some(key), Some(value)) => {
                            docker.labels.insert(key.to_string(), value.to_string());
                        }
                        _ => {
                            return Err(ComposeError::InvalidConfig(
                                "label には キー と 値 の2つの文字列が必要です".to_string(),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Ok(docker)
}

/// base-version は "1.0" / 1.0 / 1 のいずれでも可
fn parse_version_value(value: &KdlValue) -> Result<TagVersion> {
    let invalid = || {
        ComposeError::InvalidConfig(format!("repository.base-version が不正です: {}", value))
    };

    if let Some(s) = value.as_string() {
        return s.parse().map_err(|_| invalid());
    }
    if let Some(f) = value.as_float() {
        return TagVersion::from_f64(f).ok_or_else(invalid);
    }
    if let Some(i) = value.as_integer() {
        return TagVersion::from_f64(i as f64).ok_or_else(invalid);
    }
    Err(invalid())
}

fn child<'a>(node: &'a KdlNode, name: &str) -> Option<&'a KdlNode> {
    node.children()?
        .nodes()
        .iter()
        .find(|child| child.name().value() == name)
}

fn child_value<'a>(node: &'a KdlNode, name: &str) -> Option<&'a KdlValue> {
    child(node, name)?.entries().first().map(|e| e.value())
}

fn child_string(node: &KdlNode, name: &str) -> Option<String> {
    child(node, name).and_then(first_string)
}

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
}

fn required_string(node: &KdlNode, section: &str, name: &str) -> Result<String> {
    child_string(node, name)
        .ok_or_else(|| ComposeError::ConfigMissing(format!("{}.{}", section, name)))
}
