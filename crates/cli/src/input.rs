//! # マニフェスト入力
//!
//! CLIに渡されたファイルからパッケージを読み込む。以下の形式に対応する。
//! - 生成済みローダースクリプト（`.js`）
//! - パッケージ記述子JSON（`package_name`, `remote_package_base`, `metadata`）
//! - マニフェストJSONのみ（`files`, `remote_package_size`）

use std::path::Path;

use anyhow::Context;
use datapack_core::{parse_loader_script, Package};
use datapack_types::{PackageDescriptor, PackageMetadata};

/// マニフェストファイルを読み込み、検証済みの `Package` を返す。
///
/// `package_name` / `remote_base` が指定されていれば、ファイル内の値より優先する。
/// マニフェストJSONのみの場合、名前の既定値は `<ファイル名>.data`。
pub fn read_package(
    path: &Path,
    package_name: Option<&str>,
    remote_base: Option<&str>,
) -> anyhow::Result<Package> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("マニフェストの読み込みに失敗: {}", path.display()))?;

    let mut descriptor = if path.extension().is_some_and(|ext| ext == "js") {
        parse_loader_script(&text)?
    } else {
        parse_json(&text, path)?
    };

    if let Some(name) = package_name {
        descriptor.package_name = name.to_string();
    }
    if let Some(base) = remote_base {
        descriptor.remote_package_base = base.to_string();
    }

    let package = Package::from_descriptor(&descriptor)
        .with_context(|| format!("マニフェストが不正です: {}", path.display()))?;
    Ok(package)
}

fn parse_json(text: &str, path: &Path) -> anyhow::Result<PackageDescriptor> {
    let value: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("JSONのパースに失敗: {}", path.display()))?;

    if value.get("package_name").is_some() {
        return Ok(serde_json::from_value(value)?);
    }

    let metadata: PackageMetadata = serde_json::from_value(value)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("package");
    Ok(PackageDescriptor::from_metadata(format!("{stem}.data"), metadata))
}
