//! # ローダースクリプトからのマニフェスト抽出
//!
//! ビルドツールが生成したパッケージローダースクリプト（`.js`）から
//! パッケージ名・リモート名・`loadPackage(...)` に渡されるJSONを読み取る。
//! スクリプトは実行しない。

use datapack_types::{PackageDescriptor, PackageMetadata};

use crate::error::LoadError;

/// ローダースクリプトを解析して `PackageDescriptor` を返す。
///
/// `REMOTE_PACKAGE_BASE` が見つからない場合は `PACKAGE_NAME` の末尾要素を使う。
pub fn parse_loader_script(script: &str) -> Result<PackageDescriptor, LoadError> {
    let package_name = string_assignment(script, "PACKAGE_NAME").ok_or_else(|| {
        LoadError::InvalidManifest("PACKAGE_NAME が見つかりません".to_string())
    })?;
    let remote_package_base = string_assignment(script, "REMOTE_PACKAGE_BASE")
        .unwrap_or_else(|| {
            package_name
                .rsplit('/')
                .next()
                .unwrap_or(&package_name)
                .to_string()
        });

    let call = script.rfind("loadPackage(").ok_or_else(|| {
        LoadError::InvalidManifest("loadPackage(...) 呼び出しが見つかりません".to_string())
    })?;
    let args = &script[call + "loadPackage(".len()..];
    let metadata = serde_json::Deserializer::from_str(args)
        .into_iter::<PackageMetadata>()
        .next()
        .ok_or_else(|| {
            LoadError::InvalidManifest("loadPackage の引数が空です".to_string())
        })?
        .map_err(|e| LoadError::InvalidManifest(format!("loadPackage の引数が不正: {e}")))?;

    Ok(PackageDescriptor {
        package_name,
        remote_package_base,
        metadata,
    })
}

/// `var NAME = '...'` 形式の文字列代入を探す。
fn string_assignment(script: &str, name: &str) -> Option<String> {
    let marker = format!("var {name} = ");
    let start = script.find(&marker)? + marker.len();
    let rest = &script[start..];
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &rest[1..];
    let end = body.find(quote)?;
    Some(body[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
  var Module = typeof Module !== 'undefined' ? Module : {};
  Module.expectedDataFileDownloads++;
  (function() {
    var loadPackage = function(metadata) {
      var PACKAGE_NAME = 'packaged_data/ExportBunny.data';
      var REMOTE_PACKAGE_BASE = 'ExportBunny.data';
      var REMOTE_PACKAGE_NAME = Module['locateFile'] ? Module['locateFile'](REMOTE_PACKAGE_BASE, '') : REMOTE_PACKAGE_BASE;
      var REMOTE_PACKAGE_SIZE = metadata['remote_package_size'];
    }
    loadPackage({"files": [{"filename": "/ExportBunny/ExportBunny_0.vtp", "start": 0, "end": 127363}, {"filename": "/ExportBunny/ExportBunny_1.vtp", "start": 127363, "end": 254687}], "remote_package_size": 254687});

  })();
"#;

    #[test]
    fn test_parse_generated_script() {
        let desc = parse_loader_script(SCRIPT).unwrap();
        assert_eq!(desc.package_name, "packaged_data/ExportBunny.data");
        assert_eq!(desc.remote_package_base, "ExportBunny.data");
        assert_eq!(desc.metadata.files.len(), 2);
        assert_eq!(desc.metadata.remote_package_size, 254687);
        assert_eq!(desc.metadata.files[1].filename, "/ExportBunny/ExportBunny_1.vtp");
    }

    #[test]
    fn test_remote_base_falls_back_to_package_name() {
        let script = r#"var PACKAGE_NAME = "out/assets.data";
            loadPackage({"files": [{"filename": "/a", "start": 0, "end": 1}], "remote_package_size": 1});"#;
        let desc = parse_loader_script(script).unwrap();
        assert_eq!(desc.remote_package_base, "assets.data");
    }

    #[test]
    fn test_missing_call_is_invalid() {
        let script = "var PACKAGE_NAME = 'x.data';";
        assert!(matches!(
            parse_loader_script(script),
            Err(LoadError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_broken_json_is_invalid() {
        let script = "var PACKAGE_NAME = 'x.data'; loadPackage({\"files\": [);";
        assert!(matches!(
            parse_loader_script(script),
            Err(LoadError::InvalidManifest(_))
        ));
    }
}
