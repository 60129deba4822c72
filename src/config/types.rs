//! Shapes of the configuration files read from a project root.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The parts of a package.json file that affect analysis.
///
/// # Example
///
/// ```
/// use exportscope::config::PackageJson;
///
/// let json = r#"{"name": "my-app", "main": "src/index.ts"}"#;
/// let pkg: PackageJson = serde_json::from_str(json).unwrap();
/// assert_eq!(pkg.main.as_deref(), Some("src/index.ts"));
/// assert!(pkg.exportscope.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageJson {
    /// The name of the package.
    pub name: Option<String>,

    /// Entry point. Its exports may be treated as used.
    pub main: Option<String>,

    /// Tool settings under the `"exportscope"` key.
    pub exportscope: Option<ToolSettings>,
}

/// Settings read from the `"exportscope"` object of package.json.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSettings {
    /// Replaces the include globs derived from tsconfig.
    pub include: Option<Vec<String>>,

    /// Replaces the exclude globs derived from tsconfig.
    pub exclude: Option<Vec<String>>,

    /// Files whose unused exports are never reported.
    pub ignore: Option<Vec<String>>,

    /// Treat exports of the `main` entry as used. Defaults to true.
    pub main_exports_used: Option<bool>,

    /// Run circular import detection. Defaults to true.
    pub detect_circular_imports: Option<bool>,

    pub allow_js: Option<bool>,

    /// Honor `// exportscope-ignore-next-line`. Defaults to true.
    pub ignore_marker: Option<bool>,
}

/// `extends` may be a single path or, since TypeScript 5.0, a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Extends {
    One(String),
    Many(Vec<String>),
}

impl Extends {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Extends::One(path) => vec![path.as_str()],
            Extends::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// A tsconfig.json or jsconfig.json file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    pub extends: Option<Extends>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub compiler_options: CompilerOptions,
}

/// The compiler options that drive module resolution.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    pub base_url: Option<String>,
    pub paths: Option<BTreeMap<String, Vec<String>>>,
    pub module_suffixes: Option<Vec<String>>,
    pub allow_js: Option<bool>,
    pub out_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_settings_camel_case() {
        let json = r#"{
            "exportscope": {
                "ignore": ["src/legacy/**"],
                "mainExportsUsed": false,
                "detectCircularImports": true,
                "allowJs": true,
                "ignoreMarker": false
            }
        }"#;
        let pkg: PackageJson = serde_json::from_str(json).unwrap();
        let settings = pkg.exportscope.unwrap();
        assert_eq!(settings.ignore, Some(vec!["src/legacy/**".to_string()]));
        assert_eq!(settings.main_exports_used, Some(false));
        assert_eq!(settings.detect_circular_imports, Some(true));
        assert_eq!(settings.allow_js, Some(true));
        assert_eq!(settings.ignore_marker, Some(false));
        assert!(settings.include.is_none());
    }

    #[test]
    fn test_tsconfig_compiler_options() {
        let json = r#"{
            "extends": "./base.json",
            "include": ["src"],
            "compilerOptions": {
                "baseUrl": ".",
                "paths": {"@/*": ["src/*"]},
                "moduleSuffixes": [".ios", ""],
                "outDir": "dist",
                "strict": true
            }
        }"#;
        let config: TsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extends, Some(Extends::One("./base.json".to_string())));
        assert_eq!(config.compiler_options.base_url.as_deref(), Some("."));
        assert_eq!(config.compiler_options.paths.unwrap()["@/*"], vec!["src/*"]);
        assert_eq!(
            config.compiler_options.module_suffixes,
            Some(vec![".ios".to_string(), String::new()])
        );
        assert_eq!(config.compiler_options.out_dir.as_deref(), Some("dist"));
    }

    #[test]
    fn test_extends_list() {
        let json = r#"{"extends": ["./a.json", "./b.json"]}"#;
        let config: TsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extends.unwrap().paths(), vec!["./a.json", "./b.json"]);
    }

    #[test]
    fn test_missing_compiler_options_defaults() {
        let config: TsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.compiler_options, CompilerOptions::default());
    }
}
