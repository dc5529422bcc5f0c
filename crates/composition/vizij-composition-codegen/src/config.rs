//! Code generation settings.

use serde::{Deserialize, Serialize};

/// Names and banner text for one generated source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub namespace: String,
    /// Name of the public entry type exposing `TryCreate`.
    pub class_name: String,
    /// Written as line comments at the top of the file.
    pub header_comment: Option<String>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            namespace: "Compositions".into(),
            class_name: "AnimatedVisual".into(),
            header_comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: CodegenConfig =
            serde_json::from_str(r#"{"class_name":"Spinner"}"#).expect("config should parse");
        assert_eq!(config.class_name, "Spinner");
        assert_eq!(config.namespace, "Compositions");
        assert!(config.header_comment.is_none());
    }
}
