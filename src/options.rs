// Copyright (C) Brian G. Milnes 2025

//! Analyzer and code fix configuration

pub mod options {
    use std::sync::OnceLock;

    use anyhow::{bail, Context, Result};
    use regex::Regex;
    use serde::{Deserialize, Serialize};

    /// Words that cannot be used as a loop variable
    const KEYWORDS: &[&str] = &[
        "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
        "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event",
        "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto", "if",
        "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace", "new", "null",
        "object", "operator", "out", "override", "params", "private", "protected", "public", "readonly",
        "ref", "return", "sbyte", "sealed", "short", "sizeof", "stackalloc", "static", "string", "struct",
        "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong", "unchecked", "unsafe",
        "ushort", "using", "virtual", "void", "volatile", "while",
    ];

    fn identifier_pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
    }

    pub fn is_keyword(name: &str) -> bool {
        KEYWORDS.contains(&name)
    }

    /// A name usable as a loop variable
    pub fn is_valid_identifier(name: &str) -> bool {
        identifier_pattern().is_match(name) && !is_keyword(name)
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AnalyzerOptions {
        /// Simple name of the utility method to rewrite
        pub method_name: String,
        /// Parameter name that marks a callback argument as unused
        pub placeholder_name: String,
        /// Loop variable name used when the parameter is the placeholder
        pub replacement_name: String,
        /// One level of indentation in synthesized blocks
        pub indent_unit: String,
        pub concurrent_execution: bool,
        pub analyze_generated_code: bool,
        pub generated_file_suffixes: Vec<String>,
    }

    impl Default for AnalyzerOptions {
        fn default() -> Self {
            AnalyzerOptions {
                method_name: "ForEach".to_string(),
                placeholder_name: "_".to_string(),
                replacement_name: "item".to_string(),
                indent_unit: "    ".to_string(),
                concurrent_execution: true,
                analyze_generated_code: false,
                generated_file_suffixes: vec![
                    ".g.cs".to_string(),
                    ".g.i.cs".to_string(),
                    ".designer.cs".to_string(),
                    ".generated.cs".to_string(),
                ],
            }
        }
    }

    impl AnalyzerOptions {
        /// Parse options from JSON; missing fields take their defaults
        pub fn from_json_str(json: &str) -> Result<Self> {
            let options: AnalyzerOptions = serde_json::from_str(json).context("Failed to parse analyzer options")?;
            options.validate()?;
            Ok(options)
        }

        pub fn validate(&self) -> Result<()> {
            if self.method_name.is_empty() {
                bail!("method_name cannot be empty");
            }
            if !is_valid_identifier(&self.replacement_name) {
                bail!("replacement_name '{}' is not a valid identifier", self.replacement_name);
            }
            if self.replacement_name == self.placeholder_name {
                bail!("replacement_name must differ from placeholder_name '{}'", self.placeholder_name);
            }
            if self.indent_unit.chars().any(|c| c != ' ' && c != '\t') {
                bail!("indent_unit may only contain spaces and tabs");
            }
            Ok(())
        }
    }
}
