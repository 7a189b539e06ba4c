//! CLI configuration, populated from environment variables.

use gxl::{WriteOptions, DEFAULT_DOCTYPE};

/// Output settings shared by the subcommands that write XML.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `GXL_INDENT` | `2` | Spaces per nesting level |
/// | `GXL_XML_DECL` | `true` | Emit the `<?xml ...?>` declaration |
/// | `GXL_DOCTYPE` | the GXL 1.0 DTD | Document type identifier used by `gxl new` |
///
/// Logging is controlled separately through `RUST_LOG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub indent: usize,
    pub xml_declaration: bool,
    pub doctype: String,
}

impl CliConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let indent = lookup("GXL_INDENT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(2);

        let xml_declaration = lookup("GXL_XML_DECL")
            .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            indent,
            xml_declaration,
            doctype: lookup("GXL_DOCTYPE").unwrap_or_else(|| DEFAULT_DOCTYPE.into()),
        }
    }

    /// Write options, with an optional `--indent` override.
    pub fn write_options(&self, indent: Option<usize>) -> WriteOptions {
        WriteOptions {
            indent: indent.unwrap_or(self.indent),
            xml_declaration: self.xml_declaration,
        }
    }
}

// --- tests -------------------------------------------------------------------
