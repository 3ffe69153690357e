//! Diagram dialects and image formats.

use std::fmt;

/// Supported diagram dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Mermaid,
}

impl DiagramKind {
    /// Parse a dialect from a code fence info string or tag name.
    ///
    /// Returns `None` for anything that is not a diagram.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mermaid" => Some(Self::Mermaid),
            _ => None,
        }
    }

    /// Name used in fences, tags, and cache metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
        }
    }

    /// File extension for diagram source files.
    #[must_use]
    pub fn source_extension(self) -> &'static str {
        match self {
            Self::Mermaid => "mmd",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image format requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagramFormat {
    /// Vector output (default).
    #[default]
    Svg,
    /// Raster output.
    Png,
    /// Vector output embedded as PDF, preferred by LaTeX engines.
    Pdf,
}

impl DiagramFormat {
    /// Parse a format name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Format name, also used as the file extension.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(DiagramKind::parse("mermaid"), Some(DiagramKind::Mermaid));
        assert_eq!(DiagramKind::parse("Mermaid"), None);
        assert_eq!(DiagramKind::parse("plantuml"), None);
        assert_eq!(DiagramKind::parse(""), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DiagramKind::Mermaid.as_str(), "mermaid");
        assert_eq!(DiagramKind::Mermaid.source_extension(), "mmd");
        assert_eq!(DiagramKind::Mermaid.to_string(), "mermaid");
    }

    #[test]
    fn test_format_default() {
        assert_eq!(DiagramFormat::default(), DiagramFormat::Svg);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(DiagramFormat::parse("svg"), Some(DiagramFormat::Svg));
        assert_eq!(DiagramFormat::parse("png"), Some(DiagramFormat::Png));
        assert_eq!(DiagramFormat::parse("pdf"), Some(DiagramFormat::Pdf));
        assert_eq!(DiagramFormat::parse("jpeg"), None);
        assert_eq!(DiagramFormat::parse(""), None);
    }

    #[test]
    fn test_format_as_str() {
        for format in [DiagramFormat::Svg, DiagramFormat::Png, DiagramFormat::Pdf] {
            assert_eq!(DiagramFormat::parse(format.as_str()), Some(format));
        }
    }
}
