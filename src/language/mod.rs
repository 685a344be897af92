use std::path::Path;

/// Source language of a scanned file. Drives the grammar selection in the
/// parse driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    C,
    #[default]
    Cpp,
}

const C_EXTENSIONS: &[&str] = &["c"];
const CPP_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "hpp", "hxx", "hh"];
const AMBIGUOUS_EXTENSIONS: &[&str] = &["h"];

/// Content markers that only appear in C++ translation units.
const CPP_MARKERS: &[&str] = &[
    "class ",
    "namespace ",
    "template<",
    "template <",
    "std::",
    "public:",
    "private:",
    "protected:",
    "nullptr",
    "::",
];

impl Language {
    /// Detects the language of a file from its extension, consulting the
    /// content for ambiguous `.h` headers.
    ///
    /// Unknown extensions default to C++, which parses a superset of the
    /// constructs the analysis cares about.
    #[must_use]
    pub fn detect(path: &Path, content: &str) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if CPP_EXTENSIONS.contains(&ext.as_str()) {
            return Self::Cpp;
        }
        if C_EXTENSIONS.contains(&ext.as_str()) {
            return Self::C;
        }
        if AMBIGUOUS_EXTENSIONS.contains(&ext.as_str()) {
            return Self::detect_from_content(content);
        }
        Self::Cpp
    }

    /// Classifies an extension as a header. Mirrors the extension set used
    /// by source discovery.
    #[must_use]
    pub fn is_header_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "h" | "hpp" | "hxx" | "hh"))
    }

    fn detect_from_content(content: &str) -> Self {
        if CPP_MARKERS.iter().any(|marker| content.contains(marker)) {
            Self::Cpp
        } else {
            Self::C
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
