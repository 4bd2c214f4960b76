/// The C standard a driver asked for. Accepted and stored for forward
/// compatibility; this core's lexer/parser/emitter behavior does not vary
/// by standard (`SPEC_FULL.md` §D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CStandard {
    C89,
    C99,
    C11,
}

impl Default for CStandard {
    fn default() -> Self {
        Self::C99
    }
}

/// Driver-facing configuration record (`spec.md` §6 "Driver surface").
///
/// Built with chainable `with_*` setters over a conservative `Default`,
/// the way `rvr-emit`'s `Compiler` config type is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub optimize_level: u8,
    pub emit_debug_info: bool,
    pub enable_warnings: bool,
    pub warnings_as_errors: bool,
    pub preprocess_only: bool,
    pub c_standard: CStandard,
    pub include_dirs: Vec<String>,
    pub macro_defines: Vec<(String, String)>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize_level: 0,
            emit_debug_info: false,
            enable_warnings: true,
            warnings_as_errors: false,
            preprocess_only: false,
            c_standard: CStandard::default(),
            include_dirs: Vec::new(),
            macro_defines: Vec::new(),
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_optimize_level(mut self, level: u8) -> Self {
        self.optimize_level = level.min(3);
        self
    }

    #[must_use]
    pub fn with_emit_debug_info(mut self, enabled: bool) -> Self {
        self.emit_debug_info = enabled;
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.enable_warnings = enabled;
        self
    }

    #[must_use]
    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    #[must_use]
    pub fn with_preprocess_only(mut self, enabled: bool) -> Self {
        self.preprocess_only = enabled;
        self
    }

    #[must_use]
    pub fn with_c_standard(mut self, standard: CStandard) -> Self {
        self.c_standard = standard;
        self
    }

    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<String>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_macro_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macro_defines.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_conservative_baseline() {
        let opts = CompileOptions::default();
        assert_eq!(opts.optimize_level, 0);
        assert!(opts.enable_warnings);
        assert!(!opts.warnings_as_errors);
        assert_eq!(opts.c_standard, CStandard::C99);
    }

    #[test]
    fn optimize_level_is_clamped() {
        let opts = CompileOptions::new().with_optimize_level(9);
        assert_eq!(opts.optimize_level, 3);
    }

    #[test]
    fn builder_chains() {
        let opts = CompileOptions::new()
            .with_optimize_level(2)
            .with_warnings_as_errors(true)
            .with_include_dir("/usr/include");
        assert_eq!(opts.optimize_level, 2);
        assert!(opts.warnings_as_errors);
        assert_eq!(opts.include_dirs, vec!["/usr/include".to_string()]);
    }
}
