//! Project configuration: which files to scan and what to report.

use std::path::Path;

use crate::error::Error;
use crate::types::{AccessLevel, ProcedureSubtype, Severity};

/// Name of the config file looked up at the workspace root.
pub const CONFIG_FILE: &str = ".aldoc.toml";

/// Files per scan batch when the config does not say otherwise.
const DEFAULT_BATCH_SIZE: usize = 32;

/// Raw TOML structure for `.aldoc.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct AldocTomlConfig {
    /// Access levels that must be documented.
    #[serde(default)]
    access_levels: Option<Vec<AccessLevel>>,
    /// Files per scan batch.
    #[serde(default)]
    batch_size: Option<usize>,
    /// Report undocumented objects.
    #[serde(default)]
    check_object_documentation: Option<bool>,
    /// Report obsolete declarations.
    #[serde(default)]
    check_obsolete: Option<bool>,
    /// Report incomplete procedure documentation.
    #[serde(default)]
    check_procedure_documentation: Option<bool>,
    /// Report triggers.
    #[serde(default)]
    check_triggers: Option<bool>,
    /// Path prefixes never scanned.
    #[serde(default)]
    exclude: Vec<String>,
    /// Path prefixes scanned.
    #[serde(default)]
    include: Vec<String>,
    /// Procedure categories recognised.
    #[serde(default)]
    procedure_types: Vec<ProcedureType>,
    /// Severity of every finding.
    #[serde(default)]
    severity: Option<Severity>,
}

/// Project configuration loaded from `.aldoc.toml`.
/// Include/exclude patterns are path prefixes applied to source files.
#[derive(Debug, Clone)]
pub struct Config {
    /// Files read concurrently per scan batch.
    pub batch_size: usize,
    /// Path prefixes never scanned.
    exclude: Vec<String>,
    /// Path prefixes scanned; empty scans everything.
    include: Vec<String>,
    /// Analysis settings handed to the builder and findings engine.
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        return Self::scan_everything_by_default();
    }
}

impl Config {
    /// Load config from `.aldoc.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed. Never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::InvalidConfig` if a value is out of range.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::scan_everything_by_default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed,
    /// or `Error::InvalidConfig` if `batch_size` is zero.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: AldocTomlConfig = toml::from_str(content)?;
        let defaults = Settings::default();

        let batch_size = raw.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "batch_size must be at least 1".to_string(),
            });
        }

        return Ok(Self {
            batch_size,
            exclude: raw.exclude,
            include: raw.include,
            settings: Settings {
                access_levels: raw.access_levels.unwrap_or(defaults.access_levels),
                check_object_documentation: raw
                    .check_object_documentation
                    .unwrap_or(defaults.check_object_documentation),
                check_obsolete: raw.check_obsolete.unwrap_or(defaults.check_obsolete),
                check_procedure_documentation: raw
                    .check_procedure_documentation
                    .unwrap_or(defaults.check_procedure_documentation),
                check_triggers: raw.check_triggers.unwrap_or(defaults.check_triggers),
                procedure_types: raw.procedure_types,
                severity: raw.severity.unwrap_or(defaults.severity),
            },
        });
    }

    /// Default config that includes everything and excludes nothing.
    fn scan_everything_by_default() -> Self {
        return Self {
            batch_size: DEFAULT_BATCH_SIZE,
            exclude: Vec::new(),
            include: Vec::new(),
            settings: Settings::default(),
        };
    }

    /// Check whether a source file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// Procedure categories the allow-list can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum ProcedureType {
    /// Integration, business and internal event publishers.
    EventPublisher,
    /// Event subscribers.
    EventSubscriber,
    /// Procedures without a categorising attribute.
    Normal,
    /// Test procedures.
    Test,
    /// Procedures marked `[TryFunction]`, whatever their subtype.
    TryFunction,
}

/// Read-only analysis settings.
#[allow(clippy::struct_excessive_bools, reason = "one flag per documented config key")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Access levels whose declarations must be documented.
    pub access_levels: Vec<AccessLevel>,
    /// Report objects without documentation.
    pub check_object_documentation: bool,
    /// Report obsolete objects and procedures too.
    pub check_obsolete: bool,
    /// Report procedures without complete documentation.
    pub check_procedure_documentation: bool,
    /// Report triggers as well as procedures.
    pub check_triggers: bool,
    /// Procedure categories recognised at all; empty recognises every category.
    pub procedure_types: Vec<ProcedureType>,
    /// Severity attached to every finding.
    pub severity: Severity,
}

impl Default for Settings {
    fn default() -> Self {
        return Self {
            access_levels: AccessLevel::ALL.to_vec(),
            check_object_documentation: true,
            check_obsolete: false,
            check_procedure_documentation: true,
            check_triggers: false,
            procedure_types: Vec::new(),
            severity: Severity::Information,
        };
    }
}

impl Settings {
    /// Whether a procedure of this category passes the allow-list.
    /// A try function passes if either `TryFunction` or its subtype is listed.
    pub fn allows_procedure(&self, subtype: ProcedureSubtype, is_try: bool) -> bool {
        if self.procedure_types.is_empty() {
            return true;
        }
        if is_try && self.procedure_types.contains(&ProcedureType::TryFunction) {
            return true;
        }
        let wanted = match subtype {
            ProcedureSubtype::EventPublisher => ProcedureType::EventPublisher,
            ProcedureSubtype::EventSubscriber => ProcedureType::EventSubscriber,
            ProcedureSubtype::Normal => ProcedureType::Normal,
            ProcedureSubtype::Test => ProcedureType::Test,
        };
        return self.procedure_types.contains(&wanted);
    }

    /// Whether declarations with this access level need documentation.
    pub fn requires_documentation(&self, access: AccessLevel) -> bool {
        return self.access_levels.contains(&access);
    }
}
