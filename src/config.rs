//! Run configuration
//!
//! Loaded once at startup from a JSON file and passed by reference into
//! every stage. The main file holds directories, file names and stage
//! settings; it points at four JSON mapping files keyed by source file name
//! (column types, stats columns, row filters, log mappings).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::{
    AssemblyRules, BoundaryRule, Category, CleanupColumns, ColumnType, RegionFilter, RowPredicate,
};

/// Mapping entries for one source as found in the log mapping file
pub type MappingEntries = Vec<BTreeMap<String, Vec<String>>>;

/// Filter entries for one source: a list of `{column: [allowed values]}`
pub type FilterEntries = Vec<BTreeMap<String, Vec<serde_json::Value>>>;

/// Paths and top-level settings as written in the main config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the open-data source files
    pub od_dir: PathBuf,
    /// Extension of source files, with or without the leading dot
    pub od_file_type: String,
    /// Single-character field separator used for sources and outputs
    pub csv_sep: String,
    /// Output directory for event logs
    pub log_dir: PathBuf,
    /// Output directory for data-quality statistics
    pub stats_dir: PathBuf,
    /// File name of the main tender table
    pub main_file: String,
    /// Write data-quality statistics while building the log
    pub collect_stats: bool,

    pub columns_type_file: Option<PathBuf>,
    pub stats_columns_file: Option<PathBuf>,
    pub filters_file: Option<PathBuf>,
    pub log_mapping_file: Option<PathBuf>,

    pub log: LogSettings,
    pub case_filter: CaseFilterSettings,
    pub partition: PartitionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            od_dir: PathBuf::from("data/od"),
            od_file_type: ".csv".to_string(),
            csv_sep: ";".to_string(),
            log_dir: PathBuf::from("data/log"),
            stats_dir: PathBuf::from("data/stats"),
            main_file: "tender_notice.csv".to_string(),
            collect_stats: false,
            columns_type_file: None,
            stats_columns_file: None,
            filters_file: None,
            log_mapping_file: None,
            log: LogSettings::default(),
            case_filter: CaseFilterSettings::default(),
            partition: PartitionSettings::default(),
        }
    }
}

/// Stage 1 settings: event names, trace attributes and output names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub opening_event: String,
    pub closing_event: String,
    pub trace_attributes: Vec<String>,
    pub region_attribute: String,
    pub excluded_regions: Vec<String>,
    pub amount_attribute: String,
    pub contract_type_attribute: String,
    pub log_file: String,
    pub case_ids_file: String,
    /// Column types used when reading persisted logs back
    pub log_column_types: BTreeMap<String, ColumnType>,
}

impl Default for LogSettings {
    fn default() -> Self {
        let trace_attributes: Vec<String> = [
            "oggetto_principale_contratto",
            "importo_lotto",
            "accordo_quadro",
            "cpv_division",
            "sezione_regionale",
            "cod_tipo_scelta_contraente",
            "cod_modalita_realizzazione",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut log_column_types = BTreeMap::new();
        log_column_types.insert("importo_lotto".to_string(), ColumnType::Float);

        Self {
            opening_event: "TENDER_NOTICE".to_string(),
            closing_event: "CONTRACT_END".to_string(),
            trace_attributes,
            region_attribute: "sezione_regionale".to_string(),
            excluded_regions: vec!["NON CLASSIFICATO".to_string()],
            amount_attribute: "importo_lotto".to_string(),
            contract_type_attribute: "oggetto_principale_contratto".to_string(),
            log_file: "anac_log_2016_2022.csv".to_string(),
            case_ids_file: "anac_log_2016_2022_caseids.csv".to_string(),
            log_column_types,
        }
    }
}

/// Stage 2 settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseFilterSettings {
    /// Reference list, relative to `log_dir` unless absolute
    pub reference_file: PathBuf,
    pub reference_column: String,
    pub reference_sep: String,
    pub output_file: String,
    /// Also require the opening event first and the closing event last
    pub require_boundaries: bool,
}

impl Default for CaseFilterSettings {
    fn default() -> Self {
        Self {
            reference_file: PathBuf::from("ANAC_TED_CIG_found.csv"),
            reference_column: "cig_ted".to_string(),
            reference_sep: ",".to_string(),
            output_file: "anac_log_2016_2022_ted.csv".to_string(),
            require_boundaries: false,
        }
    }
}

/// Stage 3 settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    /// Categories in output order
    pub thresholds: Vec<Category>,
    pub regions: Vec<String>,
    pub central_region: String,
    pub stats_file: String,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        let regions: Vec<String> = [
            "CENTRALE",
            "LOMBARDIA",
            "PIEMONTE",
            "LAZIO",
            "SICILIA",
            "VENETO",
            "TOSCANA",
            "EMILIA ROMAGNA",
            "CAMPANIA",
            "PUGLIA",
            "SARDEGNA",
            "LIGURIA",
            "CALABRIA",
            "MARCHE",
            "ABRUZZO",
            "FRIULI VENEZIA GIULIA",
            "UMBRIA",
            "BASILICATA",
            "PROVINCIA AUTONOMA DI BOLZANO",
            "PROVINCIA AUTONOMA DI TRENTO",
            "VALLE D'AOSTA",
            "MOLISE",
            " PROVINCIA AUTONOMA DI BOLZANO",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            thresholds: vec![
                Category::new("LAVORI", 5_382_000.0),
                Category::new("SERVIZI", 215_000.0),
                Category::new("FORNITURE", 215_000.0),
            ],
            regions,
            central_region: "CENTRALE".to_string(),
            stats_file: "anac_log_2016_2022_duration_by_oggetto_contratto.csv".to_string(),
        }
    }
}

/// The immutable run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub column_types: BTreeMap<String, ColumnType>,
    pub stats_columns: BTreeMap<String, Vec<String>>,
    pub filters: BTreeMap<String, FilterEntries>,
    pub log_mappings: BTreeMap<String, MappingEntries>,
    separator: u8,
    reference_separator: u8,
}

impl Config {
    /// Load the main config file and the mapping files it references.
    /// Relative mapping paths are resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = read_json(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let column_types = read_optional(base, settings.columns_type_file.as_deref())?;
        let stats_columns = read_optional(base, settings.stats_columns_file.as_deref())?;
        let filters = read_optional(base, settings.filters_file.as_deref())?;
        let log_mappings = read_optional(base, settings.log_mapping_file.as_deref())?;

        Self::from_parts(settings, column_types, stats_columns, filters, log_mappings)
    }

    /// Build a config from already parsed parts, validating separators and regions
    pub fn from_parts(
        settings: Settings,
        column_types: BTreeMap<String, ColumnType>,
        stats_columns: BTreeMap<String, Vec<String>>,
        filters: BTreeMap<String, FilterEntries>,
        log_mappings: BTreeMap<String, MappingEntries>,
    ) -> Result<Self, ConfigError> {
        let separator = parse_separator(&settings.csv_sep)?;
        let reference_separator = parse_separator(&settings.case_filter.reference_sep)?;

        let partition = &settings.partition;
        if !partition.regions.contains(&partition.central_region) {
            return Err(ConfigError::UnknownCentralRegion(
                partition.central_region.clone(),
            ));
        }

        Ok(Self {
            settings,
            column_types,
            stats_columns,
            filters,
            log_mappings,
            separator,
            reference_separator,
        })
    }

    /// Field separator for sources and outputs
    pub fn separator(&self) -> u8 {
        self.separator
    }

    pub fn reference_separator(&self) -> u8 {
        self.reference_separator
    }

    pub fn log_path(&self) -> PathBuf {
        self.settings.log_dir.join(&self.settings.log.log_file)
    }

    pub fn case_ids_path(&self) -> PathBuf {
        self.settings.log_dir.join(&self.settings.log.case_ids_file)
    }

    pub fn filtered_log_path(&self) -> PathBuf {
        self.settings.log_dir.join(&self.settings.case_filter.output_file)
    }

    pub fn reference_path(&self) -> PathBuf {
        self.settings
            .log_dir
            .join(&self.settings.case_filter.reference_file)
    }

    pub fn duration_stats_path(&self) -> PathBuf {
        self.settings.log_dir.join(&self.settings.partition.stats_file)
    }

    /// `<filtered log stem>_<CATEGORY>_above.csv` and `_below.csv`
    pub fn partition_paths(&self, category: &str) -> (PathBuf, PathBuf) {
        let output = &self.settings.case_filter.output_file;
        let stem = Path::new(output)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(output);
        let dir = &self.settings.log_dir;
        (
            dir.join(format!("{}_{}_above.csv", stem, category)),
            dir.join(format!("{}_{}_below.csv", stem, category)),
        )
    }

    /// Row predicates configured for a source
    pub fn row_predicates(&self, file_name: &str) -> Vec<RowPredicate> {
        self.filters
            .get(file_name)
            .map(|entries| {
                entries
                    .iter()
                    .flat_map(|entry| entry.iter())
                    .map(|(column, allowed)| {
                        RowPredicate::new(column.clone(), allowed.iter().map(json_scalar_text))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn mapping_entries(&self, file_name: &str) -> &[BTreeMap<String, Vec<String>>] {
        self.log_mappings
            .get(file_name)
            .map(|e| e.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats_columns(&self, file_name: &str) -> &[String] {
        self.stats_columns
            .get(file_name)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn assembly_rules(&self) -> AssemblyRules {
        let log = &self.settings.log;
        AssemblyRules {
            opening_event: log.opening_event.clone(),
            trace_attributes: log.trace_attributes.clone(),
            region_attribute: log.region_attribute.clone(),
            excluded_regions: log.excluded_regions.clone(),
        }
    }

    pub fn boundary_rule(&self) -> Option<BoundaryRule> {
        let log = &self.settings.log;
        self.settings
            .case_filter
            .require_boundaries
            .then(|| BoundaryRule {
                opening: log.opening_event.clone(),
                closing: log.closing_event.clone(),
            })
    }

    pub fn region_filter(&self) -> RegionFilter {
        let partition = &self.settings.partition;
        RegionFilter::excluding_central(&partition.regions, &partition.central_region)
    }

    pub fn cleanup_columns(&self) -> CleanupColumns {
        CleanupColumns::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            column_types: BTreeMap::new(),
            stats_columns: BTreeMap::new(),
            filters: BTreeMap::new(),
            log_mappings: BTreeMap::new(),
            separator: b';',
            reference_separator: b',',
        }
    }
}

fn parse_separator(text: &str) -> Result<u8, ConfigError> {
    let bytes = text.as_bytes();
    if bytes.len() == 1 && bytes[0].is_ascii() {
        Ok(bytes[0])
    } else if text == "\\t" {
        Ok(b'\t')
    } else {
        Err(ConfigError::InvalidSeparator(text.to_string()))
    }
}

/// Text form of an allowed filter value, matching how cells render
fn json_scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => crate::pipeline::format_float(f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional<T: DeserializeOwned + Default>(
    base: &Path,
    path: Option<&Path>,
) -> Result<T, ConfigError> {
    match path {
        Some(p) if p.is_absolute() => read_json(p),
        Some(p) => read_json(&base.join(p)),
        None => Ok(T::default()),
    }
}
