//! Versioned YAML configuration.
//!
//! A single document carries everything that is dataset-specific: how to read
//! the file, which columns are numeric, the code tables, the state → region
//! grouping, column descriptions and the binning defaults. Fields left out of
//! a document fall back to the built-in census configuration.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::{
    binning::BinningOptions,
    category::{CategoryMap, invert_groups},
    error::{CensusError, Result},
    ingest::IngestOptions,
    io_utils,
};

pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    pub version: u32,
    pub delimiter: String,
    /// Encoding labels tried in order when decoding input.
    pub encodings: Vec<String>,
    /// Columns to canonicalize as numbers. Empty means infer from the data.
    pub numeric_columns: Vec<String>,
    /// Column name → code table.
    pub categories: BTreeMap<String, CategoryMap>,
    /// Region name → member territory names.
    pub regions: BTreeMap<String, Vec<String>>,
    pub region_source: String,
    pub region_column: String,
    pub descriptions: BTreeMap<String, String>,
    pub binning: BinningOptions,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            delimiter: ";".to_string(),
            encodings: vec!["latin-1".to_string(), "utf-8".to_string()],
            numeric_columns: Vec::new(),
            categories: BTreeMap::from([("SIST_CRIA".to_string(), sist_cria_labels())]),
            regions: census_regions(),
            region_source: "NOM_TERR".to_string(),
            region_column: "REGIAO".to_string(),
            descriptions: census_descriptions(),
            binning: BinningOptions::default(),
        }
    }
}

impl CensusConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| CensusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CensusConfig = serde_yaml::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: CensusConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(CensusError::Config(format!(
                "unsupported configuration version {} (expected {CURRENT_CONFIG_VERSION})",
                self.version
            )));
        }
        self.delimiter_byte()?;
        self.encoding_list()?;
        if self.binning.groups == 0 {
            return Err(CensusError::Config(
                "binning.groups must be at least 1".to_string(),
            ));
        }
        if self.region_column.trim().is_empty() {
            return Err(CensusError::Config(
                "region_column cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        io_utils::parse_delimiter(&self.delimiter)
            .map_err(|reason| CensusError::Config(format!("delimiter: {reason}")))
    }

    pub fn encoding_list(&self) -> Result<Vec<&'static Encoding>> {
        if self.encodings.is_empty() {
            return Err(CensusError::Config(
                "at least one encoding is required".to_string(),
            ));
        }
        io_utils::resolve_encodings(&self.encodings)
    }

    pub fn ingest_options(&self) -> Result<IngestOptions> {
        Ok(IngestOptions::default()
            .with_delimiter(self.delimiter_byte()?)
            .with_encodings(self.encoding_list()?))
    }

    /// Territory name → region name.
    pub fn region_map(&self) -> CategoryMap {
        invert_groups(&self.regions)
    }

    /// Human-readable description of a column, or the name itself.
    pub fn describe<'a>(&'a self, column: &'a str) -> &'a str {
        self.descriptions
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }
}

fn owned_pairs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn sist_cria_labels() -> CategoryMap {
    owned_pairs(&[
        ("1-SIST_POC", "Produtores de ovos para consumo"),
        ("2-SIST_POI", "Produtores de ovos para incubação"),
        ("3-SIST_PFC", "Produtores de frangos de corte"),
        ("4-Outro", "Outros produtores"),
    ])
}

fn census_regions() -> BTreeMap<String, Vec<String>> {
    let groups: [(&str, &[&str]); 5] = [
        (
            "Norte",
            &[
                "Acre", "Amapá", "Amazonas", "Pará", "Rondônia", "Roraima", "Tocantins",
            ],
        ),
        (
            "Nordeste",
            &[
                "Alagoas",
                "Bahia",
                "Ceará",
                "Maranhão",
                "Paraíba",
                "Pernambuco",
                "Piauí",
                "Rio Grande do Norte",
                "Sergipe",
            ],
        ),
        (
            "Centro-Oeste",
            &["Distrito Federal", "Goiás", "Mato Grosso", "Mato Grosso do Sul"],
        ),
        (
            "Sudeste",
            &["Espírito Santo", "Minas Gerais", "Rio de Janeiro", "São Paulo"],
        ),
        ("Sul", &["Paraná", "Rio Grande do Sul", "Santa Catarina"]),
    ];
    groups
        .iter()
        .map(|(region, states)| {
            (
                region.to_string(),
                states.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

fn census_descriptions() -> BTreeMap<String, String> {
    owned_pairs(&[
        ("SIST_CRIA", "Sistema de criação"),
        ("NIV_TERR", "Nível das unidades territoriais"),
        ("COD_TERR", "Código das unidades territoriais"),
        ("NOM_TERR", "Nome das unidades territoriais"),
        ("CL_GAL", "Número da classe de cabeças de galináceos em 30.09.2022"),
        ("NOM_CL_GAL", "Nome da classe de cabeças de galináceos em 30.09.2022"),
        (
            "E_CRIA_GAL",
            "Número de estabelecimentos agropecuários com criação de galináceos (Unidades)",
        ),
        (
            "E_GAL_VEND",
            "Número de estabelecimentos agropecuários que venderam galináceos (Unidades)",
        ),
        (
            "E_OVOS_PROD",
            "Número de estabelecimentos agropecuários com produção de ovos de galinha (Unidades)",
        ),
        (
            "GAL_TOTAL",
            "Total efetivo de galinhas, galos, frangas, frangos e pintos (Cabeça)",
        ),
        ("GAL_ENG", "Total de galináceos para engorda (Cabeça)"),
        ("GAL_GALOS", "Total de galos (Cabeça)"),
        ("GAL_POED", "Total de poedeiras (Cabeça)"),
        ("GAL_MATR", "Total de matrizes (Cabeça)"),
        ("GAL_VEND", "Quantidade de galináceos vendidos (Cabeça)"),
        ("V_GAL_VEND", "Valor dos galináceos vendidos (R$)"),
        ("Q_DZ_PROD", "Quantidade de ovos de galinha produzidos (Dúzia)"),
        ("Q_DZ_VEND", "Quantidade de ovos de galinha vendidos (Dúzia)"),
        ("V_Q_DZ_PROD", "Valor dos ovos de galinha produzidos (R$/dúzia)"),
        ("V_Q_DZ_VEND", "Valor dos ovos de galinha vendidos (R$/dúzia)"),
        ("A_TOTAL", "Área total do estabelecimento agropecuário (ha)"),
        ("A_PAST_PLANT", "Área de pastagem plantada (ha)"),
        ("A_LAV_PERM", "Área de lavoura permanente (ha)"),
        ("A_LAV_TEMP", "Área de lavoura temporária (ha)"),
        ("VTP_AGRO", "Valor total da produção agropecuária (R$)"),
        ("RECT_AGRO", "Receita total da produção agropecuária (R$)"),
        ("N_TRAB_TOTAL", "Total de trabalhadores em 30.09.2017"),
        (
            "N_TRAB_LACOS",
            "Total de trabalhadores com laços de parentesco com o produtor em 30.09.2017",
        ),
        ("REGIAO", "Região geográfica"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_covers_every_state() {
        let config = CensusConfig::default();
        config.validate().unwrap();
        let regions = config.region_map();
        assert_eq!(regions.len(), 27);
        assert_eq!(regions.get("São Paulo").map(String::as_str), Some("Sudeste"));
        assert!(config.describe("GAL_TOTAL").starts_with("Total efetivo"));
        assert_eq!(config.describe("UNKNOWN"), "UNKNOWN");
    }

    #[test]
    fn default_encodings_read_latin1_first() {
        let options = CensusConfig::default().ingest_options().unwrap();
        assert_eq!(options.encodings, io_utils::default_encodings());
        assert_eq!(options.delimiter, b';');
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = CensusConfig::from_yaml_str("version: 1\ndelimiter: \",\"\n").unwrap();
        assert_eq!(config.delimiter_byte().unwrap(), b',');
        assert!(config.categories.contains_key("SIST_CRIA"));
        assert_eq!(config.binning.groups, 3);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = CensusConfig::from_yaml_str("version: 2\n").unwrap_err();
        assert!(matches!(err, CensusError::Config(_)));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = CensusConfig::from_yaml_str("encodings: [klingon]\n").unwrap_err();
        assert!(matches!(err, CensusError::UnknownEncoding(_)));
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let config = CensusConfig::default();
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(CensusConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
