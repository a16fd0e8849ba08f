//! Ingest → canonicalize → map → derive region.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use log::{debug, info, warn};

use crate::{
    category::{self, KeyFold},
    config::CensusConfig,
    data::{ColumnKind, Table, normalize_column_name},
    error::Result,
    ingest, numeric,
};

/// Reads and normalizes a census file in one go.
pub fn load_path(path: &Path, config: &CensusConfig) -> Result<Table> {
    let table = ingest::read_path(path, &config.ingest_options()?)?;
    normalize(table, config)
}

pub fn load_bytes(bytes: &[u8], config: &CensusConfig) -> Result<Table> {
    let table = ingest::read_table(bytes, &config.ingest_options()?)?;
    normalize(table, config)
}

/// Applies the configured column treatments to a freshly ingested table.
///
/// Configured columns absent from the table are skipped with a warning so one
/// configuration can serve several extracts of the same survey.
pub fn normalize(table: Table, config: &CensusConfig) -> Result<Table> {
    let numeric_columns = if config.numeric_columns.is_empty() {
        let mut exclude: BTreeSet<String> = config
            .categories
            .keys()
            .map(|name| normalize_column_name(name))
            .collect();
        exclude.insert(normalize_column_name(&config.region_source));
        let inferred = infer_numeric_columns(&table, &exclude);
        debug!("Inferred numeric column(s): {inferred:?}");
        inferred
    } else {
        present_columns(&table, &config.numeric_columns, "numeric")
    };
    let table = numeric::canonicalize_columns(table, &numeric_columns)?;

    let mut maps = BTreeMap::new();
    for (name, map) in &config.categories {
        let normalized = normalize_column_name(name);
        if table.column_index(&normalized).is_some() {
            maps.insert(normalized, map.clone());
        } else {
            warn!("Categorical column '{name}' not present, skipping");
        }
    }
    let table = category::map_columns(table, &maps)?;

    let table = derive_region(table, config)?;
    info!(
        "Normalized {} row(s): {} numeric, {} categorical column(s)",
        table.row_count(),
        numeric_columns.len(),
        maps.len()
    );
    Ok(table)
}

/// Text columns whose every present cell reads as a number.
pub fn infer_numeric_columns(table: &Table, exclude: &BTreeSet<String>) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|column| column.kind == ColumnKind::Text && !exclude.contains(&column.name))
        .filter(|column| numeric::is_numeric_candidate(column))
        .map(|column| column.name.clone())
        .collect()
}

fn present_columns(table: &Table, names: &[String], role: &str) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| {
            let normalized = normalize_column_name(name);
            if table.column_index(&normalized).is_some() {
                Some(normalized)
            } else {
                warn!("Configured {role} column '{name}' not present, skipping");
                None
            }
        })
        .collect()
}

fn derive_region(table: Table, config: &CensusConfig) -> Result<Table> {
    if config.regions.is_empty() {
        return Ok(table);
    }
    let source = normalize_column_name(&config.region_source);
    let target = normalize_column_name(&config.region_column);
    if table.column_index(&source).is_none() {
        debug!("Region source '{source}' not present, no region column derived");
        return Ok(table);
    }
    if table.column_index(&target).is_some() {
        debug!("Column '{target}' already present, keeping it");
        return Ok(table);
    }
    category::derive_column(
        table,
        &source,
        &target,
        &config.region_map(),
        KeyFold::Normalized,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    #[test]
    fn inference_skips_codes_and_names() {
        let bytes = "NOM_TERR;SIST_CRIA;GAL_TOTAL\nBahia;1-SIST_POC;1.234\nAcre;4-Outro;-\n";
        let table = load_bytes(bytes.as_bytes(), &CensusConfig::default()).unwrap();
        assert_eq!(table.column("GAL_TOTAL").unwrap().kind, ColumnKind::Numeric);
        assert_eq!(table.column("NOM_TERR").unwrap().kind, ColumnKind::Text);
        assert_eq!(
            table.column("GAL_TOTAL").unwrap().values,
            vec![Value::Number(1234.0), Value::Missing]
        );
        assert_eq!(
            table.column("REGIAO").unwrap().values,
            vec![Value::text("Nordeste"), Value::text("Norte")]
        );
        assert_eq!(
            table.column("SIST_CRIA").unwrap().values[1],
            Value::text("Outros produtores")
        );
    }

    #[test]
    fn configured_columns_missing_from_data_are_skipped() {
        let config = CensusConfig {
            numeric_columns: vec!["VALOR".to_string(), "GAL_TOTAL".to_string()],
            ..CensusConfig::default()
        };
        let table = load_bytes(b"UF;VALOR\nSP;3000,5\n", &config).unwrap();
        assert_eq!(
            table.column("VALOR").unwrap().values,
            vec![Value::Number(3000.5)]
        );
        assert!(table.column("REGIAO").is_none());
    }
}
