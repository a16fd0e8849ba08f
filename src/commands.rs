use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};

use crate::{
    binning::{self, BinningOptions},
    cli::{CleanArgs, CorrelateArgs, GlobalArgs, PorteArgs, RankArgs},
    config::CensusConfig,
    correlation,
    data::{Table, Value, format_number, normalize_column_name},
    io_utils, pipeline,
    rank::{self, Aggregation, RankEntry},
    table,
};

/// Loads the configuration and applies command-line overrides.
pub fn resolve_config(global: &GlobalArgs) -> Result<CensusConfig> {
    let mut config = match &global.config {
        Some(path) => CensusConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => CensusConfig::default(),
    };
    if let Some(delimiter) = global.delimiter {
        config.delimiter = (delimiter as char).to_string();
    }
    if !global.input_encoding.is_empty() {
        config.encodings = global.input_encoding.clone();
    }
    config.validate().context("Validating configuration")?;
    Ok(config)
}

fn load(input: &Path, config: &CensusConfig) -> Result<Table> {
    pipeline::load_path(input, config).with_context(|| format!("Reading census table {input:?}"))
}

pub fn clean(args: &CleanArgs, config: &CensusConfig) -> Result<()> {
    let table = load(&args.input, config)?;
    if let Some(limit) = args.preview {
        print!("{}", table::render_data(&table, limit));
        return Ok(());
    }
    let delimiter = config.delimiter_byte()?;
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)
        .context("Opening output")?;
    writer
        .write_record(table.headers())
        .context("Writing header row")?;
    for row in table.export_rows() {
        writer.write_record(&row).context("Writing row")?;
    }
    writer.flush().context("Flushing output")?;
    info!(
        "Wrote {} normalized row(s) across {} column(s)",
        table.row_count(),
        table.column_count()
    );
    Ok(())
}

pub fn porte(args: &PorteArgs, config: &CensusConfig) -> Result<()> {
    let table = load(&args.input, config)?;
    let column_name = normalize_column_name(&args.column);
    let mut options: BinningOptions = config.binning.clone();
    if let Some(groups) = args.groups {
        options.groups = groups;
    }
    let column = table
        .require(&column_name)
        .with_context(|| format!("Classifying column '{column_name}'"))?;
    let binning = binning::classify(column, &options)
        .with_context(|| format!("Classifying column '{column_name}'"))?;
    if binning.is_reduced() {
        warn!(
            "Produced {} group(s) for '{}' instead of {}",
            binning.produced(),
            config.describe(&column_name),
            binning.requested
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&binning)?);
        return Ok(());
    }
    let total: usize = binning.counts.iter().sum();
    let headers = vec![
        "porte".to_string(),
        "lower".to_string(),
        "upper".to_string(),
        "rows".to_string(),
        "share".to_string(),
    ];
    let rows = binning
        .bins
        .bins()
        .iter()
        .zip(&binning.counts)
        .map(|(bin, count)| {
            let share = if total == 0 {
                0.0
            } else {
                (*count as f64 / total as f64) * 100.0
            };
            vec![
                bin.label.clone(),
                format_number(bin.lower),
                format_number(bin.upper),
                count.to_string(),
                format!("{share:.2}%"),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

pub fn rank(args: &RankArgs, config: &CensusConfig) -> Result<()> {
    let mut table = load(&args.input, config)?;
    if let Some(region) = &args.region {
        table = filter_region(table, region, config)?;
    }
    let key = normalize_column_name(&args.by);
    let counting = args.metric.eq_ignore_ascii_case("count");
    if counting && args.mean {
        bail!("--mean needs a numeric --metric column; row counts cannot be averaged");
    }
    let (metric, aggregation) = if counting {
        (None, Aggregation::Count)
    } else if args.mean {
        (Some(normalize_column_name(&args.metric)), Aggregation::Mean)
    } else {
        (Some(normalize_column_name(&args.metric)), Aggregation::Sum)
    };
    let aggregate = rank::aggregate(&table, &key, metric.as_deref(), aggregation)
        .with_context(|| format!("Aggregating by '{key}'"))?;
    let set = rank::extract(&aggregate, args.n);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }
    let headers = vec![
        "view".to_string(),
        config.describe(&key).to_string(),
        config.describe(&aggregate.metric).to_string(),
    ];
    let mut rows = Vec::new();
    for (view, entries) in [("top", &set.top), ("middle", &set.middle), ("bottom", &set.bottom)] {
        rows.extend(entries.iter().map(|entry: &RankEntry| {
            vec![
                view.to_string(),
                entry.entity.clone(),
                format_number(entry.value),
            ]
        }));
    }
    table::print_table(&headers, &rows);
    Ok(())
}

pub fn correlate(args: &CorrelateArgs, config: &CensusConfig) -> Result<()> {
    let table = load(&args.input, config)?;
    let names = args
        .columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(normalize_column_name)
        .collect::<Vec<_>>();
    let selection = (!names.is_empty()).then_some(names.as_slice());
    let matrix =
        correlation::analyze(&table, selection).context("Computing correlation matrix")?;
    if matrix.is_empty() {
        warn!("Fewer than two numeric columns, nothing to correlate");
    }
    let pairs = matrix.top_pairs(args.top);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pairs)?);
        return Ok(());
    }
    let headers = vec!["a".to_string(), "b".to_string(), "r".to_string()];
    let rows = pairs
        .iter()
        .map(|pair| {
            vec![
                config.describe(&pair.a).to_string(),
                config.describe(&pair.b).to_string(),
                format!("{:.4}", pair.coefficient),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn filter_region(table: Table, region: &str, config: &CensusConfig) -> Result<Table> {
    let region_column = normalize_column_name(&config.region_column);
    let wanted = normalize_column_name(region);
    let mask = table
        .column(&region_column)
        .ok_or_else(|| anyhow!("Column '{region_column}' not available to filter by region"))?
        .values
        .iter()
        .map(|value| match value {
            Value::Text(name) => normalize_column_name(name) == wanted,
            _ => false,
        })
        .collect::<Vec<_>>();
    let table = table.retain_rows(&mask)?;
    info!("{} row(s) belong to region '{region}'", table.row_count());
    Ok(table)
}
