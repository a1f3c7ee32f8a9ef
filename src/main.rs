use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use odaview::chart::{AxisType, ChartFieldBinding, ChartRole, ChartType};
use odaview::config::Config;
use odaview::infer::{RenderOptions, infer_default_bindings};
use odaview::measure::TextMetrics;
use odaview::result::{ResultSet, SortOrder, page};
use odaview::table::TableRenderer;
use odaview::tree::{TreeIndex, find_parent_key};
use odaview::{Error, load_tree, render_chart};

#[derive(Parser)]
#[command(name = "odaview", version, about = "Schema tree search and chart binding for query results")]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "odaview.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the flat pre-order index of a schema payload
    Index { schema: PathBuf },
    /// Print the keys to expand for a search term
    Search { schema: PathBuf, term: String },
    /// Print the parent key of a node
    Parent { schema: PathBuf, key: String },
    /// Print the default field binding for a query result
    Bind {
        result: PathBuf,
        /// Chart type, e.g. Line, Bar, Pie
        #[arg(short = 't', long)]
        chart: Option<String>,
    },
    /// Print the renderer payload for a query result
    Chart {
        result: PathBuf,
        /// Chart type, e.g. Line, Bar, Pie
        #[arg(short = 't', long)]
        chart: Option<String>,
        /// x-axis type: cat, linear, time, timeCat
        #[arg(long)]
        x_axis: Option<String>,
        #[arg(long)]
        x: Option<String>,
        #[arg(long)]
        y: Option<String>,
        #[arg(long)]
        series: Option<String>,
        #[arg(long)]
        angle: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Print one page of a query result as a table
    Table {
        result: PathBuf,
        /// Column to sort by
        #[arg(long)]
        sort: Option<String>,
        /// ascend or descend
        #[arg(long, default_value = "ascend")]
        order: String,
        /// Page number, from 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::load(&cli.config)?;
    let separator = config.tree.key_separator.as_str();

    match cli.command {
        Command::Index { schema } => {
            let tree = load_tree(&read(&schema)?, separator)?;
            print_json(TreeIndex::build(&tree).entries());
        }
        Command::Search { schema, term } => {
            let tree = load_tree(&read(&schema)?, separator)?;
            print_json(&TreeIndex::build(&tree).expanded_keys(&term));
        }
        Command::Parent { schema, key } => {
            let tree = load_tree(&read(&schema)?, separator)?;
            print_json(&find_parent_key(&key, &tree));
        }
        Command::Bind { result, chart } => {
            let result = ResultSet::from_json(&read(&result)?)?;
            let chart = chart_type(chart.as_deref(), &config)?;
            print_json(&infer_default_bindings(&result.columns(), chart));
        }
        Command::Chart {
            result,
            chart,
            x_axis,
            x,
            y,
            series,
            angle,
            color,
        } => {
            let result = ResultSet::from_json(&read(&result)?)?;
            let chart = chart_type(chart.as_deref(), &config)?;

            let mut binding = infer_default_bindings(&result.columns(), chart);
            apply_overrides(
                &mut binding,
                [
                    (ChartRole::X, x),
                    (ChartRole::Y, y),
                    (ChartRole::Series, series),
                    (ChartRole::Angle, angle),
                    (ChartRole::Color, color),
                ],
            );

            let options = RenderOptions {
                height: config.chart.height,
                animation: config.chart.animation,
                x_axis: x_axis.as_deref().map(AxisType::parse).transpose()?,
            };
            print_json(&render_chart(&result, chart, Some(binding), options)?);
        }
        Command::Table {
            result,
            sort,
            order,
            page: page_no,
        } => {
            let result = ResultSet::from_json(&read(&result)?)?;
            let order = SortOrder::parse(&order)?;
            let rows = match sort {
                Some(column) => result.sort_by_column(&column, order),
                None => result.rows.clone(),
            };

            let page_size = config.table.page_size;
            let index = page_no.saturating_sub(1);
            let renderer = TableRenderer::new(TextMetrics {
                max_cell_width: config.table.max_cell_width,
                ..TextMetrics::default()
            });
            print!("{}", renderer.render(&result.columns(), page(&rows, index, page_size)));
            print!("{}", renderer.footer(index, result.page_count(page_size), result.len()));
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

fn chart_type(name: Option<&str>, config: &Config) -> Result<ChartType, Error> {
    match name {
        Some(name) => Ok(ChartType::parse(name)?),
        None => Ok(config.default_chart()),
    }
}

fn apply_overrides<const N: usize>(binding: &mut ChartFieldBinding, overrides: [(ChartRole, Option<String>); N]) {
    for (role, column) in overrides {
        if let Some(column) = column {
            binding.set(role, column);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            process::exit(1);
        }
    }
}
