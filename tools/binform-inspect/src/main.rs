// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! binform-inspect - evaluate formulas and index binary files from the shell

use anyhow::{bail, Context};
use binform::catalog::loader::load_catalog;
use binform::codec::{IndexEntry, StreamPair};
use binform::expr::{compile, Value, Variables};
use binform::record::{Record, RecordLayout};
use binform::{TypeId, TypeRegistry};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "binform-inspect")]
#[command(about = "Inspect binary files through a YAML type catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level when RUST_LOG is unset
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and evaluate a formula
    Eval {
        /// Formula text, e.g. "count * 4 + 8"
        formula: String,

        /// Variable binding NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, Value)>,
    },

    /// List the types of a catalog
    Types {
        /// YAML catalog file
        #[arg(short, long, value_name = "FILE")]
        catalog: PathBuf,

        /// Also list the builtin wire types
        #[arg(long)]
        builtins: bool,
    },

    /// Index a data file as one record and print its fields
    Index {
        /// YAML catalog file
        #[arg(short, long, value_name = "FILE")]
        catalog: PathBuf,

        /// Record type name
        #[arg(short = 't', long = "type", value_name = "NAME")]
        type_name: String,

        /// Write stream holding previously edited payloads
        #[arg(short, long, value_name = "FILE")]
        write: Option<PathBuf>,

        /// Binary data file
        #[arg(value_name = "DATA")]
        data: PathBuf,
    },
}

/// `--var` values: integers (decimal or 0x hex), `true`/`false`, else text.
fn parse_binding(arg: &str) -> Result<(String, Value), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", arg))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", arg));
    }

    let value = if let Ok(v) = raw.parse::<i64>() {
        Value::Int64(v)
    } else if let Some(v) = raw
        .strip_prefix("0x")
        .and_then(|hex| i64::from_str_radix(hex, 16).ok())
    {
        Value::Int64(v)
    } else {
        match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Text(raw.to_string()),
        }
    };
    Ok((name.to_string(), value))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG=binform=trace shows index and codec activity
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Eval { formula, vars } => cmd_eval(&formula, vars)?,
        Commands::Types { catalog, builtins } => cmd_types(&catalog, builtins)?,
        Commands::Index {
            catalog,
            type_name,
            write,
            data,
        } => cmd_index(&catalog, &type_name, write.as_deref(), &data)?,
    }

    Ok(())
}

fn cmd_eval(formula: &str, vars: Vec<(String, Value)>) -> anyhow::Result<()> {
    let mut expr = compile(formula).with_context(|| format!("compiling '{}'", formula))?;
    let mut variables = Variables::new();
    for (name, value) in vars {
        variables.set(name, value);
    }

    let value = expr
        .evaluate(&variables)
        .with_context(|| format!("evaluating '{}'", formula))?;
    println!("{}", value);
    Ok(())
}

fn open_catalog(path: &Path) -> anyhow::Result<TypeRegistry> {
    load_catalog(path).with_context(|| format!("loading catalog {}", path.display()))
}

fn cmd_types(catalog: &Path, builtins: bool) -> anyhow::Result<()> {
    let registry = open_catalog(catalog)?;

    for (id, spec) in registry.iter() {
        if spec.is_builtin() {
            if builtins {
                println!("{} {} (builtin)", id, spec.name());
            }
            continue;
        }

        println!("{} {}", id, spec.name());
        for property in spec.properties() {
            let type_name = registry
                .get(property.spec)
                .map_or("?", |target| target.name());
            print!("  {}: {}", property.name, type_name);
            for (kind, formula) in property.formulas() {
                print!(" {}={:?}", kind, formula);
            }
            println!();
        }
    }
    Ok(())
}

fn cmd_index(
    catalog: &Path,
    type_name: &str,
    write: Option<&Path>,
    data: &Path,
) -> anyhow::Result<()> {
    let registry = open_catalog(catalog)?;
    let Some(spec) = registry.lookup(type_name) else {
        bail!("type '{}' is not in {}", type_name, catalog.display());
    };

    let edits = match write {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => Vec::new(),
    };
    let file = File::open(data).with_context(|| format!("opening {}", data.display()))?;
    let total = file.metadata()?.len();
    log::debug!(
        "[inspect] {} bytes of data, {} bytes of edits",
        total,
        edits.len()
    );
    let mut streams = StreamPair::new(BufReader::new(file), Cursor::new(edits));

    let mut layout = RecordLayout::compile(&registry, spec)?;
    let record = layout
        .index(&mut streams.data)
        .with_context(|| format!("indexing {} as {}", data.display(), type_name))?;
    let consumed = streams.data.stream_position()?;
    if consumed < total {
        log::warn!(
            "[inspect] {} trailing bytes after {}",
            total - consumed,
            record.name()
        );
    }

    println!("{} ({} of {} bytes)", record.name(), consumed, total);
    print_record(&record, &mut streams)?;
    Ok(())
}

fn print_record<D, W>(record: &Record, streams: &mut StreamPair<D, W>) -> anyhow::Result<()>
where
    D: Read + Seek,
    W: Read + Seek,
{
    for field in record.fields() {
        if !field.present {
            println!("  {}: (absent)", field.name);
            continue;
        }

        for index in 0..field.count {
            let label = if field.count == 1 {
                field.name.clone()
            } else {
                format!("{}[{}]", field.name, index)
            };

            if field.type_id == TypeId::Custom {
                if let IndexEntry::Object { position, size } = record.entry(&field.name, index)? {
                    println!("  {}: object at {} ({} bytes)", label, position, size);
                }
                continue;
            }

            let value = record.get(&field.name, index, streams)?;
            println!("  {}: {} = {}", label, field.type_id, value);
        }
    }
    Ok(())
}
