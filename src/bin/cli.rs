// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! scadcore CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use scadcore::ast::Program;
use scadcore::transform::{extract_chain_in, to_column_major, MatrixComposer, Terminal};
use scadcore::{logging, ConversionConfig, ConversionResult, Converter, Mesh};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "scadcore")]
#[command(about = "Convert solid-modeling ASTs into triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON program and report every statement
    Convert {
        /// Program file (JSON AST)
        input: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Attach top-level transforms instead of baking them
        #[arg(long)]
        no_bake: bool,

        /// Convert statements one after another
        #[arg(long)]
        sequential: bool,

        /// Time limit per boolean operation
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Show the transform chain and composed matrix of every statement
    Inspect {
        /// Program file (JSON AST)
        input: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            json,
            no_bake,
            sequential,
            timeout_ms,
        } => {
            logging::init(cli.verbose, json)?;
            let mut config = ConversionConfig::load()?;
            config.bake_transforms &= !no_bake;
            config.parallel &= !sequential;
            if timeout_ms.is_some() {
                config.csg_timeout_ms = timeout_ms;
            }
            convert_command(&input, config, json)?;
        }
        Commands::Inspect { input } => {
            logging::init(cli.verbose, false)?;
            inspect_command(&input, &ConversionConfig::load()?)?;
        }
        Commands::Version => {
            println!("scadcore v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn read_program(input: &str) -> Result<Program> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read program file: {}", input))?;
    Program::from_json(&source).with_context(|| format!("Failed to parse program: {}", input))
}

#[derive(Serialize)]
struct StatementReport {
    index: usize,
    kind: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    vertices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triangles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StatementReport {
    fn new(index: usize, kind: String, result: &ConversionResult<Mesh>) -> Self {
        match result {
            Ok(mesh) => Self {
                index,
                kind,
                ok: true,
                vertices: Some(mesh.vertex_count()),
                triangles: Some(mesh.triangle_count()),
                volume: Some(mesh.volume()),
                error: None,
            },
            Err(err) => Self {
                index,
                kind,
                ok: false,
                vertices: None,
                triangles: None,
                volume: None,
                error: Some(err.to_string()),
            },
        }
    }
}

fn convert_command(input: &str, config: ConversionConfig, json: bool) -> Result<()> {
    let program = read_program(input)?;
    let converter = Converter::new(config);

    let start = Instant::now();
    let results = converter.convert_program(&program);
    let elapsed = start.elapsed();

    let reports: Vec<StatementReport> = program
        .statements
        .iter()
        .zip(&results)
        .enumerate()
        .map(|(index, (statement, result))| {
            StatementReport::new(index, statement.kind.to_string(), result)
        })
        .collect();

    if json {
        let out = serde_json::json!({
            "statements": reports,
            "elapsed_ms": elapsed.as_millis() as u64,
            "cache": converter.cache_stats(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_report(input, &reports, elapsed, &converter);
    }

    if reports.iter().any(|r| !r.ok) {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(
    input: &str,
    reports: &[StatementReport],
    elapsed: Duration,
    converter: &Converter,
) {
    println!("{} {}", "Converted".bold().cyan(), input);
    for report in reports {
        match &report.error {
            None => println!(
                "  {} [{}] {} - {} vertices, {} triangles, volume {:.3}",
                "✓".green(),
                report.index,
                report.kind,
                report.vertices.unwrap_or(0),
                report.triangles.unwrap_or(0),
                report.volume.unwrap_or(0.0)
            ),
            Some(error) => println!(
                "  {} [{}] {} - {}",
                "✗".red(),
                report.index,
                report.kind,
                error
            ),
        }
    }

    let failed = reports.iter().filter(|r| !r.ok).count();
    let stats = converter.cache_stats();
    println!();
    println!(
        "{} statements, {} failed, {:.2?}",
        reports.len(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().green()
        },
        elapsed
    );
    println!(
        "cache: {} hits, {} misses, {} entries",
        stats.hits, stats.misses, stats.entries
    );
}

fn inspect_command(input: &str, config: &ConversionConfig) -> Result<()> {
    let program = read_program(input)?;
    let composer = MatrixComposer::new(config.rotation_mode);

    let scope = Converter::new(config.clone()).seed_scope(&program);

    for (index, statement) in program.statements.iter().enumerate() {
        println!("{} [{}] {}", "Statement".bold(), index, statement.kind);

        let chain = match extract_chain_in(statement, &scope) {
            Ok(chain) => chain,
            Err(err) => {
                println!("  {} {}", "✗".red(), err);
                continue;
            }
        };

        for op in &chain.operations {
            println!("  {} {:?}", "→".cyan(), op);
        }
        match chain.terminal {
            Terminal::Node(node) => println!("  terminal: {}", node.kind),
            Terminal::Group(children) => println!("  terminal: group of {}", children.len()),
        }

        match composer.compose_matrix(&chain.operations) {
            Ok(matrix) => println!("  matrix (column-major): {:?}", to_column_major(&matrix)),
            Err(err) => println!("  {} {}", "✗".red(), err),
        }
    }

    Ok(())
}
