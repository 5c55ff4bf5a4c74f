use std::process;

use clap::{Parser, Subcommand};
use varscope_core::analysis::{
    annotate_declarations, build_intervals, collect_types, correlate, render, report_cachelines, report_functions,
    report_intervals, report_layouts, report_locals, report_types, RenderMode, RenderOptions, ResolveLines,
    SourceTable, TypeSet,
};
use varscope_core::{DiagnosticSink, Result as AnalysisResult, SymbolTable};
use varscope_utils::{info, init_logging};

/// Debug-info layout and variable-lifetime analyzer for compiled binaries.
#[derive(Parser, Debug)]
#[command(name = "varscope")]
#[command(version)]
#[command(about = "Debug-info layout and variable-lifetime analyzer", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List global variables by address and flag contended cache lines
    Cachelines
    {
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
    },
    /// List every function with its offset, size, and module
    Functions
    {
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
    },
    /// Dump the parameters and locals of one function
    Locals
    {
        /// Function name (must match exactly one function)
        function: String,
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
    },
    /// List every type reachable from variables, with sizes
    Types
    {
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
    },
    /// Report the cache-line layout of large structures
    Layout
    {
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
    },
    /// Dump merged variable-location intervals with source positions
    Intervals
    {
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
        /// Also dump every variable per function while building
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Annotate source lines with declared and available variables
    Lines
    {
        /// Path to the binary to analyze
        #[arg(default_value = "./a.out")]
        path: String,
        /// Include files discovered only through inlined code
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
        /// Print diagnostics to stdout and suppress the report
        #[arg(short, long, default_value_t = false)]
        warnings: bool,
        /// Emit only annotated lines, one record per line
        #[arg(short, long, default_value_t = false)]
        machine_readable: bool,
        /// Discard diagnostics and suppress the report
        #[arg(short, long, default_value_t = false)]
        quiet: bool,
    },
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    // Defaults to INFO level and Pretty format if not set
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help and version requests are not argument errors
            process::exit(i32::from(e.use_stderr()));
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

fn run_command(cli: Cli) -> AnalysisResult<()>
{
    match cli.command {
        Commands::Cachelines { path } => {
            let sink = DiagnosticSink::stderr();
            let table = SymbolTable::open(&path, &sink)?;
            info!("Clustering globals of {}", path);
            let mut globals = table.all_global_variables()?.to_vec();
            globals.sort_by_key(|var| var.offset);
            print!("{}", report_cachelines(&globals, table.modules(), table.types()));
            Ok(())
        }
        Commands::Functions { path } => {
            let sink = DiagnosticSink::stderr();
            let table = SymbolTable::open(&path, &sink)?;
            print!("{}", report_functions(table.all_functions()?, table.modules()));
            Ok(())
        }
        Commands::Locals { function, path } => {
            let sink = DiagnosticSink::stderr();
            let table = SymbolTable::open(&path, &sink)?;
            let func = table.find_function(&function)?;
            print!("{}", report_locals(func, table.types()));
            Ok(())
        }
        Commands::Types { path } => {
            let sink = DiagnosticSink::stderr();
            let table = SymbolTable::open(&path, &sink)?;
            let types = reachable_types(&table);
            print!("{}", report_types(table.types(), &types));
            Ok(())
        }
        Commands::Layout { path } => {
            let sink = DiagnosticSink::stderr();
            let table = SymbolTable::open(&path, &sink)?;
            let types = reachable_types(&table);
            print!("{}", report_layouts(table.types(), &types));
            Ok(())
        }
        Commands::Intervals { path, verbose } => {
            let sink = DiagnosticSink::stderr();
            let table = SymbolTable::open(&path, &sink)?;
            let functions = table.all_functions()?;
            let mut sources = SourceTable::new();
            let mut dump = String::new();
            let resolver: Option<&dyn ResolveLines> = if verbose { Some(&table) } else { None };
            let map = build_intervals(
                functions,
                table.modules(),
                table.types(),
                &mut sources,
                &sink,
                resolver,
                verbose.then_some(&mut dump),
            );
            if verbose {
                print!("{dump}");
            }
            print!("{}", report_intervals(&map, functions, table.types(), &table));
            Ok(())
        }
        Commands::Lines {
            path,
            verbose,
            warnings,
            machine_readable,
            quiet,
        } => {
            let sink = if quiet {
                DiagnosticSink::discard()
            } else if warnings {
                DiagnosticSink::stdout()
            } else {
                DiagnosticSink::stderr()
            };
            let table = SymbolTable::open(&path, &sink)?;
            let functions = table.all_functions()?;
            let mut sources = SourceTable::new();
            let map = build_intervals(functions, table.modules(), table.types(), &mut sources, &sink, None, None);
            correlate(&table, &map, functions, &mut sources, &sink, verbose);
            annotate_declarations(functions, table.modules(), &mut sources, &sink);
            if !warnings && !quiet {
                let options = RenderOptions {
                    mode: if machine_readable { RenderMode::Machine } else { RenderMode::Human },
                    verbose,
                };
                print!("{}", render(&sources, functions, options));
            }
            Ok(())
        }
    }
}

/// Every type reachable from global variables, function locals, and the
/// base types the compilation units define.
fn reachable_types(table: &SymbolTable) -> TypeSet
{
    collect_types(table.types(), table.type_roots())
}
