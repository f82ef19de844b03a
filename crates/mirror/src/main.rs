use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use mirror_core::prelude::*;
use mirror_utils::{info, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingGuard};

/// Inspect the reflection database built from a binary's debug information.
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(version)]
#[command(about = "Inspect the reflection database built from a binary's debug information", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List every registered type
    Types
    {
        /// Path to an executable or object file with DWARF debug information
        binary: PathBuf,
        /// Only list types whose qualified name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show the layout and members of one type
    Show
    {
        /// Path to an executable or object file with DWARF debug information
        binary: PathBuf,
        /// Qualified name, unqualified name or keyword alias ("struct Point")
        type_name: String,
    },
    /// Print the namespace tree
    Namespaces
    {
        /// Path to an executable or object file with DWARF debug information
        binary: PathBuf,
    },
    /// Print build statistics
    Stats
    {
        /// Path to an executable or object file with DWARF debug information
        binary: PathBuf,
    },
}

fn main()
{
    let cli = Cli::parse();

    // Defaults to WARN and pretty output unless RUST_LOG / MIRROR_LOG_FORMAT say otherwise
    let logging: Result<LoggingGuard, _> = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty),
        None => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load(binary: &Path) -> MirrorResult<Database>
{
    let options = BuildOptions::from_env()?;
    info!("Loading debug information from {}", binary.display());
    Database::load(binary, &options)
}

fn run_command(command: Commands) -> MirrorResult<()>
{
    match command {
        Commands::Types { binary, filter } => {
            let database = load(&binary)?;
            let mut types: Vec<TypeInfo<'_>> = database
                .types()
                .filter(|ty| filter.as_deref().is_none_or(|needle| ty.full_name().contains(needle)))
                .collect();
            types.sort_by(|a, b| a.full_name().cmp(b.full_name()));
            for ty in &types {
                println!("{:<12} {:>6}  {}", ty.category().to_string(), ty.size(), ty.full_name());
            }
            println!("\n{} types", types.len());
            Ok(())
        }
        Commands::Show { binary, type_name } => {
            let database = load(&binary)?;
            let ty = database.type_of(&type_name)?;
            print_type(ty);
            Ok(())
        }
        Commands::Namespaces { binary } => {
            let database = load(&binary)?;
            print_namespace(database.root_namespace(), 0);
            Ok(())
        }
        Commands::Stats { binary } => {
            let database = load(&binary)?;
            print_stats(&database);
            Ok(())
        }
    }
}

fn print_type(ty: TypeInfo<'_>)
{
    println!("{} {}", ty.category(), ty.full_name());
    println!("  Size: {} bytes", ty.size());
    if let Ok(parent) = ty.parent() {
        let owner = if parent.full_name().is_empty() { "::" } else { parent.full_name() };
        println!("  Declared in: {}", owner);
    }
    if let Some(pointee) = ty.pointee() {
        println!("  Points to: {}", pointee.full_name());
    }
    if let Some(underlying) = ty.underlying() {
        println!("  Underlying: {}", underlying.full_name());
    }
    print_annotations(&ty, "  ");

    if let Some(record) = ty.as_record() {
        print_record(record);
    }
    if let Some(enumeration) = ty.as_enum() {
        println!("\nConstants:");
        for constant in enumeration.constants() {
            println!("  {} = {}", constant.name(), constant_value(&constant));
        }
    }
}

fn print_record(record: RecordInfo<'_>)
{
    if record.supertypes().next().is_some() {
        println!("\nBases:");
        for base in record.supertypes() {
            println!("  {}", base.full_name());
        }
    }

    println!("\nFields:");
    for field in record.fields() {
        println!(
            "  +{:<5} {:<24} {} ({} bytes)",
            field.offset(),
            field.name(),
            field.ty().name(),
            field.size()
        );
        print_annotations(&field, "        ");
    }

    if record.methods().next().is_some() {
        println!("\nMethods:");
        for method in record.methods() {
            print_callable(&method);
        }
    }

    let nested: Vec<TypeInfo<'_>> = record.nested_types().collect();
    if !nested.is_empty() {
        println!("\nNested types:");
        for ty in nested {
            println!("  {} {}", ty.category(), ty.name());
        }
    }
}

fn print_callable(callable: &CallableInfo<'_>)
{
    let parameters: Vec<String> = callable
        .parameters()
        .map(|parameter| format!("{} {}", parameter.ty().name(), parameter.name()))
        .collect();
    let location = match (callable.vtable_index(), callable.address()) {
        (Some(slot), _) => format!("virtual slot {}", slot),
        (None, Some(address)) => format!("{}", address),
        (None, None) => "no address".to_string(),
    };
    println!(
        "  {} {}({})  [{}]",
        callable.return_type().name(),
        callable.name(),
        parameters.join(", "),
        location
    );
}

fn print_annotations<'g>(element: &impl Annotated<'g>, indent: &str)
{
    for annotation in element.annotations() {
        let payload = match annotation.payload() {
            AnnotationPayload::Address(address) => format!("at {}", Address::new(*address)),
            AnnotationPayload::Inline(bytes) => format!("inline {}", hex(bytes)),
        };
        println!("{}@{} {}", indent, annotation.name(), payload);
    }
}

fn constant_value(constant: &EnumConstantInfo<'_>) -> String
{
    let value = match constant.bytes().len() {
        1 => constant.get::<i8>().map(i64::from),
        2 => constant.get::<i16>().map(i64::from),
        4 => constant.get::<i32>().map(i64::from),
        8 => constant.get::<i64>(),
        _ => return hex(constant.bytes()),
    };
    value.map_or_else(|_| hex(constant.bytes()), |value| value.to_string())
}

fn hex(bytes: &[u8]) -> String
{
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect::<Vec<_>>().join(" ")
}

fn print_namespace(namespace: NamespaceInfo<'_>, depth: usize)
{
    let indent = "  ".repeat(depth);
    let label = if namespace.is_root() { "::" } else { namespace.name() };
    println!(
        "{}{}  ({} types, {} functions, {} variables)",
        indent,
        label,
        namespace.nested_types().count(),
        namespace.functions().count(),
        namespace.variables().count()
    );
    for child in namespace.namespaces() {
        print_namespace(child, depth + 1);
    }
}

fn print_stats(database: &Database)
{
    let stats = database.stats();
    println!("Reflection database:");
    println!("  Pointer size: {} bytes ({:?})", database.pointer_size(), database.endian());
    println!("  Compilation units: {} ({} abandoned)", stats.units, stats.units_abandoned);
    println!("  Namespaces: {}", stats.namespaces);
    println!("  Types: {}", stats.types);
    println!("  Fields: {}", stats.fields);
    println!("  Functions: {}", stats.functions);
    println!("  Variables: {}", stats.variables);
    println!(
        "  Annotations: {} attached, {} dropped",
        stats.annotations_attached, stats.annotations_dropped
    );
    println!("  Type-of markers: {}", stats.markers);
    println!("  Skipped entries: {}", stats.entries_skipped);
    println!("  Offset cache hits: {}", stats.cache_hits);
}
