use clap::{Parser, Subcommand};
use fern_compiler::{compile, CompileOptions, CompileResult};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "fern")]
#[command(about = "Fern - template compiler front-end")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile .fern templates to annotated AST JSON
    Compile {
        /// Path to a .fern file or directory
        #[arg(required_unless_present = "stdin")]
        file: Option<PathBuf>,

        /// Read the template from stdin
        #[arg(long)]
        stdin: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Skip the static-subtree optimizer
        #[arg(long)]
        no_optimize: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            stdin,
            pretty,
            no_optimize,
        } => {
            let options = CompileOptions {
                optimize: !no_optimize,
                ..CompileOptions::default()
            };
            if stdin {
                compile_stdin(&options, pretty);
            } else if let Some(path) = file {
                compile_path(&path, &options, pretty);
            } else {
                eprintln!("Error: provide a file/directory or use --stdin");
                std::process::exit(1);
            }
        }
    }
}

fn compile_stdin(options: &CompileOptions, pretty: bool) {
    let mut source = String::new();
    if io::stdin().read_to_string(&mut source).is_err() {
        eprintln!("Error: failed to read stdin");
        std::process::exit(1);
    }

    let result = compile(&source, options);
    report_warnings(&result, &source, "<stdin>");
    print!("{}", to_json(&result, pretty));
}

fn compile_path(path: &Path, options: &CompileOptions, pretty: bool) {
    if path.is_file() {
        if path.extension().is_none_or(|ext| ext != "fern") {
            eprintln!("Error: {} is not a .fern file", path.display());
            std::process::exit(1);
        }
        let start = Instant::now();
        compile_file(path, options, pretty);
        print_summary(1, start.elapsed());
    } else if path.is_dir() {
        compile_directory(path, options, pretty);
    } else {
        eprintln!("Error: {} does not exist", path.display());
        std::process::exit(1);
    }
}

fn compile_directory(dir: &Path, options: &CompileOptions, pretty: bool) {
    let start = Instant::now();
    let mut file_count = 0;

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "fern"))
    {
        compile_file(entry.path(), options, pretty);
        file_count += 1;
    }

    if file_count == 0 {
        eprintln!("No .fern files found in {}", dir.display());
        std::process::exit(1);
    }

    print_summary(file_count, start.elapsed());
}

fn compile_file(path: &Path, options: &CompileOptions, pretty: bool) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: failed to read {}: {err}", path.display());
            std::process::exit(1);
        }
    };

    let result = compile(&source, options);
    report_warnings(&result, &source, &path.display().to_string());

    let out_path = path.with_extension("ast.json");
    if let Err(err) = fs::write(&out_path, to_json(&result, pretty)) {
        eprintln!("Error: failed to write {}: {err}", out_path.display());
        std::process::exit(1);
    }
    print_generated(&out_path.display().to_string());
}

fn to_json(result: &CompileResult, pretty: bool) -> String {
    let mut json = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
    .expect("AST serialization cannot fail");
    json.push('\n');
    json
}

fn report_warnings(result: &CompileResult, source: &str, filename: &str) {
    let color = io::stderr().is_terminal();
    for warning in &result.warnings {
        if color {
            eprint!("{}", warning.render_color(source, filename));
        } else {
            eprint!("{}", warning.render(source, filename));
        }
    }
}

fn print_generated(path: &str) {
    if io::stdout().is_terminal() {
        println!("  \x1b[2mgenerated\x1b[0m {path}");
    } else {
        println!("  generated {path}");
    }
}

fn print_summary(count: usize, elapsed: Duration) {
    let files = if count == 1 { "file" } else { "files" };
    if io::stdout().is_terminal() {
        println!(
            "\x1b[1;32mCompiled\x1b[0m {count} {files} in {:.1}ms",
            elapsed.as_secs_f64() * 1000.0
        );
    } else {
        println!(
            "Compiled {count} {files} in {:.1}ms",
            elapsed.as_secs_f64() * 1000.0
        );
    }
}
