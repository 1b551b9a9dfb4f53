// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use clap::crate_authors;
use structopt::StructOpt;

use std::{
    fs,
    io::prelude::*,
    path::{Path, PathBuf},
};

use lexrs::{lexer, Lexer};
use lr1_gen::ParseTables;
use rsmc::error::CompileError;
use rsmc::{codegen::CodeGenerator, ir, parser::Parser};

fn with_changed_extension(path: &Path, new_extension: &str) -> PathBuf {
    let mut new_path = PathBuf::new();
    if let Some(dir) = path.parent() {
        new_path.push(dir);
    };
    new_path.push(path.file_stem().unwrap());
    new_path.set_extension(new_extension);
    new_path
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rsmc",
    about = "Rust-subset to MIPS assembly compiler",
    author = crate_authors!(),
)]
struct CLOptions {
    /// Overwrite the output file (if it exists)
    #[structopt(short, long)]
    force: bool,
    /// Where to write the assembly (default: source path with extension "s")
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// Grammar file to build the parse tables from
    #[structopt(long, parse(from_os_str), default_value = "configs/grammar.cfg")]
    grammar: PathBuf,
    /// Where the generated tables are cached
    #[structopt(long, parse(from_os_str), default_value = ".cache/tables.json")]
    cache: PathBuf,
    /// Dump the token stream as JSON to stdout
    #[structopt(long)]
    emit_tokens: bool,
    /// Dump the quadruple listing to stdout
    #[structopt(long)]
    emit_ir: bool,
    /// Dump the concrete syntax tree to stdout
    #[structopt(long)]
    emit_tree: bool,
    /// Write a description of the grammar, states and tables to a file
    #[structopt(long, parse(from_os_str))]
    describe: Option<PathBuf>,
    /// The path of the source file to compile
    #[structopt(parse(from_os_str))]
    source: PathBuf,
}

fn report_error(what: &str) {
    writeln!(std::io::stderr(), "Error: {}.", what).expect("what?");
}

fn report_warning(what: &str) {
    writeln!(std::io::stderr(), "Warning: {}.", what).expect("what?");
}

/// Tables come from the cache when it is at least as new as the grammar
/// file, from a fresh build otherwise, and from the built-in grammar when
/// no grammar file is present at all.
fn obtain_tables(options: &CLOptions) -> Result<ParseTables, i32> {
    if !options.grammar.exists() {
        return Ok(rsmc::builtin_tables());
    }
    if let Some(tables) = lr1_gen::cache::load(&options.cache, &options.grammar) {
        return Ok(tables);
    }
    let text = match fs::read_to_string(&options.grammar) {
        Ok(text) => text,
        Err(error) => {
            report_error(&format!(
                "cannot read grammar file {}: {}",
                options.grammar.to_string_lossy(),
                error
            ));
            return Err(2);
        }
    };
    let (tables, conflicts) = match rsmc::build_tables(&text) {
        Ok(build) => build,
        Err(error) => {
            report_error(&error.to_string());
            return Err(2);
        }
    };
    for conflict in &conflicts {
        report_warning(&conflict.to_string());
    }
    if let Err(error) = lr1_gen::cache::store(&options.cache, &tables) {
        report_warning(&format!(
            "cannot write table cache {}: {}",
            options.cache.to_string_lossy(),
            error
        ));
    }
    Ok(tables)
}

fn run(options: &CLOptions) -> Result<(), i32> {
    let output_path = options
        .output
        .clone()
        .unwrap_or_else(|| with_changed_extension(&options.source, "s"));
    if output_path.exists() && !options.force {
        writeln!(
            std::io::stderr(),
            "{}: output file already exists",
            output_path.to_string_lossy()
        )
        .unwrap();
        return Err(2);
    }

    let source_text = match fs::read_to_string(&options.source) {
        Ok(text) => text,
        Err(error) => {
            report_error(&format!(
                "cannot read source file {}: {}",
                options.source.to_string_lossy(),
                error
            ));
            return Err(2);
        }
    };

    let tables = obtain_tables(options)?;
    if let Some(describe_path) = &options.describe {
        if let Err(error) = fs::write(describe_path, tables.description()) {
            report_warning(&format!(
                "cannot write description {}: {}",
                describe_path.to_string_lossy(),
                error
            ));
        }
    }

    let tokens = Lexer::new().tokenize(&source_text);
    if options.emit_tokens {
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).expect("tokens serialize")
        );
    }
    if let Some(unknown) = lexer::first_unknown(&tokens) {
        let error = CompileError::Lexical {
            token: unknown.clone(),
        };
        report_error(&error.to_string());
        return Err(error.exit_code());
    }

    let parser = match Parser::new(&tables) {
        Ok(parser) => parser,
        Err(error) => {
            report_error(&error.to_string());
            return Err(error.exit_code());
        }
    };
    let outcome = match parser.parse(&tokens) {
        Ok(outcome) => outcome,
        Err(error) => {
            report_error(&error.to_string());
            return Err(error.exit_code());
        }
    };
    if options.emit_tree {
        print!("{}", outcome.cst.description());
    }
    if options.emit_ir {
        print!("{}", ir::listing(&outcome.code));
    }

    let mut generator = CodeGenerator::new();
    let assembly = match generator.generate(&outcome.code, &outcome.functions) {
        Ok(assembly) => assembly,
        Err(error) => {
            let error = CompileError::Backend(error);
            report_error(&error.to_string());
            return Err(error.exit_code());
        }
    };

    if let Err(error) = fs::write(&output_path, assembly) {
        report_error(&format!(
            "cannot write output file {}: {}",
            output_path.to_string_lossy(),
            error
        ));
        return Err(2);
    }
    Ok(())
}

fn main() {
    let options = CLOptions::from_args();
    if let Err(code) = run(&options) {
        std::process::exit(code);
    }
}
