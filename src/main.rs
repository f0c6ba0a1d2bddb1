use std::process;

use clap::Parser;
use colored::Colorize;
use seqvec::{
    cli::Args,
    run::{vectorize, VectorizeOptions},
};

/// Initialize the tracing subscriber with environment filter.
///
/// Set `RUST_LOG=seqvec=debug` to see debug output.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version land here too; only real usage problems
            // exit nonzero.
            let code = i32::from(err.use_stderr());
            let _ = err.print();
            process::exit(code);
        }
    };

    eprintln!(
        "{}: {}",
        "k-size".bold(),
        args.k_size.to_string().blue().bold()
    );
    eprintln!(
        "{}: {}",
        "input".bold(),
        args.file.display().to_string().underline().bold().blue()
    );
    eprintln!(
        "{}: {}",
        "output".bold(),
        args.output.display().to_string().underline().bold().blue()
    );
    eprintln!(
        "{}: {}",
        "preset".bold(),
        args.preset.to_string().blue().bold()
    );
    eprintln!(
        "{}: {}",
        "threads".bold(),
        args.threads.to_string().blue().bold()
    );

    let options = VectorizeOptions {
        k: args.k_size,
        threads: args.threads,
        separator: args.preset.separator(),
        synthetic_headers: false,
        show_progress: true,
    };

    match vectorize(&args.file, &args.output, &options) {
        Ok(summary) => {
            eprintln!(
                "{}: {} records x {} features",
                "done".bold(),
                summary.records.to_string().green().bold(),
                summary.feature_count.to_string().green().bold()
            );
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(err.exit_code());
        }
    }
}
