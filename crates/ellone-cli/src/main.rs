use anyhow::Context as _;
use clap::Parser;
use ellone::{
    config::{Config, TraceOptions},
    diag::Diagnostics,
};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    input: PathBuf,

    /// Trace output flags (any of A F G I J P S X, or digits).
    #[arg(long, value_name = "FLAGS")]
    trace: Option<String>,

    /// The directory where trace.txt is written [default: the grammar's directory].
    #[arg(short = 'o', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// The namespace of the generated parser.
    #[arg(long, value_name = "NS")]
    namespace: Option<String>,

    /// The prefix of token names.
    #[arg(long, value_name = "P")]
    token_prefix: Option<String>,

    /// Ask the code generator for source line directives (not used by the analysis).
    #[arg(long)]
    lines: bool,

    /// Do not warn about resolvers that resolve no LL(1) conflict.
    #[arg(long)]
    no_misplaced_resolver: bool,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::new()
            .emit_lines(self.lines)
            .suppress_resolver_warnings(self.no_misplaced_resolver);
        if let Some(namespace) = &self.namespace {
            config = config.namespace(namespace.as_str());
        }
        if let Some(prefix) = &self.token_prefix {
            config = config.token_prefix(prefix.as_str());
        }
        if let Some(trace) = &self.trace {
            config = config.trace(TraceOptions::parse(trace));
        }
        config
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let in_file =
        fs::canonicalize(&args.input).context("failed to canonicalize the input file name")?;
    let source = fs::read_to_string(&in_file)
        .with_context(|| anyhow::anyhow!("failed to read {}", in_file.display()))?;

    let out_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => in_file
            .parent()
            .map(PathBuf::from)
            .context("the input file has no parent directory")?,
    };
    let trace_file = out_dir.join("trace.txt");

    let mut diag = Diagnostics::new();
    let ok = match ellone::parse(&source, args.config(), &mut diag) {
        Ok(mut tab) => {
            let ok = tab.analyze(&mut diag);
            tracing::debug!("generator options = {:?}", tab.config);
            ok
        }
        Err(err) => {
            println!("{}", err);
            return Ok(ExitCode::FAILURE);
        }
    };

    for report in diag.reports() {
        println!("{}", report);
    }
    println!("{} errors detected", diag.error_count());

    if !diag.trace_output().is_empty() {
        fs::write(&trace_file, diag.trace_output()).with_context(|| {
            anyhow::anyhow!("failed to write trace output to {}", trace_file.display())
        })?;
        println!("trace output is in {}", trace_file.display());
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
