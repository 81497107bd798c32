use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use jsonspout::{
    run_file, run_server, FileOptions, GeneratorOptions, ProducerOptions, RepeatOptions, Schema,
    ServerOptions, DEFAULT_PORT, DEFAULT_QUEUE_SIZE,
};

#[derive(Parser)]
#[command(name = "jsonspout")]
#[command(about = "A schema-driven generator and streaming server for newline-delimited JSON")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate records and write them to a file or stdout
    File {
        #[command(flatten)]
        production: ProductionArgs,

        /// Output file path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stream records over TCP to a single consumer
    Stream {
        #[command(flatten)]
        production: ProductionArgs,

        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Number of streaming sessions to run
        #[arg(long, default_value_t = 1)]
        repeat: u64,

        /// Pause between sessions in milliseconds
        #[arg(long, default_value_t = 0)]
        interval: u64,
    },
}

#[derive(Args)]
struct ProductionArgs {
    /// Path to the YAML schema describing the records
    #[arg(long)]
    schema: PathBuf,

    /// Seed for the pseudo-random generators; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Records per batch when batching, total records otherwise
    #[arg(short = 'n', long, default_value_t = 1)]
    num_jsons: u64,

    /// Number of batches to produce when batching
    #[arg(long, default_value_t = 1)]
    num_batches: u64,

    /// Produce batches of --num-jsons records each
    #[arg(long)]
    batch: bool,

    /// Pretty-print the records
    #[arg(long)]
    pretty: bool,

    /// Do not append a terminator after each record
    #[arg(long)]
    no_whitespace: bool,

    /// Terminator character appended after each record (default: newline)
    #[arg(long)]
    whitespace_char: Option<char>,

    /// Number of production threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Capacity of the production queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_SIZE)]
    queue_size: usize,

    /// Echo produced batches to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Log a summary at the end
    #[arg(short, long)]
    statistics: bool,
}

impl ProductionArgs {
    fn to_options(&self) -> anyhow::Result<ProducerOptions> {
        let schema = Schema::from_file(&self.schema)?;
        let mut gen = match self.seed {
            Some(seed) => GeneratorOptions {
                seed,
                ..GeneratorOptions::default()
            },
            None => GeneratorOptions::from_entropy(),
        };
        gen.pretty = self.pretty;
        gen.whitespace = !self.no_whitespace;
        if let Some(terminator) = self.whitespace_char {
            if !terminator.is_ascii() {
                anyhow::bail!("terminator must be an ASCII character");
            }
            gen.whitespace_char = terminator as u8;
        }

        let mut options = ProducerOptions::new(schema);
        options.gen = gen;
        options.num_jsons = self.num_jsons;
        options.num_batches = self.num_batches;
        options.batching = self.batch;
        options.num_threads = self.threads;
        options.queue_size = self.queue_size;
        options.verbose = self.verbose;
        options.statistics = self.statistics;
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::File { production, output } => {
            let options = FileOptions {
                production: production.to_options()?,
                out_path: output,
            };
            let mut stdout = std::io::stdout();
            run_file(&options, &mut stdout)?;
        }
        Commands::Stream {
            production,
            port,
            repeat,
            interval,
        } => {
            let producer_opts = production.to_options()?;
            let server_opts = ServerOptions { port };
            let repeat_opts = RepeatOptions {
                times: repeat,
                interval_ms: interval,
            };
            let statistics = producer_opts.statistics;
            run_server(&server_opts, &producer_opts, &repeat_opts, statistics)?;
        }
    }

    Ok(())
}
