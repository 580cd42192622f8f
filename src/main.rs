//! CLI for markweave - extended markdown to HTML

use clap::Parser;
use markweave::{
    AsyncPluginProcessor, Config, Error, HtmlRenderer, MarkdownParser, Renderer, Result,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input markdown file path
    input: PathBuf,

    /// Output file path (optional, prints to stdout if not specified)
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the document AST as JSON instead of HTML
    #[arg(long)]
    ast: bool,

    /// Fetch and inline deferred plugin content (e.g. markdown embeds)
    #[arg(long)]
    resolve: bool,

    /// Disable `$...$` and `$$...$$` math
    #[arg(long)]
    no_math: bool,

    /// Disable `{{plugin}}` syntax
    #[arg(long)]
    no_plugins: bool,

    /// Disable raw HTML
    #[arg(long)]
    no_html: bool,

    /// Disable footnotes
    #[arg(long)]
    no_footnotes: bool,

    /// Disable `:::` containers and `::name[...]::` spans
    #[arg(long)]
    no_containers: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "markweave=debug",
        _ => "markweave=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };
    let parser = &mut config.parser;
    parser.enable_math &= !args.no_math;
    parser.enable_plugins &= !args.no_plugins;
    parser.enable_html &= !args.no_html;
    parser.enable_footnotes &= !args.no_footnotes;
    parser.enable_custom_containers &= !args.no_containers;
    Ok(config)
}

fn run(args: &Args) -> Result<String> {
    let config = load_config(args)?;

    let text = std::fs::read_to_string(&args.input)?;
    if text.len() > config.max_input_bytes {
        return Err(Error::InputTooLarge {
            size: text.len(),
            limit: config.max_input_bytes,
        });
    }

    let parser = MarkdownParser::new(config.parse_options());
    let document = parser.parse(&text);
    if args.ast {
        return Ok(serde_json::to_string_pretty(&document)? + "\n");
    }

    let html = HtmlRenderer::new(config.render).render(&document).html;
    if !args.resolve {
        return Ok(html);
    }

    let processor = AsyncPluginProcessor::with_defaults(config.resolver)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(processor.process(&html)))
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(output) => {
            if let Some(path) = &args.output {
                if let Err(e) = std::fs::write(path, &output) {
                    eprintln!("Error writing output: {}", e);
                    std::process::exit(1);
                }
                info!(path = %path.display(), "wrote output");
            } else {
                print!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
