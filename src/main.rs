use clap::{Parser, Subcommand};
use standard_typography::config::{self, TypographyConfig};
use standard_typography::site::{self, BuildOptions};
use standard_typography::{Locale, Typographer, markdown, output, watch};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "standard-typography")]
#[command(about = "Locale-aware typography for HTML, Markdown and static sites")]
#[command(long_about = "\
Locale-aware typography for HTML, Markdown and static sites

Rewrites the text of your pages, never the markup: curly quotes or
guillemets, em and en dashes, ellipses, fractions, arrows, no-break
spaces before French punctuation, and no lonely words at line ends.

Text inside code, pre, script, style (and anything with translate=\"no\")
is left alone.

Site layout:

  site/
  ├── typography.toml         # Config (optional, cascades to children)
  ├── index.html              # Typeset in place → dist/index.html
  ├── notes.md                # Rendered and typeset → dist/notes.html
  ├── style.css               # Copied
  └── fr/
      ├── typography.toml     # locale = \"fr\" for this section
      └── index.html

Run 'standard-typography gen-config' to generate a documented typography.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./typography.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Force a locale (en, fr, de, es, it); default reads lang attributes
    #[arg(long, global = true, value_parser = parse_locale)]
    locale: Option<Locale>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// No log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Input and output flags shared by the single-document commands.
#[derive(clap::Args, Clone)]
struct IoArgs {
    /// Input file (stdin when omitted)
    file: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Typeset plain text
    Text(IoArgs),
    /// Typeset an HTML fragment or document
    Html(IoArgs),
    /// Render Markdown to HTML and typeset it
    Markdown {
        #[command(flatten)]
        io: IoArgs,
        /// Wrap the result in a complete HTML document
        #[arg(long)]
        standalone: bool,
        /// Document title (default: first `# heading`)
        #[arg(long)]
        title: Option<String>,
    },
    /// Typeset a whole site directory
    Build {
        source: PathBuf,
        output: PathBuf,
        /// Disable the output cache and rewrite every file
        #[arg(long)]
        no_cache: bool,
    },
    /// Build, then rebuild whenever the source changes
    Watch { source: PathBuf, output: PathBuf },
    /// Validate the config and print the resolved settings
    Check,
    /// Print a stock typography.toml with all options documented
    GenConfig,
    /// Print the glyph table of every locale
    Locales,
}

fn parse_locale(code: &str) -> Result<Locale, String> {
    Locale::from_code(code).ok_or_else(|| {
        let known: Vec<&str> = Locale::ALL.iter().map(|l| l.code()).collect();
        format!("unknown locale '{code}' (expected one of {})", known.join(", "))
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Text(io) => {
            let typographer = typographer(cli.config.as_deref(), cli.locale)?;
            let input = read_input(io.file.as_deref())?;
            write_output(io.output.as_deref(), &typographer.typeset_text(&input))?;
        }
        Command::Html(io) => {
            let typographer = typographer(cli.config.as_deref(), cli.locale)?;
            let input = read_input(io.file.as_deref())?;
            let (html, summary) = typographer.try_typeset_html(&input)?;
            log::info!(
                "{} blocks typeset, {} changed, {} skipped",
                summary.processed,
                summary.changed,
                summary.skipped
            );
            write_output(io.output.as_deref(), &html)?;
        }
        Command::Markdown {
            io,
            standalone,
            title,
        } => {
            let typographer = typographer(cli.config.as_deref(), cli.locale)?;
            let input = read_input(io.file.as_deref())?;
            let html = if standalone {
                let title = title
                    .or_else(|| markdown::extract_title(&input))
                    .unwrap_or_default();
                let lang = typographer.locale().unwrap_or(Locale::En);
                let body = markdown::render_html(&input);
                let page = markdown::standalone_document(&title, lang.code(), &body);
                typographer.try_typeset_html(&page.into_string())?.0
            } else {
                markdown::render(&input, &typographer, None)
            };
            write_output(io.output.as_deref(), &html)?;
        }
        Command::Build {
            source,
            output: dest,
            no_cache,
        } => {
            let options = build_options(cli.config.as_deref(), cli.locale, !no_cache)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = site::build(&source, &dest, &options, Some(tx));
            printer.join().ok();
            let result = result?;
            output::print_build_summary(&result);
            if result.stats.failed > 0 {
                return Err(format!("{} files failed", result.stats.failed).into());
            }
            println!("==> Build complete: {}", dest.display());
        }
        Command::Watch {
            source,
            output: dest,
        } => {
            let options = build_options(cli.config.as_deref(), cli.locale, true)?;
            let base = options
                .base
                .clone()
                .unwrap_or_else(config::stock_defaults_value);
            let root = config::resolve_config(base, config::load_raw_config(&source)?)?;
            watch::watch(&source, &dest, &root, &options, None, |result, events| {
                for event in events {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
                match result {
                    Ok(result) => output::print_build_summary(&result),
                    Err(e) => eprintln!("Build failed: {e}"),
                }
                println!("==> Watching {} (Ctrl-C to stop)", source.display());
            })?;
        }
        Command::Check => {
            let config = load_cli_config(cli.config.as_deref())?;
            let config = match cli.locale {
                Some(locale) => TypographyConfig {
                    locale: locale.code().to_string(),
                    ..config
                },
                None => config,
            };
            config.validate()?;
            output::print_check_output(&config);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Locales => {
            output::print_locales();
        }
    }

    Ok(())
}

/// Initialize `env_logger` from the verbosity flags. `RUST_LOG` wins.
fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// `--config` when given, else `./typography.toml` when present, else defaults.
fn load_cli_config(path: Option<&Path>) -> Result<TypographyConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

fn typographer(
    path: Option<&Path>,
    locale: Option<Locale>,
) -> Result<Typographer, config::ConfigError> {
    let typographer = Typographer::new(load_cli_config(path)?)?;
    Ok(match locale {
        Some(_) => typographer.with_locale(locale),
        None => typographer,
    })
}

/// Site builds cascade from the source root; `--config` becomes the base
/// below it.
fn build_options(
    path: Option<&Path>,
    locale: Option<Locale>,
    use_cache: bool,
) -> Result<BuildOptions, Box<dyn std::error::Error>> {
    let base = match path {
        Some(path) => Some(toml::Value::try_from(config::load_config_file(path)?)?),
        None => None,
    };
    Ok(BuildOptions {
        base,
        locale,
        use_cache,
    })
}

fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> std::io::Result<()> {
    match path {
        Some(path) => std::fs::write(path, content),
        None => std::io::stdout().write_all(content.as_bytes()),
    }
}
