use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;
use tree_diff::{AnsiConsole, TreeDiffer, colorize};

#[derive(Parser)]
#[command(name = "tree-diff")]
#[command(about = "Diff two sibling directory trees with git")]
struct Cli {
    /// Log every git invocation and its result
    #[arg(short, long, global = true)]
    verbose: bool,

    /// When to color diff output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the diff between two sibling directories
    Diff {
        /// Original tree
        one: PathBuf,
        /// Modified tree, next to the original
        other: PathBuf,
    },
    /// List added, deleted and modified files between two sibling directories
    Files {
        /// Original tree
        one: PathBuf,
        /// Modified tree, next to the original
        other: PathBuf,
    },
    /// Fail if a directory is inside a git repository
    Check {
        /// Directory to check
        path: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
    /// Generate a man page
    Man,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let environment: HashMap<String, String> = std::env::vars().collect();
    let differ = TreeDiffer::new(cli.verbose, environment);
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Diff { one, other } => {
            let patch = differ.diff(&one, &other)?;
            if !patch.is_empty() {
                let console = match cli.color {
                    ColorChoice::Auto => AnsiConsole::detect(),
                    ColorChoice::Always => {
                        colored::control::set_override(true);
                        AnsiConsole::new(true)
                    }
                    ColorChoice::Never => AnsiConsole::new(false),
                };
                let text = colorize(&console, &String::from_utf8_lossy(&patch));
                // Drop the newline colorize puts before the first line
                write!(stdout, "{}", text.strip_prefix('\n').unwrap_or(&text))?;
            }
        }
        Commands::Files { one, other } => {
            for change in differ.diff_files(&one, &other)? {
                writeln!(stdout, "{}", change)?;
            }
        }
        Commands::Check { path } => {
            differ.check_not_inside_git_repo(&path)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tree-diff", &mut stdout);
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut stdout)?;
        }
    }

    Ok(())
}
