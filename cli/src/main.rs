mod logging;
mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;

use blocks::{MountOptions, Page};

#[derive(Parser)]
#[command(name = "blocks", version, about = "Render pages with author-supplied component blocks")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a page file to HTML
    Render(RenderArgs),

    /// Print the lowered form of a component source file
    Transform(TransformArgs),

    /// Print a new page with one default custom block
    New(NewArgs),

    /// Run .test.tsx / .test.jsx fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Page file (TOML)
    page: String,

    /// Mount options file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Exit with status 1 if any custom block failed
    #[arg(long)]
    fail_on_error: bool,
}

#[derive(clap::Args)]
struct TransformArgs {
    /// Component source file
    file: String,

    /// Transform only, don't print (exit 0 if valid)
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct NewArgs {
    /// Page title
    #[arg(short, long, default_value = "Untitled")]
    title: String,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a fixture file or a directory containing them
    path: String,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();

    // Fixtures fail blocks on purpose; keep their warnings out of the report
    let default_level = match cli.command {
        Command::Test(_) => "error",
        _ => "warn",
    };
    if let Err(e) = logging::init(default_level, !cli.no_color) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match cli.command {
        Command::Render(args) => do_render(args),
        Command::Transform(args) => do_transform(args, cli.no_color),
        Command::New(args) => do_new(args),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn do_render(args: RenderArgs) {
    let options = match &args.config {
        Some(path) => match MountOptions::load_from_path(path) {
            Ok(options) => {
                debug!(path = %path, ?options, "loaded mount options");
                options
            }
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => MountOptions::default(),
    };

    let page = match Page::from_toml(&read_file(&args.page)) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("error: {}: {}", args.page, e);
            process::exit(1);
        }
    };

    let nodes = page.render(&options);
    for node in &nodes {
        println!("{}", node.to_html_with(&options.error_class));
    }

    let failed = nodes.iter().filter(|node| node.is_error()).count();
    if failed > 0 {
        eprintln!("{} of {} custom blocks failed", failed, page.custom_blocks().count());
        if args.fail_on_error {
            process::exit(1);
        }
    }
}

fn do_transform(args: TransformArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = read_file(&args.file);
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    match jsx::transform(&source) {
        Ok(lowered) => {
            if args.check {
                eprintln!("ok: {} transformed successfully", args.file);
            } else {
                println!("{}", lowered);
            }
        }
        Err(error) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            let diagnostic = error.to_diagnostic(file_id);
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(1);
        }
    }
}

fn do_new(args: NewArgs) {
    let mut page = Page::new(args.title);
    let text = page
        .insert_custom_block(0)
        .and_then(|_| page.to_toml());
    match text {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
