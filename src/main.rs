use clap::{Parser, Subcommand};
use docsite::deploy::{self, GitRunner};
use docsite::{config, generate, output, scan, site::Site};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docsite")]
#[command(about = "Static documentation site builder with versioned page layouts")]
#[command(long_about = "\
Static documentation site builder with versioned page layouts

Markdown and HTML pages under the source directory are rendered into the
build directory. Each page's layout is picked by the first matching rule in
config.toml, falling back to the default layout. Pages and layouts can
reference version numbers by name: {{ latest_version }}.

Project structure:

  .
  ├── config.toml                       # Site config (optional)
  ├── source/
  │   ├── layouts/
  │   │   ├── layout.html               # Default layout
  │   │   └── 1.x.html                  # Named layout for a page rule
  │   ├── stylesheets/ javascripts/ images/
  │   ├── index.html.md                 # → /index.html
  │   └── documentation/1.x/index.html.md
  └── build/                            # Output, also the deploy repository

Files and directories starting with '_' or '.' are skipped.

Run 'docsite gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root containing config.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the site into the build directory
    Build,
    /// Validate config and render every page without writing output
    Check,
    /// List pages, layouts and assets found in the source directory
    Scan {
        /// Print the scan manifest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which layout each request path resolves to
    Layout {
        /// Site-relative request paths, e.g. /documentation/1.x/index.html
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Print one version by name, or the whole version table
    Version { key: Option<String> },
    /// Publish the build directory to the configured git branch
    Deploy {
        /// Print the git steps without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Build => {
            let site = Site::load(&cli.root)?;
            println!("==> Building {}", site.source_dir().display());
            let report = generate::build(&site)?;
            output::print_build_output(&report);
        }
        Command::Check => {
            let site = Site::load(&cli.root)?;
            println!("==> Checking {}", site.source_dir().display());
            let mut manifest = scan::scan(&site.source_dir(), &site.config().assets)?;
            let pages = generate::render_site(&site, &manifest)?;
            generate::resolve_titles(&site, &mut manifest)?;
            output::print_scan_output(&manifest, site.resolver());
            println!("==> {} pages render cleanly", pages.len());
        }
        Command::Scan { json } => {
            let site = Site::load(&cli.root)?;
            let mut manifest = scan::scan(&site.source_dir(), &site.config().assets)?;
            generate::resolve_titles(&site, &mut manifest)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&manifest)?);
            } else {
                output::print_scan_output(&manifest, site.resolver());
            }
        }
        Command::Layout { paths } => {
            let site = Site::load(&cli.root)?;
            let mut failed = 0;
            for path in &paths {
                let result = site.layout_for(path);
                if result.is_err() {
                    failed += 1;
                }
                println!("{}", output::format_resolution(path, &result, site.resolver()));
            }
            if failed > 0 {
                let total = paths.len();
                return Err(format!("{failed} of {total} paths could not be resolved").into());
            }
        }
        Command::Version { key } => {
            let site = Site::load(&cli.root)?;
            match key {
                Some(key) => println!("{}", site.version(&key)?),
                None => output::print_versions(site.versions()),
            }
        }
        Command::Deploy { dry_run } => {
            let site = Site::load(&cli.root)?;
            let settings = &site.config().deploy;
            if settings.build_before && !dry_run {
                println!("==> Building {}", site.source_dir().display());
                let report = generate::build(&site)?;
                output::print_build_output(&report);
            }
            println!("==> Deploying {} to {}", site.build_dir().display(), settings.branch);
            let steps = deploy::deploy(
                &GitRunner::default(),
                settings,
                site.root(),
                &site.build_dir(),
                dry_run,
            )?;
            output::print_deploy_plan(&steps, dry_run);
        }
    }

    Ok(())
}
