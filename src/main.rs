use anyhow::{Context, Result};
use clap::Parser;
use dapi::commands::{self, ConfigOverrides};
use std::path::PathBuf;

/// dapi - DevAssistant Package Installer
///
/// Install, update and remove daps (DevAssistant packages) published on
/// the dapi catalog.
///
/// Examples:
///   dapi install foo                # Install the latest stable foo
///   dapi install foo --version 1.0  # Install a specific version
///   dapi install --file foo-1.0.dap # Install a local archive
///   dapi uninstall foo -y           # Remove foo without asking
#[derive(Parser, Debug)]
#[command(author, version = env!("DAPI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (overrides defaults; also via DAPI_INSTALL)
    #[arg(
        long = "root",
        short = 'r',
        env = "DAPI_INSTALL",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// Catalog API URL (defaults to https://dapi.devassistant.org/api/)
    #[arg(long = "api-url", env = "DAPI_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            install_root: self.install_root.clone(),
            api_url: self.api_url.clone(),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a dap from the catalog or from a local file
    Install(InstallArgs),

    /// Update an installed dap to the latest release
    Update(UpdateArgs),

    /// Remove an installed dap
    Uninstall(UninstallArgs),

    /// Download and verify a dap without installing it
    Download(DownloadArgs),

    /// List installed daps
    List,

    /// Show catalog details of a dap
    Show(ShowArgs),

    /// List users of the catalog
    Users(PageArgs),

    /// List daps in the catalog
    Daps(PageArgs),

    /// Print dependency metadata of available or installed daps
    Deps(DepsArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Name of the dap
    #[arg(value_name = "NAME", required_unless_present = "file")]
    pub name: Option<String>,

    /// Version to install instead of the latest
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Install a local .dap file
    #[arg(long, value_name = "PATH", conflicts_with_all = ["name", "version"])]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Name of the dap
    #[arg(value_name = "NAME", required_unless_present = "file")]
    pub name: Option<String>,

    /// Update from a local .dap file
    #[arg(long, value_name = "PATH", conflicts_with = "name")]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// Name of the dap
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Name of the dap
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Version to download instead of the latest
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Directory to save into (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Name of the dap
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Version to show instead of the latest
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PageArgs {
    /// Page number
    #[arg(long, value_name = "N")]
    pub page: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct DepsArgs {
    /// Describe the install root instead of the catalog
    #[arg(long)]
    pub installed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = dapi::runtime::RealRuntime;
    let overrides = cli.overrides();

    match cli.command {
        Commands::Install(args) => match args.file {
            Some(file) => commands::install_file(runtime, &file, false, overrides)?,
            None => {
                let name = args.name.context("A dap name or --file is required")?;
                commands::install(runtime, &name, args.version.as_deref(), overrides).await?
            }
        },
        Commands::Update(args) => match args.file {
            Some(file) => commands::install_file(runtime, &file, true, overrides)?,
            None => {
                let name = args.name.context("A dap name or --file is required")?;
                commands::update(runtime, &name, overrides).await?
            }
        },
        Commands::Uninstall(args) => commands::uninstall(runtime, &args.name, args.yes, overrides)?,
        Commands::Download(args) => {
            commands::download(
                runtime,
                &args.name,
                args.version.as_deref(),
                args.dir.as_deref(),
                overrides,
            )
            .await?
        }
        Commands::List => commands::list(runtime, overrides)?,
        Commands::Show(args) => {
            commands::show(runtime, &args.name, args.version.as_deref(), overrides).await?
        }
        Commands::Users(args) => commands::users(runtime, args.page, overrides).await?,
        Commands::Daps(args) => commands::daps(runtime, args.page, overrides).await?,
        Commands::Deps(args) => commands::deps(runtime, args.installed, overrides).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["dapi", "install", "foo", "--version", "1.0"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.name.as_deref(), Some("foo"));
                assert_eq!(args.version.as_deref(), Some("1.0"));
                assert_eq!(args.file, None);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_install_file_parsing() {
        let cli = Cli::try_parse_from(["dapi", "install", "--file", "foo-1.0.dap"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.file, Some(PathBuf::from("foo-1.0.dap")));
                assert_eq!(args.name, None);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_install_requires_name_or_file() {
        assert!(Cli::try_parse_from(["dapi", "install"]).is_err());
        assert!(Cli::try_parse_from(["dapi", "install", "foo", "--file", "x.dap"]).is_err());
    }

    #[test]
    fn test_cli_uninstall_parsing() {
        let cli = Cli::try_parse_from(["dapi", "uninstall", "foo", "-y"]).unwrap();
        match cli.command {
            Commands::Uninstall(args) => {
                assert_eq!(args.name, "foo");
                assert!(args.yes);
            }
            _ => panic!("Expected Uninstall command"),
        }
    }

    #[test]
    fn test_cli_page_parsing() {
        let cli = Cli::try_parse_from(["dapi", "users", "--page", "3"]).unwrap();
        match cli.command {
            Commands::Users(args) => assert_eq!(args.page, Some(3)),
            _ => panic!("Expected Users command"),
        }
        assert!(Cli::try_parse_from(["dapi", "daps", "--page", "x"]).is_err());
    }

    #[test]
    #[cfg_attr(dapi_env_set, ignore)]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["dapi", "list"]).unwrap();
        assert_eq!(cli.install_root, None);
        assert_eq!(cli.api_url, None);
    }

    #[test]
    fn test_cli_global_root_parsing() {
        let cli = Cli::try_parse_from(["dapi", "--root", "/tmp/da", "list"]).unwrap();
        assert_eq!(cli.install_root, Some(PathBuf::from("/tmp/da")));

        let cli = Cli::try_parse_from(["dapi", "show", "foo", "--api-url", "http://x/api"]).unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://x/api"));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["dapi", "foo"]).is_err());
    }
}
