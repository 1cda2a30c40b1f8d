mod cli;

use repo_directory::server;

fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("repo-directory {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    server::run_stdio_server()
}
