use clap::ArgMatches;
use friendwalk::command_argument_builder;
use friendwalk::handlers::{
    handle_approve, handle_crawl, handle_init, handle_stats, init_tracing, logs_to_file,
};
use tracing::error;

#[tokio::main]
async fn main() {
    let chosen_command = match command_argument_builder().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            // --help and --version render on stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = init_tracing(&chosen_command) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = dispatch(&chosen_command).await {
        error!("{:#}", e);
        if logs_to_file(&chosen_command) {
            eprintln!("✗ {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn dispatch(chosen_command: &ArgMatches) -> anyhow::Result<()> {
    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("crawl", primary_command)) => handle_crawl(primary_command).await,
        Some(("approve", primary_command)) => handle_approve(primary_command).await,
        Some(("stats", primary_command)) => handle_stats(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
