use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

const CONFIG_HELP: &str = "Path to the config file (default: ~/.config/friendwalk/config.json)";

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("friendwalk")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("friendwalk")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Only log warnings and errors; hide the progress spinner")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log debug output")
                .required(false)
                .global(true)
                .conflicts_with("quiet"),
        )
        .arg(
            arg!(--"log-file" <PATH>)
                .required(false)
                .global(true)
                .help("Append log output to this file instead of stderr")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("init")
                .about("Writes a default config file and creates the crawl database")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory for the config file and crawl database")
                        .default_value("~/.config/friendwalk/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help(
                            "Overwrite an existing config file and reset the crawl database \
                        without asking.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("crawl")
                .about(
                    "Walk the friend graph breadth-first from the persisted queue, saving \
                photos. Safe to interrupt and resume.",
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help(CONFIG_HELP)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-d --"database" <PATH>)
                        .required(false)
                        .help("Crawl database file (overrides the config file)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-m --"media-dir" <PATH>)
                        .required(false)
                        .help("Directory photos are saved to (overrides the config file)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-s --"seed" <ID>)
                        .required(false)
                        .help("Node id to start from when the queue is empty"),
                )
                .arg(
                    arg!(-l --"limit" <NODES>)
                        .required(false)
                        .help("Stop after processing this many nodes; the rest stay queued")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            command!("approve")
                .about("Approve pending friend requests, replying to each requester")
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help(CONFIG_HELP)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-l --"limit" <REQUESTS>)
                        .required(false)
                        .help("Approve at most this many requests")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            command!("stats")
                .about("Print visited and queued record counts of the crawl database")
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help(CONFIG_HELP)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-d --"database" <PATH>)
                        .required(false)
                        .help("Crawl database file (overrides the config file)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}
