use clap::{arg, command, crate_name, Command};
use client::{ListParams, SearchParams};

mod cli;

#[tokio::main]
async fn main() {
    let matches = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(Command::new(cli::SERVER_SUBCOMMAND).about(cli::SERVER_DESCRIPTION))
        .subcommand(
            Command::new(cli::LIST_SUBCOMMAND)
                .about(cli::LIST_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Server URI"))
                .arg(arg!(-f --folder <FOLDER>).help("Folder prefix, defaults to gallery"))
                .arg(arg!(-p --page <PAGE>).help("1-based page number"))
                .arg(arg!(-l --limit <LIMIT>).help("Page size")),
        )
        .subcommand(
            Command::new(cli::SEARCH_SUBCOMMAND)
                .about(cli::SEARCH_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Server URI"))
                .arg(arg!(-q --query <QUERY>).required(true).help("Search query"))
                .arg(arg!(-p --page <PAGE>).help("1-based page number"))
                .arg(arg!(-l --limit <LIMIT>).help("Page size")),
        )
        .subcommand(
            Command::new(cli::LIKE_SUBCOMMAND)
                .about(cli::LIKE_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Server URI"))
                .arg(
                    arg!(-i --image <PATH>)
                        .required(true)
                        .help("Object key of the image to like"),
                ),
        )
        .subcommand(
            Command::new(cli::SUMMARY_SUBCOMMAND)
                .about(cli::SUMMARY_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Server URI")),
        )
        .subcommand(
            Command::new(cli::STATS_SUBCOMMAND)
                .about(cli::STATS_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Server URI"))
                .arg(arg!(-l --limit <LIMIT>).help("Number of entries")),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    if matches.subcommand_matches(cli::VERSION_SUBCOMMAND).is_some() {
        cli::version::run();
    } else if matches
        .subcommand_matches(cli::BUGREPORT_SUBCOMMAND)
        .is_some()
    {
        cli::bugreport::run();
    } else if matches.subcommand_matches(cli::SERVER_SUBCOMMAND).is_some() {
        cli::server::run().await;
    } else if let Some(list_matches) = matches.subcommand_matches(cli::LIST_SUBCOMMAND) {
        let params = ListParams {
            uri: required_string(list_matches, "uri"),
            folder: list_matches.get_one::<String>("folder").cloned(),
            page: parsed(list_matches, "page"),
            limit: parsed(list_matches, "limit"),
        };
        cli::client::list_images(params).await;
    } else if let Some(search_matches) = matches.subcommand_matches(cli::SEARCH_SUBCOMMAND) {
        let params = SearchParams {
            uri: required_string(search_matches, "uri"),
            query: required_string(search_matches, "query"),
            page: parsed(search_matches, "page"),
            limit: parsed(search_matches, "limit"),
        };
        cli::client::search_images(params).await;
    } else if let Some(like_matches) = matches.subcommand_matches(cli::LIKE_SUBCOMMAND) {
        let uri = required_string(like_matches, "uri");
        let image = required_string(like_matches, "image");
        cli::client::like_image(&uri, &image).await;
    } else if let Some(summary_matches) = matches.subcommand_matches(cli::SUMMARY_SUBCOMMAND) {
        let uri = required_string(summary_matches, "uri");
        cli::client::show_summary(&uri).await;
    } else if let Some(stats_matches) = matches.subcommand_matches(cli::STATS_SUBCOMMAND) {
        let uri = required_string(stats_matches, "uri");
        cli::client::show_image_stats(&uri, parsed(stats_matches, "limit")).await;
    }
}

fn required_string(matches: &clap::ArgMatches, name: &str) -> String {
    matches
        .get_one::<String>(name)
        .cloned()
        .unwrap_or_default()
}

fn parsed(matches: &clap::ArgMatches, name: &str) -> Option<u32> {
    matches
        .get_one::<String>(name)
        .and_then(|value| value.parse().ok())
}
