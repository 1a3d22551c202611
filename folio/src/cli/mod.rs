
pub mod bugreport;
pub mod client;
pub mod server;
pub mod version;

pub const SERVER_SUBCOMMAND: &str = "server";
pub const SERVER_DESCRIPTION: &str = "Run the portfolio backend server";

pub const VERSION_SUBCOMMAND: &str = "version";
pub const VERSION_DESCRIPTION: &str = "Display the version and build information";

pub const BUGREPORT_SUBCOMMAND: &str = "bugreport";
pub const BUGREPORT_DESCRIPTION: &str = "Collect environment information for a bug report";

pub const LIST_SUBCOMMAND: &str = "list";
pub const LIST_DESCRIPTION: &str = "List gallery images from a running server";

pub const SEARCH_SUBCOMMAND: &str = "search";
pub const SEARCH_DESCRIPTION: &str = "Search gallery images on a running server";

pub const LIKE_SUBCOMMAND: &str = "like";
pub const LIKE_DESCRIPTION: &str = "Like one image on a running server";

pub const SUMMARY_SUBCOMMAND: &str = "summary";
pub const SUMMARY_DESCRIPTION: &str = "Show the analytics traffic summary";

pub const STATS_SUBCOMMAND: &str = "stats";
pub const STATS_DESCRIPTION: &str = "Show per-image view statistics";
