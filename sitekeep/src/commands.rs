use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitekeep")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitekeep")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the sitekeep archive database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the sitekeep database")
                        .default_value("~/.config/sitekeep/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("capture")
                .about(
                    "Capture a whole site into the archive, crawling outward from a single \
                start URL.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to start capturing from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-d --"depth" <LEVELS>)
                        .required(false)
                        .help("Maximum link depth to follow from the start page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(-t --"threads" <COUNT>)
                        .required(false)
                        .help("Number of concurrent capture workers")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Politeness pause before each request, per worker")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("0"),
                )
                .arg(
                    arg!(--"ignore-hashes")
                        .required(false)
                        .help("Treat URLs differing only by #fragment as the same page"),
                )
                .arg(
                    arg!(--"include-rules" <PATH>)
                        .required(false)
                        .help("Newline-delimited rules a link must match to be captured")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"exclude-rules" <PATH>)
                        .required(false)
                        .help("Newline-delimited rules that remove links from the capture")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-n --"name" <NAME>)
                        .required(false)
                        .help("Folder name for the captured site (defaults to the host)"),
                )
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("Location of the sitekeep database")
                        .default_value("~/.config/sitekeep/"),
                ),
        )
        .subcommand(
            command!("list")
                .about("List captured sites and their archived page counts")
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("Location of the sitekeep database")
                        .default_value("~/.config/sitekeep/"),
                ),
        )
}
