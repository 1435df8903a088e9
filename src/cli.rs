use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use getopts::{Matches, Options};
use pokesuri_events::{EventCategory, Variant};
use reqwest::Url;

pub struct Args {
    pub address: SocketAddr,
    pub origin: Option<Url>,
    pub data_dir: Option<PathBuf>,
    pub base: String,
    pub manifest: Option<String>,
    pub variant: Variant,
    pub cache_version: String,
    pub cache_capacity: usize,
    pub precache: Vec<String>,
    pub preview_timeout: Duration,
    pub print: Option<EventCategory>,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "o",
        "origin",
        "Origin serving the static site, e.g. https://example.github.io",
        "URL",
    );
    opts.optopt(
        "d",
        "data-dir",
        "Read event data from a local site checkout instead of the origin",
        "DIR",
    );
    opts.optopt(
        "b",
        "base",
        "Base path of the site [Default: /pokesuri-calendar/]",
        "PATH",
    );
    opts.optopt(
        "m",
        "manifest",
        "Manifest listing the event files [Default: data/eventFiles.json]",
        "PATH",
    );
    opts.optopt(
        "",
        "variant",
        "Page variant, `main` or `legacy` [Default: main]",
        "VARIANT",
    );
    opts.optopt(
        "V",
        "cache-version",
        "Version of the offline cache [Default: v1.0.0]",
        "VERSION",
    );
    opts.optopt(
        "c",
        "cache-capacity",
        "Maximum number of responses per cache [Default: 512]",
        "ENTRIES",
    );
    opts.optmulti(
        "",
        "precache",
        "Additional path to precache on install (repeatable)",
        "PATH",
    );
    opts.optopt(
        "",
        "preview-timeout",
        "Timeout for link preview lookups [Default: 5]",
        "SECONDS",
    );
    opts.optopt(
        "",
        "print",
        "Print the event list of a category (all, pokemon, field, events, regular) and exit",
        "CATEGORY",
    );
    opts
}

fn fail(message: String) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn opt_or<T>(matches: &Matches, name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match matches.opt_get_default(name, default) {
        Ok(value) => value,
        Err(err) => fail(format!("Provided value for option '{name}' is invalid: {err}")),
    }
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let address = opt_or(&matches, "address", SocketAddr::from(([127, 0, 0, 1], 8080)));

    let origin = matches.opt_str("origin").map(|origin| match Url::parse(&origin) {
        Ok(origin) => origin,
        Err(err) => fail(format!("Provided value for option 'origin' is invalid: {err}")),
    });

    let data_dir = matches.opt_str("data-dir").map(PathBuf::from);

    if origin.is_none() && data_dir.is_none() {
        fail(String::from("Either '--origin' or '--data-dir' is required"));
    }

    let mut base = matches
        .opt_str("base")
        .unwrap_or_else(|| String::from("/pokesuri-calendar/"));
    if !base.starts_with('/') {
        base.insert(0, '/');
    }
    if !base.ends_with('/') {
        base.push('/');
    }

    let print = match matches.opt_str("print") {
        Some(category) => match category.parse() {
            Ok(category) => Some(category),
            Err(err) => fail(format!("Provided value for option 'print' is invalid: {err}")),
        },
        None => None,
    };

    Args {
        address,
        origin,
        data_dir,
        base,
        manifest: matches.opt_str("manifest"),
        variant: opt_or(&matches, "variant", Variant::Main),
        cache_version: opt_or(&matches, "cache-version", String::from("v1.0.0")),
        cache_capacity: opt_or(&matches, "cache-capacity", 512),
        precache: matches.opt_strs("precache"),
        preview_timeout: Duration::from_secs(opt_or(&matches, "preview-timeout", 5)),
        print,
    }
}
