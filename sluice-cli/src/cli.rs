use std::path::PathBuf;

/// Write newline-delimited JSON records into a key-value store.
///
/// Every field of every record is stored under its field name. Without
/// `--bootstrap-url` and `--store` the connection is configured from the
/// `SLUICE_KV_*` environment variables.
#[derive(clap::Parser, Debug)]
#[command(name = "sluice", version, about, long_about = None)]
pub struct Sluice {
    /// File to read records from, `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Store endpoint, can be given multiple times. Endpoints are tried in order.
    #[arg(short, long = "bootstrap-url")]
    pub bootstrap_urls: Vec<String>,

    /// Name of the store to write into
    #[arg(short, long)]
    pub store: Option<String>,

    /// Timeout for connecting to a single endpoint in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Component name used in logs
    #[arg(short, long, default_value = "kv-sink")]
    pub component: String,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults() {
        let args = Sluice::try_parse_from(["sluice"]).unwrap();
        assert_eq!(args.input, PathBuf::from("-"));
        assert!(args.bootstrap_urls.is_empty());
        assert_eq!(args.store, None);
        assert_eq!(args.connect_timeout_ms, 5000);
        assert_eq!(args.component, "kv-sink");
    }

    #[test]
    fn repeated_bootstrap_urls() {
        let args = Sluice::try_parse_from([
            "sluice",
            "--bootstrap-url",
            "redis://a:6379",
            "-b",
            "redis://b:6379",
            "--store",
            "scores",
            "--input",
            "records.ndjson",
        ])
        .unwrap();
        assert_eq!(args.bootstrap_urls, vec!["redis://a:6379", "redis://b:6379"]);
        assert_eq!(args.store.as_deref(), Some("scores"));
        assert_eq!(args.input, PathBuf::from("records.ndjson"));
    }
}
