use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    iter::Enumerate,
    path::Path,
    time::Duration,
};

use clap::Parser;
use sluice_core::{LocalTask, Record, RecordError, Sink, TaskContext, TaskError, TaskReport};
use sluice_kv::{ConfigError, InitError, KvSink, RedisFactory, SinkConfig};
use thiserror::Error;
use tracing::{debug, info, warn};

mod cli;

fn main() {
    tracing_subscriber::fmt::init();
    match main_inner() {
        Ok(_) => (),
        Err(e) => {
            panic!("{:?}", eyre::Report::new(e))
        }
    }
}

fn main_inner() -> Result<(), Error> {
    let args = cli::Sluice::parse();
    debug!("Got the following args: {args:?}");

    let config = match (args.bootstrap_urls.is_empty(), args.store) {
        (true, None) => {
            info!("No endpoint given, reading configuration from environment");
            SinkConfig::from_env()?
        }
        (false, Some(store)) => SinkConfig::new(
            args.bootstrap_urls,
            store,
            Duration::from_millis(args.connect_timeout_ms),
        ),
        _ => return Err(Error::IncompleteArgs),
    };
    config.validate()?;

    let context = TaskContext::builder().component(args.component).build();
    let sink = KvSink::from_config(RedisFactory, config);
    let task = LocalTask::new(sink, context);
    let report = if args.input == Path::new("-") {
        run_task(task, std::io::stdin().lock())
    } else {
        let file = File::open(&args.input)?;
        run_task(task, BufReader::new(file))
    }?;

    if report.failed > 0 {
        warn!(
            "{} of {} records could not be written",
            report.failed, report.processed
        );
    }
    info!(
        processed = report.processed,
        acked = report.acked,
        failed = report.failed,
        "Done"
    );
    Ok(())
}

/// Feed every record of `reader` through `task` as it is read.
///
/// Reading stops at the first line which is not a JSON object; records before
/// it are written, then the error is returned.
fn run_task<S, R>(task: LocalTask<S>, reader: R) -> Result<TaskReport, Error>
where
    S: Sink<InitError = InitError>,
    R: BufRead,
{
    let mut records = NdjsonRecords::new(reader);
    let report = task.run(records.by_ref())?;
    match records.take_error() {
        Some(e) => {
            warn!(
                "Stopped reading input after {} records: {e}",
                report.processed
            );
            Err(e)
        }
        None => Ok(report),
    }
}

/// Lazily parses one record per non-blank line. The record id is the line
/// number, starting at 1. The first error ends the iteration and is kept
/// for [`NdjsonRecords::take_error`].
struct NdjsonRecords<R> {
    lines: Enumerate<Lines<R>>,
    error: Option<Error>,
}

impl<R: BufRead> NdjsonRecords<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines().enumerate(),
            error: None,
        }
    }

    fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    fn parse(line_no: u64, line: &str) -> Result<Record, Error> {
        let json = serde_json::from_str(line).map_err(|source| Error::Parse {
            line: line_no,
            source,
        })?;
        Ok(Record::from_json(line_no, json)?)
    }
}

impl<R: BufRead> Iterator for NdjsonRecords<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        for (idx, line) in self.lines.by_ref() {
            let parsed = line
                .map_err(Error::from)
                .and_then(|line| match line.trim() {
                    "" => Ok(None),
                    json => Self::parse(idx as u64 + 1, json).map(Some),
                });
            match parsed {
                Ok(Some(record)) => return Some(record),
                Ok(None) => continue,
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
        }
        None
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("--bootstrap-url and --store must be given together")]
    IncompleteArgs,
    #[error("Invalid sink configuration")]
    Config(#[from] ConfigError),
    #[error("Failed to read input")]
    Io(#[from] std::io::Error),
    #[error("Line {line} is not valid JSON")]
    Parse {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Sink task failed")]
    Task(#[from] TaskError<InitError>),
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use sluice_core::{RecordId, Value};
    use sluice_kv::MemoryCluster;

    use super::*;

    fn read_all(input: &str) -> (Vec<Record>, Option<Error>) {
        let mut records = NdjsonRecords::new(Cursor::new(input.to_owned()));
        let parsed = records.by_ref().collect();
        (parsed, records.take_error())
    }

    #[test]
    fn records_from_lines() {
        let input = "{\"user_id\": \"u42\", \"score\": 99}\n\n   \n{\"b\": 1, \"a\": null}\n";
        let (records, error) = read_all(input);

        assert!(error.is_none());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), RecordId(1));
        assert_eq!(records[0].value_of("user_id"), Some(&Value::from("u42")));
        assert_eq!(records[0].value_of("score"), Some(&Value::from(99)));
        // blank lines still count
        assert_eq!(records[1].id(), RecordId(4));
        let names: Vec<&str> = records[1].field_names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn invalid_json_line_stops_reading() {
        let (records, error) = read_all("{\"a\": 1}\n{oops\n{\"b\": 2}\n");
        assert_eq!(records.len(), 1);
        assert!(matches!(error, Some(Error::Parse { line: 2, .. })));
    }

    #[test]
    fn non_object_line() {
        let (records, error) = read_all("[1, 2]\n");
        assert!(records.is_empty());
        assert!(matches!(
            error,
            Some(Error::Record(RecordError::NotAnObject { id: RecordId(1), .. }))
        ));
    }

    #[test]
    fn empty_input() {
        let (records, error) = read_all("");
        assert!(records.is_empty());
        assert!(error.is_none());
    }

    #[test]
    fn lines_are_parsed_on_demand() {
        // the second line is never valid, but it is not read yet
        let mut records = NdjsonRecords::new(Cursor::new("{\"a\": 1}\n{oops\n"));
        assert_eq!(records.next().map(|r| r.id()), Some(RecordId(1)));
        assert!(records.take_error().is_none());
        assert!(records.next().is_none());
        assert!(records.take_error().is_some());
    }

    fn memory_task(cluster: &MemoryCluster) -> LocalTask<KvSink<MemoryCluster>> {
        cluster.create_store("scores");
        let sink = KvSink::builder()
            .factory(cluster.clone())
            .bootstrap_url(cluster.endpoint())
            .store("scores")
            .build();
        LocalTask::new(sink, TaskContext::builder().component("cli").build())
    }

    #[test]
    fn records_before_a_bad_line_are_written() {
        let cluster = MemoryCluster::new("cli");
        let input = "{\"user_id\": \"u42\"}\n{\"score\": 99}\nnot json\n{\"late\": 1}\n";

        let err = run_task(memory_task(&cluster), Cursor::new(input)).unwrap_err();

        assert!(matches!(err, Error::Parse { line: 3, .. }));
        assert_eq!(cluster.get("scores", "user_id"), Some(Value::from("u42")));
        assert_eq!(cluster.get("scores", "score"), Some(Value::from(99)));
        assert_eq!(cluster.get("scores", "late"), None);
        assert_eq!(cluster.open_clients(), 0);
    }

    #[test]
    fn whole_input_is_written() {
        let cluster = MemoryCluster::new("cli");
        let input = "{\"user_id\": \"u42\", \"score\": 99}\n\n{\"score\": 100}\n";

        let report = run_task(memory_task(&cluster), Cursor::new(input)).unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.acked, 2);
        assert_eq!(cluster.get("scores", "score"), Some(Value::from(100)));
    }
}
