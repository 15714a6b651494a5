//! Reader for the `.alb` instance format.
//!
//! The format is a sequence of `<header>` lines, each followed by data lines:
//!
//! ```text
//! <number of tasks>
//! 3
//!
//! <task times>
//! 1 2
//! 2 3
//! 3 4
//!
//! <precedence relations>
//! 1,2
//!
//! <setup times forward>
//! 1,2:1
//!
//! <setup times backward>
//! 2,1:1
//!
//! <number of stations>
//! 2
//! ```
//!
//! Task ids are 1-based in the file and 0-based afterwards. Sections that do
//! not matter here (`<cycle time>`, `<order strength>`, `<end>`) are skipped.
//! A file without a backward section reuses the forward setups backwards.

use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::error::{Error, Result};
use crate::models::{RawInstance, SetupEntry, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    TaskCount,
    TaskTimes,
    Precedences,
    ForwardSetups,
    BackwardSetups,
    StationCount,
    Ignored,
}

impl Section {
    fn from_header(header: &str) -> Self {
        let h = header
            .trim_matches(|c| c == '<' || c == '>')
            .to_ascii_lowercase();
        if h.contains("number of tasks") {
            Self::TaskCount
        } else if h.contains("task times") {
            Self::TaskTimes
        } else if h.contains("precedence") {
            Self::Precedences
        } else if h.contains("setup") && h.contains("forward") {
            Self::ForwardSetups
        } else if h.contains("setup") && h.contains("backward") {
            Self::BackwardSetups
        } else if h.contains("stations") {
            Self::StationCount
        } else {
            Self::Ignored
        }
    }
}

/// Parses an `.alb` file.
pub fn parse_instance_file(path: impl AsRef<Path>) -> Result<RawInstance> {
    parse_instance_file_with_stations(path, None)
}

/// Parses an `.alb` file; `stations` replaces the file's station count.
pub fn parse_instance_file_with_stations(
    path: impl AsRef<Path>,
    stations: Option<usize>,
) -> Result<RawInstance> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    debug!("parsing instance {}", path.display());
    parse_instance_str_with_stations(&text, stations)
}

/// Parses `.alb` text.
///
/// # Errors
/// `MalformedInstance` (with a line number) for unparsable lines, missing
/// sections, or task times inconsistent with the declared task count.
pub fn parse_instance_str(text: &str) -> Result<RawInstance> {
    parse_instance_str_with_stations(text, None)
}

/// Parses `.alb` text; with `stations` set the station section may be absent.
pub fn parse_instance_str_with_stations(
    text: &str,
    stations: Option<usize>,
) -> Result<RawInstance> {
    let mut section: Option<Section> = None;
    let mut task_count: Option<usize> = None;
    let mut station_count: Option<usize> = None;
    let mut times: Vec<(TaskId, i64, usize)> = Vec::new();
    let mut precedences = Vec::new();
    let mut forward = Vec::new();
    let mut backward: Option<Vec<SetupEntry>> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('<') {
            let next = Section::from_header(line);
            if next == Section::BackwardSetups {
                backward.get_or_insert_with(Vec::new);
            }
            section = Some(next);
            continue;
        }

        match section {
            None => {
                return Err(malformed(line_no, "data before the first section header"));
            }
            Some(Section::TaskCount) => task_count = Some(number(line, line_no, "task count")?),
            Some(Section::StationCount) => {
                station_count = Some(number(line, line_no, "station count")?)
            }
            Some(Section::TaskTimes) => {
                let fields = split_fields(line);
                let [id, time] = fields.as_slice() else {
                    return Err(malformed(line_no, "expected `task time`"));
                };
                times.push((task_id(id, line_no)?, number(time, line_no, "task time")?, line_no));
            }
            Some(Section::Precedences) => {
                let fields = split_fields(line);
                let [before, after] = fields.as_slice() else {
                    return Err(malformed(line_no, "expected `before,after`"));
                };
                precedences.push((task_id(before, line_no)?, task_id(after, line_no)?));
            }
            Some(Section::ForwardSetups) => forward.push(setup_entry(line, line_no)?),
            Some(Section::BackwardSetups) => {
                backward
                    .get_or_insert_with(Vec::new)
                    .push(setup_entry(line, line_no)?)
            }
            Some(Section::Ignored) => {}
        }
    }

    let task_count = task_count.ok_or_else(|| missing("<number of tasks>"))?;
    let station_count = stations
        .or(station_count)
        .ok_or_else(|| missing("<number of stations>"))?;

    let mut processing_times: Vec<Option<i64>> = vec![None; task_count];
    for (task, time, line_no) in times {
        let slot = processing_times
            .get_mut(task)
            .ok_or_else(|| {
                malformed(
                    line_no,
                    format!("task {} exceeds declared count {task_count}", task + 1),
                )
            })?;
        if slot.replace(time).is_some() {
            return Err(malformed(line_no, format!("duplicate time for task {}", task + 1)));
        }
    }
    let processing_times = processing_times
        .into_iter()
        .enumerate()
        .map(|(task, t)| {
            t.ok_or_else(|| {
                Error::MalformedInstance(format!("missing processing time for task {}", task + 1))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let backward_setups = backward.unwrap_or_else(|| forward.clone());

    Ok(RawInstance {
        station_count,
        processing_times,
        precedences,
        forward_setups: forward,
        backward_setups,
    })
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect()
}

fn setup_entry(line: &str, line_no: usize) -> Result<SetupEntry> {
    let (pair, time) = line
        .split_once(':')
        .ok_or_else(|| malformed(line_no, "expected `from,to:time`"))?;
    let fields = split_fields(pair);
    let [from, to] = fields.as_slice() else {
        return Err(malformed(line_no, "expected `from,to:time`"));
    };
    Ok(SetupEntry::new(
        task_id(from, line_no)?,
        task_id(to, line_no)?,
        number(time, line_no, "setup time")?,
    ))
}

/// Converts a 1-based id field to a 0-based task id.
fn task_id(field: &str, line_no: usize) -> Result<TaskId> {
    let id: usize = number(field, line_no, "task id")?;
    id.checked_sub(1)
        .ok_or_else(|| malformed(line_no, "task ids start at 1"))
}

fn number<T: FromStr>(field: &str, line_no: usize, what: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| malformed(line_no, format!("invalid {what} `{}`", field.trim())))
}

fn malformed(line_no: usize, message: impl AsRef<str>) -> Error {
    Error::MalformedInstance(format!("line {line_no}: {}", message.as_ref()))
}

fn missing(section: &str) -> Error {
    Error::MalformedInstance(format!("missing section {section}"))
}
