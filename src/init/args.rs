// SPDX-License-Identifier: Apache-2.0

use clap::{Args, ValueEnum};
use std::time::Duration;

use crate::inputs::file::config::{
    FileInputConfig, ReadFrom, DEFAULT_CHUNK_SIZE,
};
use crate::inputs::file::splitter::SplitterKind;

#[derive(Debug, Args, Clone)]
pub struct AgentRun {
    /// File path or glob pattern to tail
    #[arg(long, env = "LOGSHIP_FILE")]
    pub file: String,

    /// Identifier stamped on every message from this input
    #[arg(long, env = "LOGSHIP_INPUT_ID", default_value = "file")]
    pub input_id: String,

    /// Source value carried on each message
    #[arg(long, env = "LOGSHIP_SOURCE", default_value = "file")]
    pub source: String,

    /// Character set of the tailed files
    #[arg(long, env = "LOGSHIP_CHARSET", default_value = "utf-8")]
    pub charset: String,

    /// How records are delimited
    #[arg(value_enum, long, env = "LOGSHIP_SPLITTER", default_value = "newline")]
    pub splitter: SplitterArg,

    /// Regex marking the start of each record, for the pattern splitter
    #[arg(long, env = "LOGSHIP_SPLIT_PATTERN")]
    pub split_pattern: Option<String>,

    /// Where to start reading files that exist at startup
    #[arg(value_enum, long, env = "LOGSHIP_READ_FROM", default_value = "end")]
    pub read_from: ReadFromArg,

    /// Stop at end of file instead of waiting for appended content
    #[arg(long, env = "LOGSHIP_NO_FOLLOW", default_value = "false")]
    pub no_follow: bool,

    /// Maximum bytes per read
    #[arg(long, env = "LOGSHIP_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Milliseconds between read attempts per file
    #[arg(long, env = "LOGSHIP_READ_INTERVAL_MS", default_value = "250")]
    pub read_interval_ms: u64,

    /// Capacity of the buffer between inputs and outputs
    #[arg(long, env = "LOGSHIP_MESSAGE_BUFFER_SIZE", default_value = "128")]
    pub message_buffer_size: usize,

    /// Outputs to run
    #[arg(
        value_enum,
        long,
        env = "LOGSHIP_OUTPUTS",
        value_delimiter = ',',
        default_value = "stdout"
    )]
    pub outputs: Vec<OutputKind>,

    /// Output ids this input's messages are directed to. Empty leaves them
    /// undirected
    #[arg(long, env = "LOGSHIP_ROUTE_TO", value_delimiter = ',')]
    pub route_to: Vec<String>,
}

impl AgentRun {
    pub fn file_input_config(&self) -> FileInputConfig {
        let mut config = FileInputConfig::new(&self.input_id, &self.file);
        config.charset = self.charset.clone();
        config.splitter = self.splitter.into();
        config.split_pattern = self.split_pattern.clone();
        config.read_from = self.read_from.into();
        config.follow = !self.no_follow;
        config.chunk_size = self.chunk_size;
        config.read_interval = Duration::from_millis(self.read_interval_ms);
        config.source = self.source.clone();
        config.outputs = self.route_to.iter().cloned().collect();
        config
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum SplitterArg {
    Newline,
    Pattern,
}

impl From<SplitterArg> for SplitterKind {
    fn from(value: SplitterArg) -> Self {
        match value {
            SplitterArg::Newline => SplitterKind::Newline,
            SplitterArg::Pattern => SplitterKind::Pattern,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum ReadFromArg {
    Start,
    End,
}

impl From<ReadFromArg> for ReadFrom {
    fn from(value: ReadFromArg) -> Self {
        match value {
            ReadFromArg::Start => ReadFrom::Start,
            ReadFromArg::End => ReadFrom::End,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum OutputKind {
    Stdout,
    Blackhole,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> AgentRun {
        AgentRun {
            file: "/var/log/*.log".to_string(),
            input_id: "app".to_string(),
            source: "file".to_string(),
            charset: "utf-8".to_string(),
            splitter: SplitterArg::Newline,
            split_pattern: None,
            read_from: ReadFromArg::End,
            no_follow: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_interval_ms: 250,
            message_buffer_size: 128,
            outputs: vec![OutputKind::Stdout],
            route_to: Vec::new(),
        }
    }

    #[test]
    fn maps_onto_input_config() {
        let mut run = args();
        run.no_follow = true;
        run.read_from = ReadFromArg::Start;
        run.route_to = vec!["stdout".to_string()];

        let config = run.file_input_config();
        assert_eq!("app", config.id);
        assert_eq!("/var/log/*.log", config.path_pattern);
        assert!(!config.follow);
        assert_eq!(ReadFrom::Start, config.read_from);
        assert!(config.outputs.contains("stdout"));
        assert!(config.validate().is_ok());
    }
}
