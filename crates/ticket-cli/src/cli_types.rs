use clap::ValueEnum;
use ticket_board::MarkupMode;
use ticket_router::DeleteMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMarkupMode {
    Plain,
    Html,
}

impl From<CliMarkupMode> for MarkupMode {
    fn from(value: CliMarkupMode) -> Self {
        match value {
            CliMarkupMode::Plain => MarkupMode::Plain,
            CliMarkupMode::Html => MarkupMode::Html,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliDeleteMode {
    Single,
    Batch,
}

impl From<CliDeleteMode> for DeleteMode {
    fn from(value: CliDeleteMode) -> Self {
        match value {
            CliDeleteMode::Single => DeleteMode::Single,
            CliDeleteMode::Batch => DeleteMode::Batch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliBoardWidth {
    Normal,
    Wide,
}
