//! Typed text-command grammar.
//!
//! Lines are tokenised once and parsed into [`Command`] values; nothing past this module
//! sees raw tokens.

mod parser;
mod script;

pub use parser::parse_command;
pub use script::{read_script, ScriptLine};

use std::path::PathBuf;

use serde::Serialize;

use crate::scheduling::{
    AppointmentFilter, CapacityDelta, FacilityChange, FacilityDraft, FacilitySelection,
    RegistrantDraft, RegistrantId, ValidTimeFilter, VaccinationFilter, WindowChange, WindowSpec,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
    CreateFacility(FacilityDraft),
    CreateRegistrant(RegistrantDraft),
    Register {
        registrant: RegistrantId,
        facilities: FacilitySelection,
        windows: Vec<WindowSpec>,
    },
    ChangeFacilities {
        registrant: RegistrantId,
        changes: Vec<FacilityChange>,
    },
    ChangeTimes {
        registrant: RegistrantId,
        changes: Vec<WindowChange>,
    },
    SetOutput(PathBuf),
    PrintRegistered {
        limit: usize,
    },
    PrintFreeFacilities {
        district: u32,
    },
    PrintValidTimes(Vec<ValidTimeFilter>),
    EndDay(Vec<CapacityDelta>),
    FindAppointments(Vec<AppointmentFilter>),
    FindVaccinations(Vec<VaccinationFilter>),
    Statistics,
}

impl Command {
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::CreateFacility(_) => "CREATEFACILITY",
            Command::CreateRegistrant(_) => "CREATEREGISTRANT",
            Command::Register { .. } => "REGISTER",
            Command::ChangeFacilities { .. } => "CHANGEFACILITIES",
            Command::ChangeTimes { .. } => "CHANGETIMES",
            Command::SetOutput(_) => "SETOUTPUT",
            Command::PrintRegistered { .. } => "PRINTREGISTERED",
            Command::PrintFreeFacilities { .. } => "PRINTFREEFACILITIES",
            Command::PrintValidTimes(_) => "PRINTVALIDTIMES",
            Command::EndDay(_) => "ENDDAY",
            Command::FindAppointments(_) => "FINDAPPOINTMENTS",
            Command::FindVaccinations(_) => "FINDVACCINATIONS",
            Command::Statistics => "STATISTICS",
        }
    }
}

impl std::str::FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        parse_command(&tokens)
    }
}

/// Rejection of a single malformed command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{command}: missing {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("{command}: expected {expected}, found '{found}'")]
    InvalidArgument {
        command: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("{command}: unexpected trailing token '{token}'")]
    TrailingToken {
        command: &'static str,
        token: String,
    },
    #[error("could not read script: {0}")]
    Script(String),
}
