use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};

use super::{Command, CommandError};
use crate::scheduling::{
    AppointmentFilter, CapacityDelta, DayOfWeek, FacilityChange, FacilityDraft, FacilityId,
    FacilitySelection, RegistrantDraft, RegistrantId, TimeWindow, ValidTimeFilter,
    VaccinationFilter, WindowChange, WindowSpec,
};

/// Parses one tokenised command line.
pub fn parse_command(tokens: &[&str]) -> Result<Command, CommandError> {
    let (keyword, rest) = tokens.split_first().ok_or(CommandError::Empty)?;

    match *keyword {
        "CREATEFACILITY" => parse_create_facility(Tokens::new("CREATEFACILITY", rest)),
        "CREATEREGISTRANT" => parse_create_registrant(Tokens::new("CREATEREGISTRANT", rest)),
        "REGISTER" => parse_register(Tokens::new("REGISTER", rest)),
        "CHANGEFACILITIES" => parse_change_facilities(Tokens::new("CHANGEFACILITIES", rest)),
        "CHANGETIMES" => parse_change_times(Tokens::new("CHANGETIMES", rest)),
        "SETOUTPUT" => {
            let mut tokens = Tokens::new("SETOUTPUT", rest);
            let path = PathBuf::from(tokens.take("output path")?);
            tokens.finish(Command::SetOutput(path))
        }
        "PRINTREGISTERED" => {
            let mut tokens = Tokens::new("PRINTREGISTERED", rest);
            let limit = tokens.number("row count")?;
            tokens.finish(Command::PrintRegistered { limit })
        }
        "PRINTFREEFACILITIES" => {
            let mut tokens = Tokens::new("PRINTFREEFACILITIES", rest);
            let district = tokens.number("district")?;
            tokens.finish(Command::PrintFreeFacilities { district })
        }
        "PRINTVALIDTIMES" => parse_valid_times(Tokens::new("PRINTVALIDTIMES", rest)),
        "ENDDAY" => parse_end_day(Tokens::new("ENDDAY", rest)),
        "FINDAPPOINTMENTS" => parse_find_appointments(Tokens::new("FINDAPPOINTMENTS", rest)),
        "FINDVACCINATIONS" => parse_find_vaccinations(Tokens::new("FINDVACCINATIONS", rest)),
        "STATISTICS" => Tokens::new("STATISTICS", rest).finish(Command::Statistics),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn parse_create_facility(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let id = FacilityId(tokens.number("facility id")?);
    let district = tokens.number("district")?;
    let opens_at = tokens.time()?;
    let closes_at = tokens.time()?;
    let capacity = tokens.number("capacity")?;
    tokens.finish(Command::CreateFacility(FacilityDraft {
        id,
        district,
        opens_at,
        closes_at,
        capacity,
    }))
}

fn parse_create_registrant(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let id = RegistrantId(tokens.number("registrant id")?);
    let first_name = tokens.take("first name")?.to_string();
    let last_name = tokens.take("last name")?.to_string();
    let birth_date = tokens.iso_date()?;
    let district = tokens.number("district")?;
    let dose_count = tokens.number("dose count")?;
    let special_eligible = tokens.flag("special eligibility flag (0 or 1)")?;
    tokens.finish(Command::CreateRegistrant(RegistrantDraft {
        id,
        first_name,
        last_name,
        birth_date,
        district,
        dose_count,
        special_eligible,
    }))
}

fn parse_register(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let registrant = RegistrantId(tokens.number("registrant id")?);

    let mut facilities = FacilitySelection {
        whole_district: tokens.eat("ALL"),
        explicit: Vec::new(),
    };
    if tokens.eat("FACILITIES") {
        while tokens.peek_number() {
            facilities.explicit.push(FacilityId(tokens.number("facility id")?));
        }
        if facilities.explicit.is_empty() {
            return Err(tokens.missing("facility id"));
        }
    }

    let mut windows = Vec::new();
    while !tokens.is_done() {
        windows.push(tokens.window_spec()?);
    }
    if windows.is_empty() {
        return Err(tokens.missing("ALWAYS or DAY"));
    }

    Ok(Command::Register {
        registrant,
        facilities,
        windows,
    })
}

fn parse_change_facilities(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let registrant = RegistrantId(tokens.number("registrant id")?);

    let mut changes = Vec::new();
    while let Some(token) = tokens.peek() {
        let change = match token.strip_prefix('-') {
            Some(id) => FacilityChange::Remove(FacilityId(tokens.parse_as(id, "facility id")?)),
            None => FacilityChange::Add(FacilityId(tokens.parse_as(token, "facility id")?)),
        };
        tokens.advance();
        changes.push(change);
    }
    if changes.is_empty() {
        return Err(tokens.missing("facility id"));
    }

    Ok(Command::ChangeFacilities {
        registrant,
        changes,
    })
}

fn parse_change_times(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let registrant = RegistrantId(tokens.number("registrant id")?);

    let mut changes = Vec::new();
    while !tokens.is_done() {
        if tokens.eat("ALWAYS") {
            changes.push(WindowChange::Set(WindowSpec::Always));
            continue;
        }
        tokens.keyword("DAY")?;
        let day = tokens.day()?;
        let change = if tokens.eat("NOT") {
            WindowChange::Clear(day)
        } else if tokens.peek_number() {
            WindowChange::Set(WindowSpec::Range(day, tokens.window()?))
        } else {
            WindowChange::Set(WindowSpec::WholeDay(day))
        };
        changes.push(change);
    }
    if changes.is_empty() {
        return Err(tokens.missing("ALWAYS or DAY"));
    }

    Ok(Command::ChangeTimes {
        registrant,
        changes,
    })
}

fn parse_valid_times(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let mut filters = Vec::new();
    while let Some(token) = tokens.peek() {
        tokens.advance();
        let filter = match token {
            "ID" => ValidTimeFilter::Registrant(RegistrantId(tokens.number("registrant id")?)),
            "IDDAY" => {
                let registrant = RegistrantId(tokens.number("registrant id")?);
                ValidTimeFilter::RegistrantOnDay(registrant, tokens.day()?)
            }
            "DAY" => {
                let day = tokens.day()?;
                if tokens.peek_number() {
                    ValidTimeFilter::DayWithin(day, tokens.window()?)
                } else {
                    ValidTimeFilter::Day(day)
                }
            }
            other => return Err(tokens.invalid("ID, IDDAY or DAY", other)),
        };
        filters.push(filter);
    }
    if filters.is_empty() {
        return Err(tokens.missing("filter"));
    }
    Ok(Command::PrintValidTimes(filters))
}

fn parse_end_day(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let mut deltas = Vec::new();
    while !tokens.is_done() {
        let facility = FacilityId(tokens.number("facility id")?);
        let delta = tokens.number("capacity delta")?;
        deltas.push(CapacityDelta { facility, delta });
    }
    Ok(Command::EndDay(deltas))
}

fn parse_find_appointments(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let mut filters = Vec::new();
    while let Some(token) = tokens.peek() {
        tokens.advance();
        let filter = match token {
            "ID" => AppointmentFilter::Registrant(RegistrantId(tokens.number("registrant id")?)),
            "DATE" => AppointmentFilter::Date(tokens.spaced_date()?),
            "FACILITY" => AppointmentFilter::Facility(FacilityId(tokens.number("facility id")?)),
            "FACILITYDATE" => {
                let facility = FacilityId(tokens.number("facility id")?);
                AppointmentFilter::FacilityOnDate(facility, tokens.spaced_date()?)
            }
            other => return Err(tokens.invalid("ID, DATE, FACILITY or FACILITYDATE", other)),
        };
        filters.push(filter);
    }
    if filters.is_empty() {
        return Err(tokens.missing("filter"));
    }
    Ok(Command::FindAppointments(filters))
}

fn parse_find_vaccinations(mut tokens: Tokens<'_>) -> Result<Command, CommandError> {
    let mut filters = Vec::new();
    while let Some(token) = tokens.peek() {
        tokens.advance();
        let filter = match token {
            "ID" => VaccinationFilter::Registrant(RegistrantId(tokens.number("registrant id")?)),
            "DATE" => VaccinationFilter::Date(tokens.spaced_date()?),
            "FACILITY" => VaccinationFilter::Facility(FacilityId(tokens.number("facility id")?)),
            "FACILITYDATE" => {
                let facility = FacilityId(tokens.number("facility id")?);
                VaccinationFilter::FacilityOnDate(facility, tokens.spaced_date()?)
            }
            "DOSE" => VaccinationFilter::Dose(tokens.number("dose number")?),
            other => {
                return Err(tokens.invalid("ID, DATE, FACILITY, FACILITYDATE or DOSE", other))
            }
        };
        filters.push(filter);
    }
    if filters.is_empty() {
        return Err(tokens.missing("filter"));
    }
    Ok(Command::FindVaccinations(filters))
}

/// Cursor over the arguments of one command.
struct Tokens<'a> {
    command: &'static str,
    items: &'a [&'a str],
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(command: &'static str, items: &'a [&'a str]) -> Self {
        Self {
            command,
            items,
            position: 0,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.items.get(self.position).copied()
    }

    fn peek_number(&self) -> bool {
        self.peek()
            .map_or(false, |token| token.parse::<i64>().is_ok())
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_done(&self) -> bool {
        self.position >= self.items.len()
    }

    fn take(&mut self, expected: &'static str) -> Result<&'a str, CommandError> {
        let token = self.peek().ok_or_else(|| self.missing(expected))?;
        self.advance();
        Ok(token)
    }

    fn eat(&mut self, keyword: &str) -> bool {
        if self.peek() == Some(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn keyword(&mut self, keyword: &'static str) -> Result<(), CommandError> {
        let token = self.take(keyword)?;
        if token == keyword {
            Ok(())
        } else {
            Err(self.invalid(keyword, token))
        }
    }

    fn parse_as<T: FromStr>(&self, token: &str, expected: &'static str) -> Result<T, CommandError> {
        token.parse().map_err(|_| self.invalid(expected, token))
    }

    fn number<T: FromStr>(&mut self, expected: &'static str) -> Result<T, CommandError> {
        let token = self.take(expected)?;
        self.parse_as(token, expected)
    }

    fn flag(&mut self, expected: &'static str) -> Result<bool, CommandError> {
        match self.take(expected)? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(self.invalid(expected, other)),
        }
    }

    fn day(&mut self) -> Result<DayOfWeek, CommandError> {
        let token = self.take("weekday")?;
        token
            .parse::<u8>()
            .ok()
            .and_then(DayOfWeek::new)
            .ok_or_else(|| self.invalid("weekday 0-6", token))
    }

    /// `HH MM`
    fn time(&mut self) -> Result<NaiveTime, CommandError> {
        let hour: u32 = self.number("hour")?;
        let minute: u32 = self.number("minute")?;
        NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| self.invalid("time of day", &format!("{hour} {minute}")))
    }

    /// `HH MM HH MM` with the start strictly before the end.
    fn window(&mut self) -> Result<TimeWindow, CommandError> {
        let from = self.time()?;
        let to = self.time()?;
        TimeWindow::new(from, to)
            .ok_or_else(|| self.invalid("start before end", &format!("{from}-{to}")))
    }

    fn window_spec(&mut self) -> Result<WindowSpec, CommandError> {
        if self.eat("ALWAYS") {
            return Ok(WindowSpec::Always);
        }
        self.keyword("DAY")?;
        let day = self.day()?;
        if self.peek_number() {
            Ok(WindowSpec::Range(day, self.window()?))
        } else {
            Ok(WindowSpec::WholeDay(day))
        }
    }

    /// `YYYY-MM-DD`
    fn iso_date(&mut self) -> Result<NaiveDate, CommandError> {
        let token = self.take("date")?;
        NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| self.invalid("YYYY-MM-DD", token))
    }

    /// `YYYY MM DD` as three tokens.
    fn spaced_date(&mut self) -> Result<NaiveDate, CommandError> {
        let year: i32 = self.number("year")?;
        let month: u32 = self.number("month")?;
        let day: u32 = self.number("day")?;
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| self.invalid("calendar date", &format!("{year} {month} {day}")))
    }

    fn finish(&self, command: Command) -> Result<Command, CommandError> {
        match self.peek() {
            None => Ok(command),
            Some(token) => Err(CommandError::TrailingToken {
                command: self.command,
                token: token.to_string(),
            }),
        }
    }

    fn missing(&self, expected: &'static str) -> CommandError {
        CommandError::MissingArgument {
            command: self.command,
            expected,
        }
    }

    fn invalid(&self, expected: &'static str, found: &str) -> CommandError {
        CommandError::InvalidArgument {
            command: self.command,
            expected,
            found: found.to_string(),
        }
    }
}
