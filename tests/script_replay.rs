use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use vaxslot::commands::read_script;
use vaxslot::config::SchedulingConfig;
use vaxslot::report::RowWriter;
use vaxslot::scheduling::{
    InMemoryNotificationSink, InMemorySchedulingRepository, SchedulingService,
};
use vaxslot::session::Session;

const SCRIPT: &str = "\
# two facilities in district 4, one vaccination per day each
CREATEFACILITY 10 4 08 00 10 00 1
CREATEFACILITY 11 4 13 00 16 00 1
CREATEREGISTRANT 1 Mary Jackson 1941-04-09 4 0 1
CREATEREGISTRANT 2 Dorothy Vaughan 1985-09-20 4 0 0
CREATEREGISTRANT 3 Katherine Johnson 1918-08-26 4 0 0
REGISTER 1 FACILITIES 10 DAY 1 09 00 12 00
REGISTER 2 ALL ALWAYS
REGISTER 3 ALL DAY 1
PRINTREGISTERED 10
ENDDAY
FINDAPPOINTMENTS DATE 2021 3 23 FACILITY 10
STATISTICS
";

fn output_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vaxslot-{}-{name}", std::process::id()))
}

fn session() -> Session<InMemorySchedulingRepository, InMemoryNotificationSink> {
    let service = SchedulingService::new(
        Arc::new(InMemorySchedulingRepository::default()),
        Arc::new(InMemoryNotificationSink::default()),
        SchedulingConfig::default(),
    );
    let start = NaiveDate::from_ymd_opt(2021, 3, 21).expect("valid start date");
    Session::new(service, start, RowWriter::from_writer(std::io::sink()))
}

#[test]
fn script_rows_land_in_the_redirected_output() {
    let path = output_path("rows.txt");
    fs::remove_file(&path).ok();
    let script = format!("SETOUTPUT {}\n{SCRIPT}", path.display());

    let mut session = session();
    let summary = session
        .run_script(Cursor::new(script))
        .expect("script replays");
    assert!(summary.rejected.is_empty(), "{:?}", summary.rejected);

    let written = fs::read_to_string(&path).expect("output written");
    fs::remove_file(&path).ok();
    let lines: Vec<&str> = written.lines().collect();

    // waitlist, in registration order
    assert_eq!(
        &lines[..3],
        &[
            "0|1|Mary|Jackson|4",
            "1|2|Dorothy|Vaughan|1",
            "2|3|Katherine|Johnson|2",
        ]
    );
    // Dorothy takes facility 10 on Monday; Katherine only fits facility 11 on Tuesday.
    assert!(lines.contains(&"1|10|2021-03-22 08:00:00"));
    assert!(lines.contains(&"2|11|2021-03-23 13:00:00"));
    assert!(lines.contains(&"vaccinated_registrants|0"));
    assert_eq!(summary.reconciliations.len(), 1);
    assert_eq!(summary.reconciliations[0].allocations.len(), 2);
}

#[test]
fn switching_back_to_an_output_keeps_its_earlier_rows() {
    let first = output_path("first.txt");
    let second = output_path("second.txt");
    fs::remove_file(&first).ok();
    fs::remove_file(&second).ok();
    let script = format!(
        "CREATEFACILITY 10 4 08 00 10 00 1\n\
         SETOUTPUT {first}\n\
         PRINTFREEFACILITIES 4\n\
         SETOUTPUT {second}\n\
         PRINTFREEFACILITIES 4\n\
         SETOUTPUT {first}\n\
         STATISTICS\n",
        first = first.display(),
        second = second.display(),
    );

    let summary = session()
        .run_script(Cursor::new(script))
        .expect("script replays");
    assert!(summary.rejected.is_empty(), "{:?}", summary.rejected);

    let first_rows = fs::read_to_string(&first).expect("first output written");
    let second_rows = fs::read_to_string(&second).expect("second output written");
    fs::remove_file(&first).ok();
    fs::remove_file(&second).ok();

    let lines: Vec<&str> = first_rows.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], "10");
    assert_eq!(lines[1], "vaccinated_registrants|0");
    assert_eq!(second_rows, "10\n");
}

#[test]
fn script_tokens_parse_cleanly() {
    let lines = read_script(Cursor::new(SCRIPT)).expect("script reads");
    assert_eq!(lines.len(), 12);
    for line in &lines {
        line.parse()
            .unwrap_or_else(|err| panic!("line {} failed: {err}", line.line));
    }
}
