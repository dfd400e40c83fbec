use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_boletimd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn boletimd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn approx(v: &serde_json::Value, expected: f64) -> bool {
    v.as_f64()
        .map(|x| (x - expected).abs() < 1e-9)
        .unwrap_or(false)
}

fn mt_row(subject: &str, period: &str, mark: f64) -> serde_json::Value {
    // MAS = mark and AT = mark gives MT = mark.
    json!({ "subjectId": subject, "periodId": period, "as1": mark, "at": mark })
}

#[test]
fn subjects_weigh_equally_regardless_of_period_count() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "calc.annualSummary",
        json!({
            "gradeLevel": 8,
            "rounding": "raw",
            "scores": [
                { "subjectId": "mat", "subjectName": "Matemática", "periodId": "T1", "as1": 14, "at": 10 },
                { "subjectId": "mat", "periodId": "T2", "as1": null, "at": 12 },
                mt_row("mat", "T3", 15.0),
                mt_row("por", "T3", 9.0),
            ]
        }),
    );

    let subjects = res["subjects"].as_array().expect("subjects");
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0]["subjectId"].as_str(), Some("mat"));
    assert_eq!(subjects[0]["subjectName"].as_str(), Some("Matemática"));
    assert_eq!(subjects[0]["periods"].as_array().map(|p| p.len()), Some(3));
    assert!(approx(&subjects[0]["annualAverage"], 13.3));
    assert_eq!(subjects[0]["evaluatedPeriods"].as_u64(), Some(2));
    assert!(approx(&subjects[1]["annualAverage"], 9.0));

    assert!(approx(&res["overallAverage"], 11.15));
    assert_eq!(res["evaluatedPeriods"].as_u64(), Some(2));
    assert_eq!(res["classification"].as_str(), Some("pending"));
    assert_eq!(res["examBearing"].as_bool(), Some(false));

    let periods = res["periods"].as_array().expect("periods");
    let ids: Vec<&str> = periods.iter().filter_map(|p| p["periodId"].as_str()).collect();
    assert_eq!(ids, vec!["T1", "T2", "T3"]);
    assert!(approx(&periods[0]["average"], 11.6));
    assert_eq!(periods[0]["classification"].as_str(), Some("approved"));
    assert!(periods[1]["average"].is_null());
    assert_eq!(periods[1]["classification"].as_str(), Some("pending"));
    assert!(approx(&periods[2]["average"], 12.0));
    assert_eq!(periods[2]["subjectCount"].as_u64(), Some(2));

    let _ = child.kill();
}

#[test]
fn three_evaluated_periods_unlock_classification() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let scores = json!([
        mt_row("mat", "T1", 8.0),
        mt_row("mat", "T2", 8.0),
        mt_row("mat", "T3", 8.0),
        mt_row("fis", "T1", 6.5),
    ]);

    let exam_level = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "calc.annualSummary",
        json!({ "gradeLevel": 9, "scores": scores }),
    );
    assert!(approx(&exam_level["overallAverage"], 7.25));
    assert_eq!(exam_level["evaluatedPeriods"].as_u64(), Some(3));
    assert_eq!(exam_level["examBearing"].as_bool(), Some(true));
    assert_eq!(exam_level["classification"].as_str(), Some("examTrack"));

    let regular_level = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "calc.annualSummary",
        json!({ "gradeLevel": 7, "scores": scores }),
    );
    assert_eq!(regular_level["classification"].as_str(), Some("progresses"));

    let active = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "calc.annualSummary",
        json!({ "gradeLevel": 7, "yearActive": true, "scores": scores }),
    );
    assert_eq!(active["classification"].as_str(), Some("inProgress"));
    assert_eq!(active["yearActive"].as_bool(), Some(true));

    let _ = child.kill();
}

#[test]
fn printed_rounding_does_not_move_the_band() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "calc.annualSummary",
        json!({
            "gradeLevel": 12,
            "rounding": "ceiling",
            "scores": [
                mt_row("mat", "T1", 9.2),
                mt_row("mat", "T2", 9.2),
                mt_row("mat", "T3", 9.2),
            ]
        }),
    );
    assert_eq!(res["rounding"].as_str(), Some("ceiling"));
    assert!(approx(&res["overallAverage"], 10.0));
    assert!(approx(&res["subjects"][0]["annualAverage"], 10.0));
    assert_eq!(res["classification"].as_str(), Some("examTrack"));

    let _ = child.kill();
}

#[test]
fn empty_year_is_pending_with_no_average() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "calc.annualSummary",
        json!({ "gradeLevel": 10, "scores": [] }),
    );
    assert!(res["overallAverage"].is_null());
    assert_eq!(res["subjects"].as_array().map(|s| s.len()), Some(0));
    assert_eq!(res["classification"].as_str(), Some("pending"));

    let missing_level = request(
        &mut stdin,
        &mut reader,
        "2",
        "calc.annualSummary",
        json!({ "scores": [] }),
    );
    assert_eq!(error_code(&missing_level), Some("bad_params"));

    let _ = child.kill();
}
