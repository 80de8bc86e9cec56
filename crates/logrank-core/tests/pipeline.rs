use flate2::Compression;
use flate2::write::GzEncoder;
use logrank_core::config::FileConfig;
use logrank_core::report::ReportRow;
use logrank_core::runner::{RunState, Runner};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const TEMPLATE: &str = r#"<!doctype html>
<html>
<body>
<script type="text/javascript">
  var table = $table_json;
</script>
</body>
</html>
"#;

fn access_line(url: &str, time: &str) -> String {
    format!(
        r#"1.169.137.128 -  - [29/Jun/2017:03:50:23 +0300] "GET {} HTTP/1.1" 200 1002 "-" "Configovod" "-" "1498697423-2118016444-4708-9752777" "712e90144abee9" {}"#,
        url, time
    )
}

fn write_gz(path: &Path, lines: &[String]) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("log/archive")).unwrap();
    fs::create_dir(tmp.path().join("reports")).unwrap();
    fs::write(tmp.path().join("reports/report.html"), TEMPLATE).unwrap();
    tmp
}

fn config(tmp: &TempDir, report_size: i64) -> FileConfig {
    FileConfig {
        log_dir: tmp.path().join("log"),
        report_dir: tmp.path().join("reports"),
        report_template_path: tmp.path().join("reports/report.html"),
        report_size,
        ..FileConfig::default()
    }
}

fn embedded_rows(html: &str) -> Vec<ReportRow> {
    let start = html.find("var table = ").unwrap() + "var table = ".len();
    let end = html[start..].find(";\n").unwrap() + start;
    serde_json::from_str(&html[start..end]).unwrap()
}

#[test]
fn test_newest_gzip_log_is_ranked_and_rendered() {
    let tmp = workspace();

    // Older plain log must be ignored
    fs::write(
        tmp.path().join("log/nginx-access-ui.log-20170629"),
        access_line("/old", "9.0"),
    )
    .unwrap();

    let lines = vec![
        access_line("/api/v2/banner/1", "0.390"),
        access_line("/api/v2/banner/1", "0.133"),
        access_line("/api/v2/slot/4705/groups", "1.200"),
        access_line("/api/v2/group/7786679/statistic/sites/?date_type=day", "-"),
        access_line("/api/v2/banner/1", "0.200"),
        "".to_string(),
    ];
    write_gz(
        &tmp.path().join("log/archive/nginx-access-ui.log-20170630.gz"),
        &lines,
    );

    let mut runner = Runner::new(config(&tmp, 2).resolve().unwrap());
    let summary = runner.run().unwrap();

    assert_eq!(runner.state(), RunState::Done);
    assert_eq!(
        summary.log_file.path,
        tmp.path().join("log/archive/nginx-access-ui.log-20170630.gz")
    );
    assert_eq!(summary.total_lines, 6);
    assert_eq!(summary.matched_lines, 5);
    assert_eq!(summary.rows, 2);

    let html = fs::read_to_string(tmp.path().join("reports/report-2017.06.30.html")).unwrap();
    assert!(html.starts_with("<!doctype html>\n<html>"));
    assert!(!html.contains("$table_json"));

    let rows = embedded_rows(&html);
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].url, "/api/v2/slot/4705/groups");
    assert_eq!(rows[0].time_sum, 1.2);

    assert_eq!(rows[1].url, "/api/v2/banner/1");
    assert_eq!(rows[1].count, 3);
    assert_eq!(rows[1].count_percentage, 60.0);
    assert_eq!(rows[1].time_sum, 0.723);
    assert_eq!(rows[1].time_avg, 0.241);
    assert_eq!(rows[1].time_max, 0.39);
    assert_eq!(rows[1].time_med, 0.2);
    assert!(rows[0].time_sum >= rows[1].time_sum);
}

#[test]
fn test_floor_date_hides_old_logs() {
    let tmp = workspace();
    fs::write(
        tmp.path().join("log/nginx-access-ui.log-20170629"),
        access_line("/a", "1.0"),
    )
    .unwrap();

    let config = FileConfig {
        min_log_date: "20180101".to_string(),
        ..config(&tmp, 10)
    };
    let mut runner = Runner::new(config.resolve().unwrap());

    let err = runner.run().unwrap_err();
    assert!(matches!(err, logrank_core::Error::NotFound { .. }));
    assert_eq!(runner.state(), RunState::Failed);
}
