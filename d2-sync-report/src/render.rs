use chrono::NaiveDateTime;
use d2_sync_log::CompletedJob;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const INDENT: &str = "  ";

fn format_datetime(datetime: &NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

fn push_list(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(format!("{title}:"));
    lines.extend(items.iter().map(|item| format!("{INDENT}{item}")));
}

/// Plain-text block for one job.
pub fn render_job(job: &CompletedJob) -> String {
    let mut lines = vec![
        format!("Type: {}", job.kind),
        format!("Status: {}", if job.success { "SUCCESS" } else { "ERROR" }),
        format!("Start: {}", format_datetime(&job.start)),
        format!("End: {}", format_datetime(&job.end)),
    ];

    push_list(&mut lines, "Errors", &job.errors);
    push_list(&mut lines, "Suggestions", &job.suggestions);

    lines.join("\n")
}

/// Plain-text report, one block per job separated by a blank line.
pub fn render_jobs(jobs: &[CompletedJob]) -> String {
    jobs.iter().map(render_job).collect::<Vec<_>>().join("\n\n")
}
