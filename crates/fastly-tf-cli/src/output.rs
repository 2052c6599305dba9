use fastly_tf_acctest::{ApplyRun, ApplyRunStatus};
use fastly_tf_domain::{flatten::fields, FlatRecord};
use serde_json::Value;

/// Render flattened GCS records as `key = value` blocks, one per endpoint.
pub fn render_flat(records: &[FlatRecord]) -> String {
    if records.is_empty() {
        return "No GCS logging endpoints.\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let name = record.get(fields::NAME).map(plain).unwrap_or_default();
        out.push_str(&format!("gcslogging {}\n", name));
        for (key, value) in record {
            if key == fields::NAME {
                continue;
            }
            out.push_str(&format!("  {} = {}\n", key, plain(value)));
        }
    }
    out
}

/// Render terraform run records, newest last.
pub fn render_runs(runs: &[ApplyRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let status = match run.status {
            ApplyRunStatus::Succeeded => "ok",
            ApplyRunStatus::Failed => "FAILED",
        };
        let secs = (run.finished_at - run.started_at).num_seconds();
        out.push_str(&format!(
            "{} {:?} {} {} ({}s)\n",
            run.id, run.operation, run.service, status, secs
        ));
    }
    out
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastly_tf_domain::{flatten_gcs, Gcs};

    #[test]
    fn flat_records_render_name_first_without_quotes() {
        let records = flatten_gcs(&[Gcs {
            name: "GCS collector".into(),
            user: "email@example.com".into(),
            bucket_name: "bucketName".into(),
            period: 3600,
            ..Default::default()
        }]);
        let text = render_flat(&records);
        assert!(text.starts_with("gcslogging GCS collector\n"));
        assert!(text.contains("  bucket_name = bucketName\n"));
        assert!(text.contains("  period = 3600\n"));
        assert!(!text.contains("  name = "));
    }

    #[test]
    fn no_records() {
        assert_eq!(render_flat(&[]), "No GCS logging endpoints.\n");
    }
}
