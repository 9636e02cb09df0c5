use qayd_client::ClientError;

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "The run stopped.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Class:    {}", error.class().as_str()),
        format!("  Details:  {}", error.message),
    ];

    if let Some(reports_dir) = error
        .data
        .as_ref()
        .and_then(|data| data.get("reports_dir"))
        .and_then(|value| value.as_str())
    {
        lines.push(format!("  Reports:  {reports_dir}"));
    }

    lines.push(String::new());
    lines.push("What to do next:".to_string());
    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use qayd_client::ClientError;
    use serde_json::json;

    use super::render_error;

    #[test]
    fn renders_standard_error_layout() {
        let error = ClientError::invalid_argument_with_recovery(
            "bad input",
            vec!["run qayd --help".to_string()],
        );

        let rendered = render_error(&error);
        assert!(rendered.starts_with("The run stopped."));
        assert!(rendered.contains("  Error:    invalid_argument"));
        assert!(rendered.contains("  Class:    configuration"));
        assert!(rendered.contains("  Details:  bad input"));
        assert!(rendered.contains("What to do next:"));
        assert!(rendered.contains("  1. run qayd --help"));
    }

    #[test]
    fn points_at_reports_when_present() {
        let error = ClientError::validation_failed(json!({"reports_dir": "/tmp/run_1"}));
        let rendered = render_error(&error);
        assert!(rendered.contains("  Reports:  /tmp/run_1"));
    }
}
