use tracing::debug;

use crate::error::{AppError, Result};

/// Splits each `key=value` string at the first `=`.
pub fn parse_params(params: &[String]) -> Result<Vec<(String, String)>> {
    params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| {
                    debug!(key, value, "Added query parameter");
                    (key.to_string(), value.to_string())
                })
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid param format: {param}")))
        })
        .collect()
}

/// Splits each `Name: Value` string at the first `:`, trimming both sides.
pub fn parse_headers(headers: &[String]) -> Result<Vec<(String, String)>> {
    headers
        .iter()
        .map(|raw| {
            raw.split_once(':')
                .map(|(name, value)| (name.trim(), value.trim()))
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid header format: {raw}")))
        })
        .collect()
}

/// Output file name: `name` as given, with `.mp4` appended when it has no extension.
pub fn output_file_name(name: Option<&str>, job_id: &str) -> Result<String> {
    let Some(name) = name.map(str::trim) else {
        return Ok(format!("{job_id}.mp4"));
    };
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(AppError::InvalidInput(format!("Invalid output name: {name:?}")));
    }
    if std::path::Path::new(name).extension().is_some() {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}.mp4"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn params_split_on_first_equals() {
        let parsed = parse_params(&strings(&["a=1", "sig=x=y", "empty="])).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "1".to_string()),
                ("sig".to_string(), "x=y".to_string()),
                ("empty".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn params_without_key_are_rejected() {
        assert!(parse_params(&strings(&["novalue"])).is_err());
        assert!(parse_params(&strings(&["=v"])).is_err());
    }

    #[test]
    fn headers_are_trimmed() {
        let parsed = parse_headers(&strings(&["Referer:  https://h/a ", "X-Id:42"])).unwrap();
        assert_eq!(parsed[0], ("Referer".to_string(), "https://h/a".to_string()));
        assert_eq!(parsed[1], ("X-Id".to_string(), "42".to_string()));
        assert!(parse_headers(&strings(&["no colon"])).is_err());
    }

    #[test]
    fn output_name_defaults_to_job_id() {
        assert_eq!(output_file_name(None, "abc").unwrap(), "abc.mp4");
        assert_eq!(output_file_name(Some("clip"), "abc").unwrap(), "clip.mp4");
        assert_eq!(output_file_name(Some("clip.ts"), "abc").unwrap(), "clip.ts");
        assert!(output_file_name(Some("../clip"), "abc").is_err());
    }
}
