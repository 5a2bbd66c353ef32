//! Input cleaning for user-authored profile text.

use rust_decimal::Decimal;

use crate::errors::ServiceError;

pub const DISPLAY_NAME_MAX: usize = 100;
pub const BIO_MAX: usize = 2000;
pub const TITLE_MAX: usize = 120;
pub const TEXT_MAX: usize = 200;
pub const MAX_SKILLS: usize = 50;
pub const SKILL_MAX: usize = 50;
pub const MAX_HOURLY_RATE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
pub const MAX_YEARS_EXPERIENCE: i32 = 60;

/// Drop `<...>` markup, collapse whitespace runs and trim.
pub fn clean_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean and length-check an optional field; blank input becomes `None`.
pub fn optional_text(field: &str, value: &str, max: usize) -> Result<Option<String>, ServiceError> {
    let cleaned = clean_text(value);
    if cleaned.is_empty() {
        return Ok(None);
    }
    if cleaned.chars().count() > max {
        return Err(ServiceError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(Some(cleaned))
}

pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    optional_text(field, value, max)?.ok_or_else(|| ServiceError::Validation(format!("{field} is required")))
}

/// Trimmed, de-duplicated case-insensitively, first spelling wins.
pub fn clean_skills(skills: &[String]) -> Result<Vec<String>, ServiceError> {
    let mut out: Vec<String> = Vec::new();
    for raw in skills {
        let skill = clean_text(raw);
        if skill.is_empty() {
            continue;
        }
        if skill.chars().count() > SKILL_MAX {
            return Err(ServiceError::Validation(format!("skill '{skill}' must be at most {SKILL_MAX} characters")));
        }
        if !out.iter().any(|s| s.eq_ignore_ascii_case(&skill)) {
            out.push(skill);
        }
    }
    if out.len() > MAX_SKILLS {
        return Err(ServiceError::Validation(format!("at most {MAX_SKILLS} skills are allowed")));
    }
    Ok(out)
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    Some(host)
}

/// http(s) URL with a plausible host; blank input becomes `None`.
pub fn optional_url(field: &str, value: &str) -> Result<Option<String>, ServiceError> {
    let url = value.trim();
    if url.is_empty() {
        return Ok(None);
    }
    let invalid = || ServiceError::Validation(format!("{field} must be a valid http(s) URL"));
    if url.chars().any(char::is_whitespace) || url.len() > 2048 {
        return Err(invalid());
    }
    let host = host_of(url).ok_or_else(invalid)?;
    if host.is_empty() || !(host.contains('.') || host.eq_ignore_ascii_case("localhost")) {
        return Err(invalid());
    }
    Ok(Some(url.to_string()))
}

/// Like [`optional_url`] but the host must be `domain` or one of its subdomains.
pub fn optional_host_url(field: &str, value: &str, domain: &str) -> Result<Option<String>, ServiceError> {
    let Some(url) = optional_url(field, value)? else { return Ok(None) };
    let host = host_of(&url).unwrap_or_default().to_ascii_lowercase();
    if host == domain || host.ends_with(&format!(".{domain}")) {
        Ok(Some(url))
    } else {
        Err(ServiceError::Validation(format!("{field} must point to {domain}")))
    }
}

pub fn hourly_rate(rate: Decimal) -> Result<Decimal, ServiceError> {
    if rate <= Decimal::ZERO || rate > MAX_HOURLY_RATE {
        return Err(ServiceError::Validation(format!("hourly_rate must be greater than 0 and at most {MAX_HOURLY_RATE}")));
    }
    Ok(rate.round_dp(2))
}

pub fn years_experience(years: i32) -> Result<i32, ServiceError> {
    if !(0..=MAX_YEARS_EXPERIENCE).contains(&years) {
        return Err(ServiceError::Validation(format!("years_experience must be between 0 and {MAX_YEARS_EXPERIENCE}")));
    }
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_whitespace() {
        assert_eq!(clean_text("  <b>Rust</b>\n\n  developer <script>x</script> "), "Rust developer x");
        assert_eq!(optional_text("bio", " <p> </p> ", 10).unwrap(), None);
        assert!(optional_text("bio", &"a".repeat(11), 10).is_err());
        assert!(required_text("display_name", "   ", 100).is_err());
    }

    #[test]
    fn skills_are_deduplicated_case_insensitively() {
        let skills = vec!["Rust".to_string(), " rust ".into(), "".into(), "Postgres".into()];
        assert_eq!(clean_skills(&skills).unwrap(), vec!["Rust", "Postgres"]);
        let too_many: Vec<String> = (0..51).map(|i| format!("s{i}")).collect();
        assert!(clean_skills(&too_many).is_err());
    }

    #[test]
    fn url_rules() {
        assert!(optional_url("website", "https://example.com/me").unwrap().is_some());
        assert!(optional_url("website", "http://localhost:8080").unwrap().is_some());
        assert_eq!(optional_url("website", "  ").unwrap(), None);
        for bad in ["ftp://example.com", "https://", "https://nodot", "https://exa mple.com", "example.com"] {
            assert!(optional_url("website", bad).is_err(), "{bad}");
        }
        assert!(optional_host_url("github_url", "https://github.com/ada", "github.com").is_ok());
        assert!(optional_host_url("github_url", "https://www.github.com/ada", "github.com").is_ok());
        assert!(optional_host_url("github_url", "https://gitlab.com/ada", "github.com").is_err());
        assert!(optional_host_url("github_url", "https://notgithub.com/ada", "github.com").is_err());
    }

    #[test]
    fn numeric_bounds() {
        assert!(hourly_rate(Decimal::ZERO).is_err());
        assert!(hourly_rate(Decimal::from(1001)).is_err());
        assert_eq!(hourly_rate(Decimal::new(7550, 2)).unwrap(), Decimal::new(7550, 2));
        assert!(years_experience(-1).is_err());
        assert!(years_experience(61).is_err());
        assert_eq!(years_experience(60).unwrap(), 60);
    }
}
