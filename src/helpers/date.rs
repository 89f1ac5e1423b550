//! Date helper functions

use chrono::{DateTime, Locale, TimeZone};
use chrono_tz::Tz;

use crate::cms::Timestamp;
use crate::config::SiteConfig;

/// Formats publication dates with a fixed pattern, locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    timezone: Option<Tz>,
    placeholder: String,
}

impl DateFormatter {
    /// Build a formatter from `date_format`, `language`, `timezone` and `date_placeholder`
    pub fn from_config(config: &SiteConfig) -> Self {
        let locale = parse_locale(&config.language).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown language {:?}, dates will use the POSIX locale",
                config.language
            );
            Locale::POSIX
        });

        let timezone = if config.timezone.trim().is_empty() {
            None
        } else {
            match config.timezone.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(e) => {
                    tracing::warn!("Ignoring timezone {:?}: {}", config.timezone, e);
                    None
                }
            }
        };

        Self {
            pattern: moment_to_chrono_format(&config.date_format),
            locale,
            timezone,
            placeholder: config.date_placeholder.clone(),
        }
    }

    /// Format a nullable publication date
    ///
    /// # Examples
    /// ```ignore
    /// formatter.format(Some(&date)) // -> "19 abr 21"
    /// formatter.format(None)        // -> "--"
    /// ```
    pub fn format(&self, date: Option<&Timestamp>) -> String {
        let Some(date) = date else {
            return self.placeholder.clone();
        };

        match self.timezone {
            Some(tz) => self.format_in(&date.with_timezone(&tz)),
            None => self.format_in(date),
        }
    }

    fn format_in<Z: TimeZone>(&self, date: &DateTime<Z>) -> String
    where
        Z::Offset: std::fmt::Display,
    {
        date.format_localized(&self.pattern, self.locale).to_string()
    }
}

/// Accept both `pt-BR` and `pt_BR`
fn parse_locale(language: &str) -> Option<Locale> {
    let name = language.trim().replace('-', "_");
    Locale::try_from(name.as_str()).ok()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest tokens first so "MMM" is not read as "MM" + "M"
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DD", "%d"),
        // Hour, minute, second
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        // Day of week
        ("dddd", "%A"),
        ("ddd", "%a"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::timestamp;

    fn formatter(language: &str, timezone: &str) -> DateFormatter {
        let config = SiteConfig {
            language: language.to_string(),
            timezone: timezone.to_string(),
            ..SiteConfig::default()
        };
        DateFormatter::from_config(&config)
    }

    #[test]
    fn test_default_pattern_in_portuguese() {
        let date = timestamp::parse("2021-04-19T12:00:00+0000").unwrap();
        assert_eq!(formatter("pt-BR", "").format(Some(&date)), "19 abr 21");
    }

    #[test]
    fn test_null_date_uses_placeholder() {
        assert_eq!(formatter("pt-BR", "").format(None), "--");
    }

    #[test]
    fn test_timezone_conversion() {
        // 01:00 UTC is still the previous day in São Paulo
        let date = timestamp::parse("2021-04-19T01:00:00+0000").unwrap();
        assert_eq!(
            formatter("pt-BR", "America/Sao_Paulo").format(Some(&date)),
            "18 abr 21"
        );
    }

    #[test]
    fn test_unknown_locale_and_timezone_fall_back() {
        let date = timestamp::parse("2021-04-19T12:00:00+0000").unwrap();
        assert_eq!(formatter("xx-YY", "Mars/Base").format(Some(&date)), "19 Apr 21");
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("DD MMM YY"), "%d %b %y");
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("HH:mm:ss"), "%H:%M:%S");
    }
}
