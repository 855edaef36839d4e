//! Configuration module for pdfbundle.
//!
//! [`BundleConfig`] is the immutable, user-supplied description of how a
//! bundle should look. It can be deserialised from JSON (the option file
//! accepted by the binary) and is then overridden field by field from CLI
//! flags. It handles:
//! - Lenient parsing of formatting choices (unknown values fall back with a warning)
//! - Date formatting for index rows
//! - Validation of impossible settings

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, Result};

/// Typeface family used for the TOC and the footer stamps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontChoice {
    /// Times family.
    Serif,
    /// Helvetica family.
    #[default]
    Sans,
    /// Courier family.
    Mono,
    /// Charter-named face with Times metrics.
    Traditional,
    /// Unrecognised setting. Each consumer applies its own fallback.
    Other(String),
}

impl From<&str> for FontChoice {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "serif" => Self::Serif,
            "sans" | "helvetica" => Self::Sans,
            "mono" => Self::Mono,
            "traditional" => Self::Traditional,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for FontChoice {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<FontChoice> for String {
    fn from(font: FontChoice) -> Self {
        font.to_string()
    }
}

impl FromStr for FontChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for FontChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serif => f.write_str("serif"),
            Self::Sans => f.write_str("sans"),
            Self::Mono => f.write_str("mono"),
            Self::Traditional => f.write_str("traditional"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// How the date column is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateSetting {
    /// `2024-01-31`
    #[serde(rename = "YYYY-MM-DD")]
    IsoDate,
    /// `31/01/2024`
    #[default]
    #[serde(rename = "DD-MM-YYYY")]
    DayMonthYear,
    /// `01/31/2024`
    #[serde(rename = "MM-DD-YYYY")]
    MonthDayYear,
    /// `31 January 2024`
    #[serde(rename = "uk_longdate")]
    UkLong,
    /// `January 31, 2024`
    #[serde(rename = "us_longdate")]
    UsLong,
    /// `31 Jan 2024`
    #[serde(rename = "uk_abbreviated_date")]
    UkAbbreviated,
    /// `Jan 31, 2024`
    #[serde(rename = "us_abbreviated_date")]
    UsAbbreviated,
    /// No date column at all.
    #[serde(rename = "hide_date")]
    Hidden,
}

/// Width class of the TOC date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumn {
    /// Column omitted, title widened.
    Hidden,
    /// Numeric and abbreviated formats.
    Short,
    /// Month-name formats.
    Long,
}

impl DateSetting {
    /// The chrono format string, or `None` when dates are hidden.
    pub fn format_str(self) -> Option<&'static str> {
        match self {
            Self::IsoDate => Some("%Y-%m-%d"),
            Self::DayMonthYear => Some("%d/%m/%Y"),
            Self::MonthDayYear => Some("%m/%d/%Y"),
            Self::UkLong => Some("%d %B %Y"),
            Self::UsLong => Some("%B %d, %Y"),
            Self::UkAbbreviated => Some("%d %b %Y"),
            Self::UsAbbreviated => Some("%b %d, %Y"),
            Self::Hidden => None,
        }
    }

    /// Whether the date column is suppressed.
    pub fn is_hidden(self) -> bool {
        self == Self::Hidden
    }

    /// Column width class used by the TOC layout.
    pub fn column(self) -> DateColumn {
        match self {
            Self::Hidden => DateColumn::Hidden,
            Self::UkLong | Self::UsLong => DateColumn::Long,
            _ => DateColumn::Short,
        }
    }

    /// Format a raw index date.
    ///
    /// Only `YYYY-MM-DD` input is reformatted; anything else is returned
    /// verbatim. Hidden dates always format to the empty string.
    pub fn format_date(self, raw: &str) -> String {
        let Some(fmt) = self.format_str() else {
            return String::new();
        };
        let trimmed = raw.trim();
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => date.format(fmt).to_string(),
            Err(_) => {
                if !trimmed.is_empty() && trimmed != "Unknown" {
                    log::error!("Date does not match the expected YYYY-MM-DD format: {trimmed}");
                }
                trimmed.to_string()
            }
        }
    }
}

impl FromStr for DateSetting {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "YYYY-MM-DD" => Ok(Self::IsoDate),
            "DD-MM-YYYY" => Ok(Self::DayMonthYear),
            "MM-DD-YYYY" => Ok(Self::MonthDayYear),
            "uk_longdate" => Ok(Self::UkLong),
            "us_longdate" => Ok(Self::UsLong),
            "uk_abbreviated_date" => Ok(Self::UkAbbreviated),
            "us_abbreviated_date" => Ok(Self::UsAbbreviated),
            "hide_date" => Ok(Self::Hidden),
            _ => Err(BundleError::invalid_config(format!(
                "Invalid date setting: {s}. Must be one of: YYYY-MM-DD, DD-MM-YYYY, MM-DD-YYYY, \
                 uk_longdate, us_longdate, uk_abbreviated_date, us_abbreviated_date, hide_date"
            ))),
        }
    }
}

impl fmt::Display for DateSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IsoDate => "YYYY-MM-DD",
            Self::DayMonthYear => "DD-MM-YYYY",
            Self::MonthDayYear => "MM-DD-YYYY",
            Self::UkLong => "uk_longdate",
            Self::UsLong => "us_longdate",
            Self::UkAbbreviated => "uk_abbreviated_date",
            Self::UsAbbreviated => "us_abbreviated_date",
            Self::Hidden => "hide_date",
        };
        f.write_str(name)
    }
}

/// Label layout for content bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookmarkSetting {
    /// `001. Title`
    #[default]
    TabTitle,
    /// `001. Title (date)`
    TabTitleDate,
    /// `001. Title [pg.5]`
    TabTitlePage,
    /// `001. Title (date) [pg.5]`
    TabTitleDatePage,
}

impl From<&str> for BookmarkSetting {
    fn from(s: &str) -> Self {
        match s.trim() {
            "tab-title" => Self::TabTitle,
            "tab-title-date" => Self::TabTitleDate,
            "tab-title-page" => Self::TabTitlePage,
            "tab-title-date-page" => Self::TabTitleDatePage,
            other => {
                log::error!("Unknown bookmark setting '{other}', falling back to tab-title");
                Self::TabTitle
            }
        }
    }
}

impl From<String> for BookmarkSetting {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<BookmarkSetting> for String {
    fn from(setting: BookmarkSetting) -> Self {
        setting.to_string()
    }
}

impl fmt::Display for BookmarkSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TabTitle => "tab-title",
            Self::TabTitleDate => "tab-title-date",
            Self::TabTitlePage => "tab-title-page",
            Self::TabTitleDatePage => "tab-title-date-page",
        })
    }
}

/// Footer page-number format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageNumStyle {
    /// `5`
    X,
    /// `5 of 12`
    XOfY,
    /// `Page 5`
    PageX,
    /// `Page 5 of 12`
    #[default]
    PageXOfY,
    /// `5 / 12`
    XSlashY,
}

impl From<&str> for PageNumStyle {
    fn from(s: &str) -> Self {
        match s.trim() {
            "x" => Self::X,
            "x_of_y" => Self::XOfY,
            "page_x" => Self::PageX,
            "page_x_of_y" => Self::PageXOfY,
            "x_slash_y" => Self::XSlashY,
            other => {
                log::warn!("Unknown page number style '{other}', using 'Page N'");
                Self::PageX
            }
        }
    }
}

impl From<String> for PageNumStyle {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PageNumStyle> for String {
    fn from(style: PageNumStyle) -> Self {
        style.to_string()
    }
}

impl fmt::Display for PageNumStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::XOfY => "x_of_y",
            Self::PageX => "page_x",
            Self::PageXOfY => "page_x_of_y",
            Self::XSlashY => "x_slash_y",
        })
    }
}

/// Horizontal footer placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Alignment {
    /// 50pt from the left edge.
    Left,
    /// Centred on the page.
    #[default]
    Centre,
    /// 50pt from the right edge.
    Right,
}

impl From<&str> for Alignment {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "left" => Self::Left,
            "centre" | "center" => Self::Centre,
            "right" => Self::Right,
            other => {
                log::warn!("Unknown footer alignment '{other}', using centre");
                Self::Centre
            }
        }
    }
}

impl From<String> for Alignment {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Alignment> for String {
    fn from(align: Alignment) -> Self {
        align.to_string()
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Centre => "centre",
            Self::Right => "right",
        })
    }
}

/// Case metadata shown in the TOC header block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseDetails {
    /// Title of the bundle, e.g. "Trial Bundle".
    pub bundle_title: String,
    /// Court claim number, right-aligned at the top.
    pub claim_no: String,
    /// Case name, e.g. "Smith v Jones".
    pub case_name: String,
}

/// Immutable per-run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Header metadata.
    pub case_details: CaseDetails,
    /// Prefix the bundle title with a red CONFIDENTIAL banner.
    pub confidential: bool,
    /// Date column format.
    pub date_setting: DateSetting,
    /// Content bookmark label layout.
    pub bookmark_setting: BookmarkSetting,
    /// Typeface of the TOC.
    pub index_font: FontChoice,
    /// Typeface of the footer stamps.
    pub footer_font: FontChoice,
    /// Footer placement.
    pub page_num_align: Alignment,
    /// Footer text format.
    pub page_num_style: PageNumStyle,
    /// Literal text prepended to every footer.
    pub footer_prefix: String,
    /// Number the frontmatter in lowercase Roman numerals.
    pub roman_for_preface: bool,
    /// Worker count for parallel stages (defaults to the core count).
    pub jobs: Option<usize>,
    /// Compress content streams of the finished bundle.
    pub compress: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            case_details: CaseDetails::default(),
            confidential: false,
            date_setting: DateSetting::default(),
            bookmark_setting: BookmarkSetting::default(),
            index_font: FontChoice::default(),
            footer_font: FontChoice::default(),
            page_num_align: Alignment::default(),
            page_num_style: PageNumStyle::default(),
            footer_prefix: String::new(),
            roman_for_preface: false,
            jobs: None,
            compress: true,
        }
    }
}

impl BundleConfig {
    /// Parse a configuration from a JSON option document.
    ///
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BundleError::invalid_config(format!("Invalid option file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker count is zero.
    pub fn validate(&self) -> Result<()> {
        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err(BundleError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }
        Ok(())
    }

    /// Get the effective number of parallel jobs.
    ///
    /// Returns the configured job count, or the number of CPU cores if auto-detect.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DateSetting::IsoDate, "2024-01-31")]
    #[case(DateSetting::DayMonthYear, "31/01/2024")]
    #[case(DateSetting::MonthDayYear, "01/31/2024")]
    #[case(DateSetting::UkLong, "31 January 2024")]
    #[case(DateSetting::UsLong, "January 31, 2024")]
    #[case(DateSetting::UkAbbreviated, "31 Jan 2024")]
    #[case(DateSetting::UsAbbreviated, "Jan 31, 2024")]
    #[case(DateSetting::Hidden, "")]
    fn test_format_date(#[case] setting: DateSetting, #[case] expected: &str) {
        assert_eq!(setting.format_date("2024-01-31"), expected);
    }

    #[test]
    fn test_format_date_keeps_non_iso_input() {
        assert_eq!(DateSetting::UkLong.format_date("last Tuesday"), "last Tuesday");
        assert_eq!(DateSetting::UkLong.format_date("Unknown"), "Unknown");
    }

    #[test]
    fn test_date_setting_from_str() {
        assert_eq!(
            "uk_longdate".parse::<DateSetting>().unwrap(),
            DateSetting::UkLong
        );
        assert!("dd/mm".parse::<DateSetting>().is_err());
    }

    #[test]
    fn test_date_columns() {
        assert_eq!(DateSetting::Hidden.column(), DateColumn::Hidden);
        assert_eq!(DateSetting::UsLong.column(), DateColumn::Long);
        assert_eq!(DateSetting::UkAbbreviated.column(), DateColumn::Short);
        assert_eq!(DateSetting::IsoDate.column(), DateColumn::Short);
    }

    #[test]
    fn test_font_choice_parsing() {
        assert_eq!(FontChoice::from("Serif"), FontChoice::Serif);
        assert_eq!(FontChoice::from("helvetica"), FontChoice::Sans);
        assert_eq!(
            FontChoice::from("comic"),
            FontChoice::Other("comic".to_string())
        );
    }

    #[test]
    fn test_lenient_enums_fall_back() {
        assert_eq!(BookmarkSetting::from("title-only"), BookmarkSetting::TabTitle);
        assert_eq!(PageNumStyle::from("roman"), PageNumStyle::PageX);
        assert_eq!(Alignment::from("center"), Alignment::Centre);
        assert_eq!(Alignment::from("middle"), Alignment::Centre);
    }

    #[test]
    fn test_from_json_defaults_and_overrides() {
        let config = BundleConfig::from_json(
            r#"{
                "case_details": {"bundle_title": "Trial Bundle", "claim_no": "KB-2024-001"},
                "date_setting": "hide_date",
                "bookmark_setting": "tab-title-page",
                "page_num_style": "x_slash_y",
                "page_num_align": "right",
                "index_font": "mono",
                "roman_for_preface": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.case_details.bundle_title, "Trial Bundle");
        assert_eq!(config.case_details.case_name, "");
        assert_eq!(config.date_setting, DateSetting::Hidden);
        assert_eq!(config.bookmark_setting, BookmarkSetting::TabTitlePage);
        assert_eq!(config.page_num_style, PageNumStyle::XSlashY);
        assert_eq!(config.page_num_align, Alignment::Right);
        assert_eq!(config.index_font, FontChoice::Mono);
        assert_eq!(config.footer_font, FontChoice::Sans);
        assert!(config.roman_for_preface);
        assert!(config.compress);
    }

    #[test]
    fn test_from_json_rejects_zero_jobs() {
        let err = BundleConfig::from_json(r#"{"jobs": 0}"#).unwrap_err();
        assert!(matches!(err, BundleError::InvalidConfig { .. }));
    }

    #[test]
    fn test_effective_jobs() {
        let config = BundleConfig {
            jobs: Some(3),
            ..Default::default()
        };
        assert_eq!(config.effective_jobs(), 3);
        assert!(BundleConfig::default().effective_jobs() >= 1);
    }
}
