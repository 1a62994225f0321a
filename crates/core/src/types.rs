use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Experiment arm a visit was assigned to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GroupName {
    Control,
    Treatment,
}

impl GroupName {
    pub const ALL: [GroupName; 2] = [GroupName::Control, GroupName::Treatment];

    /// The landing page this group is supposed to be served.
    pub fn canonical_page(self) -> LandingPage {
        match self {
            GroupName::Control => LandingPage::OldPage,
            GroupName::Treatment => LandingPage::NewPage,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupName::Control => "control",
            GroupName::Treatment => "treatment",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "control" => Some(GroupName::Control),
            "treatment" => Some(GroupName::Treatment),
            _ => None,
        }
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page variant the visitor actually landed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LandingPage {
    OldPage,
    NewPage,
}

impl LandingPage {
    pub fn as_str(self) -> &'static str {
        match self {
            LandingPage::OldPage => "old_page",
            LandingPage::NewPage => "new_page",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "old_page" => Some(LandingPage::OldPage),
            "new_page" => Some(LandingPage::NewPage),
            _ => None,
        }
    }
}

impl fmt::Display for LandingPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw visit as collected. `user_id` is not unique in raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub user_id: u64,
    pub timestamp: NaiveDateTime,
    pub group_name: GroupName,
    pub landing_page: LandingPage,
    pub converted: bool,
}

impl VisitRecord {
    /// True when the served page disagrees with the assigned group.
    pub fn is_mismatched(&self) -> bool {
        self.group_name.canonical_page() != self.landing_page
    }
}

/// A deduplicated, assignment-consistent visit. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub user_id: u64,
    pub group_name: GroupName,
    pub converted: bool,
    pub timestamp: NaiveDateTime,
}

impl CleanRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// ISO `(year, week)` of the visit.
    pub fn iso_week(&self) -> (i32, u32) {
        let week = self.timestamp.date().iso_week();
        (week.year(), week.week())
    }
}

impl From<&VisitRecord> for CleanRecord {
    fn from(record: &VisitRecord) -> Self {
        Self {
            user_id: record.user_id,
            group_name: record.group_name,
            converted: record.converted,
            timestamp: record.timestamp,
        }
    }
}

/// Data-quality findings surfaced before any number is trusted.
/// These are reported, never raised as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    MismatchedAssignment { records: u64 },
    CrossGroupContamination { users: u64 },
    DuplicateRecords { user_groups: u64, extra_records: u64 },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::MismatchedAssignment { records } => {
                write!(f, "{} records served a page that disagrees with their group", records)
            }
            DataQualityWarning::CrossGroupContamination { users } => {
                write!(f, "{} users were seen in more than one group", users)
            }
            DataQualityWarning::DuplicateRecords {
                user_groups,
                extra_records,
            } => write!(
                f,
                "{} user/group pairs repeat, {} extra records",
                user_groups, extra_records
            ),
        }
    }
}
