use serde::{Deserialize, Serialize};

/// Marker for any field that could not be read or classified.
pub const NOT_FOUND: &str = "Not Found";

pub fn not_found() -> String {
    NOT_FOUND.to_string()
}

/// Turn an optional raw read into a field value: trimmed text, or the sentinel
/// when the read was absent or blank.
pub fn or_not_found(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => not_found(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub name: String,
    pub connections: String,
    pub followers: String,
    pub head_line: String,
    pub about: String,
    pub last_activity: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            name: not_found(),
            connections: not_found(),
            followers: not_found(),
            head_line: not_found(),
            about: not_found(),
            last_activity: not_found(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub job_title: String,
    pub company_name: String,
    pub company_link: String,
    pub job_type: String,
    pub work_mode: String,
    pub location: String,
    pub duration: String,
    pub tenurity: String,
    pub total_duration: String,
}

impl Default for ExperienceEntry {
    fn default() -> Self {
        Self {
            job_title: not_found(),
            company_name: not_found(),
            company_link: not_found(),
            job_type: not_found(),
            work_mode: not_found(),
            location: not_found(),
            duration: not_found(),
            tenurity: not_found(),
            total_duration: not_found(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub basic_info: BasicInfo,
    pub experience: Vec<ExperienceEntry>,
}

impl BasicInfo {
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("name", &self.name),
            ("connections", &self.connections),
            ("followers", &self.followers),
            ("head_line", &self.head_line),
            ("about", &self.about),
            ("last_activity", &self.last_activity),
        ]
    }
}

impl ExperienceEntry {
    pub fn fields(&self) -> [(&'static str, &str); 9] {
        [
            ("job_title", &self.job_title),
            ("company_name", &self.company_name),
            ("company_link", &self.company_link),
            ("job_type", &self.job_type),
            ("work_mode", &self.work_mode),
            ("location", &self.location),
            ("duration", &self.duration),
            ("tenurity", &self.tenurity),
            ("total_duration", &self.total_duration),
        ]
    }
}

impl ProfileRecord {
    /// True when every leaf holds either a value or the sentinel.
    pub fn is_fully_populated(&self) -> bool {
        self.basic_info.fields().iter().all(|(_, v)| !v.is_empty())
            && self
                .experience
                .iter()
                .all(|e| e.fields().iter().all(|(_, v)| !v.is_empty()))
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProfileRecord {
        ProfileRecord {
            basic_info: BasicInfo {
                name: "Ada Lovelace".into(),
                head_line: "Analyst".into(),
                connections: "500+ connections".into(),
                ..Default::default()
            },
            experience: vec![ExperienceEntry {
                job_title: "Engineer".into(),
                company_name: "Analytical Engines".into(),
                job_type: "Full-time".into(),
                tenurity: "Jan 2020 – Present".into(),
                duration: "2 yrs 3 mos".into(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn defaults_are_sentinel() {
        let e = ExperienceEntry::default();
        assert!(e.fields().iter().all(|(_, v)| *v == NOT_FOUND));
        let b = BasicInfo::default();
        assert!(b.fields().iter().all(|(_, v)| *v == NOT_FOUND));
    }

    #[test]
    fn blank_reads_become_sentinel() {
        assert_eq!(or_not_found(None), NOT_FOUND);
        assert_eq!(or_not_found(Some("   ".into())), NOT_FOUND);
        assert_eq!(or_not_found(Some(" Remote ".into())), "Remote");
    }

    #[test]
    fn json_shape_uses_expected_keys() {
        let v = serde_json::to_value(sample()).unwrap();
        let basic = v["basic_info"].as_object().unwrap();
        for key in ["name", "connections", "followers", "head_line", "about", "last_activity"] {
            assert!(basic[key].is_string(), "missing {key}");
        }
        let exp = v["experience"][0].as_object().unwrap();
        assert_eq!(exp.len(), 9);
        assert_eq!(exp["total_duration"], NOT_FOUND);
    }

    #[test]
    fn json_round_trip() {
        let record = sample();
        let text = serde_json::to_string(&record).unwrap();
        let back: ProfileRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        assert!(back.is_fully_populated());
    }
}
