pub const JOB_TYPES: &[&str] = &[
    "Full-time",
    "Part-time",
    "Self-employed",
    "Freelance",
    "Contract",
    "Internship",
    "Apprenticeship",
    "Temporary",
];

pub const WORK_MODES: &[&str] = &["On-site", "Hybrid", "Remote"];

/// Exact (trimmed, case-sensitive) membership in the job-type table.
pub fn is_job_type(text: &str) -> bool {
    JOB_TYPES.contains(&text.trim())
}

pub fn is_work_mode(text: &str) -> bool {
    WORK_MODES.contains(&text.trim())
}
