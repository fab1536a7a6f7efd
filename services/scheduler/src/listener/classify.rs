//! Notification classification.

use bytes::Bytes;
use cloudjob_registry::{ChangeNotification, ChangeType};

/// A notification that names a specific job under the configuration root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobConfigEvent<'a> {
    Added {
        job_name: &'a str,
        data: Option<&'a Bytes>,
    },
    Updated {
        job_name: &'a str,
        data: Option<&'a Bytes>,
    },
    Removed {
        job_name: &'a str,
    },
}

impl JobConfigEvent<'_> {
    pub fn job_name(&self) -> &str {
        match self {
            JobConfigEvent::Added { job_name, .. }
            | JobConfigEvent::Updated { job_name, .. }
            | JobConfigEvent::Removed { job_name } => *job_name,
        }
    }
}

/// The job name a path refers to: everything after `root/`.
///
/// Returns `None` for the root itself, for paths outside the root subtree and
/// for a bare trailing separator.
pub fn job_name_from_path<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    let suffix = path.strip_prefix(root)?.strip_prefix('/')?;
    (!suffix.is_empty()).then_some(suffix)
}

/// Classify a notification against the configuration root.
pub fn classify<'a>(root: &str, notification: &'a ChangeNotification) -> Option<JobConfigEvent<'a>> {
    let job_name = job_name_from_path(root, &notification.path)?;
    let data = notification.data.as_ref();
    Some(match notification.change_type {
        ChangeType::Added => JobConfigEvent::Added { job_name, data },
        ChangeType::Updated => JobConfigEvent::Updated { job_name, data },
        ChangeType::Removed => JobConfigEvent::Removed { job_name },
    })
}
