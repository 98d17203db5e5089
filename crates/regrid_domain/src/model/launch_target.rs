use crate::ItemKind;
use std::fmt;

/// Parsed launch descriptor of an application or deep shortcut.
///
/// Stored text forms are `package/activity` for applications and
/// `package#shortcut` for deep shortcuts. A leading `.` on the activity is
/// shorthand for the package name, so `com.mail/.Inbox` and
/// `com.mail/com.mail.Inbox` describe the same target.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum LaunchTarget {
    Activity { package: String, activity: String },
    Shortcut { package: String, shortcut_id: String },
}

impl LaunchTarget {
    pub fn parse(kind: ItemKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return None;
        }

        match kind {
            ItemKind::Application => {
                let (package, activity) = raw.split_once('/')?;
                if !is_package_name(package) || activity.is_empty() || activity.contains(['/', '#'])
                {
                    return None;
                }
                let activity = match activity.strip_prefix('.') {
                    Some(rest) if !rest.is_empty() => format!("{package}.{rest}"),
                    Some(_) => return None,
                    None => activity.to_owned(),
                };
                Some(LaunchTarget::Activity {
                    package: package.to_owned(),
                    activity,
                })
            }
            ItemKind::DeepShortcut => {
                let (package, shortcut_id) = raw.split_once('#')?;
                if !is_package_name(package) || shortcut_id.is_empty() || shortcut_id.contains('#')
                {
                    return None;
                }
                Some(LaunchTarget::Shortcut {
                    package: package.to_owned(),
                    shortcut_id: shortcut_id.to_owned(),
                })
            }
            _ => None,
        }
    }

    pub fn package(&self) -> &str {
        match self {
            LaunchTarget::Activity { package, .. } | LaunchTarget::Shortcut { package, .. } => {
                package
            }
        }
    }
}

impl fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchTarget::Activity { package, activity } => write!(f, "{package}/{activity}"),
            LaunchTarget::Shortcut {
                package,
                shortcut_id,
            } => write!(f, "{package}#{shortcut_id}"),
        }
    }
}

fn is_package_name(raw: &str) -> bool {
    !raw.is_empty()
        && !raw.starts_with('.')
        && !raw.ends_with('.')
        && raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_')
}
