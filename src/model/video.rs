use url::Url;

use crate::prelude::*;
use crate::model::User;

/// A trainable unit: some hosted footage a driver is expected to watch.
///
/// Lifecycle is independent of assignments; deleting a video removes its
/// edges alongside it, never the other way around.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Video {
    #[new(default)]
    pub id: Record<Video>,
    #[new(value = "now()")]
    pub created_at: Timestamp,

    pub title: String,
    pub description: String,
    pub youtube_url: Url,
    /// Free-text grouping label, used for filtering only.
    pub category: String,
    /// Display string, never interpreted.
    #[serde(default)]
    #[new(default)]
    pub duration: Option<String>,
    /// Completions on this video go stale after the annual window.
    #[serde(default)]
    #[new(default)]
    pub is_annual_renewal: bool,
    pub admin_user: Record<User>,
}

define_table!("videos" : Video = id);
define_model!(Video);

define_relation! {
    Video > recent() > Vec<Video>
        where "SELECT * FROM videos ORDER BY created_at DESC LIMIT 50"
}

define_relation! {
    Video > get(id: &Record<Video>) > Option<Video>
        where "SELECT * FROM videos WHERE id = $id LIMIT 1"
}
