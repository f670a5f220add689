use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::Page;

#[derive(Deserialize, Debug)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Space {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct SpacesResp {
    #[serde(default)]
    pub results: Vec<Space>,
}

#[derive(Deserialize, Debug)]
pub struct Version {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct PageResp {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<String>,
    pub version: Version,
}

#[derive(Deserialize, Debug)]
pub struct PagesResp {
    #[serde(default)]
    pub results: Vec<PageResp>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

impl PagesResp {
    /// The continuation cursor, if the listing has more results.
    pub fn next_cursor(&self) -> Option<String> {
        self.links
            .as_ref()
            .and_then(|l| l.next.clone())
            .filter(|next| !next.is_empty())
    }
}

impl From<PageResp> for Page {
    fn from(p: PageResp) -> Self {
        Page {
            id: p.id,
            title: p.title,
            parent_id: p.parent_id.unwrap_or_default(),
            last_modified_at: p.version.created_at,
        }
    }
}
