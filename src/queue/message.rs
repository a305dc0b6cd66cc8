use crate::page::{Depth, Page, ParentLink};
use serde::{Deserialize, Serialize};

/// Wire format of one unit of crawl work
///
/// Only the direct parent travels with a message, never the whole ancestry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentMessage>,

    #[serde(default)]
    pub depth: Depth,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_url: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

/// The parent snapshot carried in a [`QueueMessage`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentMessage {
    pub url: String,

    #[serde(default)]
    pub depth: Depth,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_url: String,
}

impl From<&Page> for QueueMessage {
    fn from(page: &Page) -> Self {
        Self {
            url: page.url.clone(),
            parent: page.parent.as_ref().map(|parent| ParentMessage {
                url: parent.url.clone(),
                depth: parent.depth,
                start_url: parent.start_url.clone(),
            }),
            depth: page.depth,
            start_url: page.start_url.clone(),
            timestamp: page.timestamp,
        }
    }
}

impl From<QueueMessage> for Page {
    /// Rebuilds the page a message describes
    ///
    /// A parent only produces children after it was fetched successfully, so
    /// its snapshot is restored with status 200.
    fn from(message: QueueMessage) -> Self {
        let start_url = if message.start_url.is_empty() {
            message.url.clone()
        } else {
            message.start_url
        };

        Page {
            parent: message.parent.map(|parent| ParentLink {
                url: parent.url,
                depth: parent.depth,
                start_url: parent.start_url,
                timestamp: message.timestamp,
                status_code: 200,
            }),
            url: message.url,
            depth: message.depth,
            start_url,
            timestamp: message.timestamp,
            status_code: 0,
            children: Vec::new(),
        }
    }
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}
