use serde::Serialize;

use crate::models::{CastMember, MediaType, PersonSummary, TitleDetails, TitleSummary};

pub mod pymr;
pub mod seven;

/// A selectable card in the Seven Degrees graph: either a title or a person.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GameNode {
    Title {
        id: i64,
        media_type: MediaType,
        title: String,
        poster_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        release_year: Option<i32>,
    },
    Person {
        id: i64,
        name: String,
        profile_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        character: Option<String>,
    },
}

impl GameNode {
    pub fn id(&self) -> i64 {
        match self {
            GameNode::Title { id, .. } | GameNode::Person { id, .. } => *id,
        }
    }

    pub fn from_details(details: TitleDetails) -> Self {
        GameNode::Title {
            id: details.id,
            media_type: details.media_type,
            title: details.title,
            poster_path: details.poster_path,
            release_year: details.release_year,
        }
    }

    pub fn from_summary(summary: TitleSummary) -> Self {
        GameNode::Title {
            id: summary.id,
            media_type: summary.media_type,
            title: summary.title,
            poster_path: summary.poster_path,
            release_year: summary.release_year,
        }
    }

    pub fn from_person(person: PersonSummary) -> Self {
        GameNode::Person {
            id: person.id,
            name: person.name,
            profile_path: person.profile_path,
            character: None,
        }
    }

    pub fn from_cast_member(member: CastMember) -> Self {
        GameNode::Person {
            id: member.id,
            name: member.name,
            profile_path: member.profile_path,
            character: member.character,
        }
    }
}
